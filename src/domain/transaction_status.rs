//! 交易状态定义
//! - `TransactionStage`：本地构建流水线（校验 → 准备 → 构造 → 签名 → 广播）
//! - `TransactionStatus`：链上查询到的交易状态

use std::fmt;

use serde::{Deserialize, Serialize};

/// 交易构建阶段，只能按顺序前进一步
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStage {
    /// 请求已通过本地校验（未访问网络）
    Validated,

    /// 已获取 nonce / UTXO / seqno 与费用数据
    Provisioned,

    /// 未签名交易已构造
    Constructed,

    /// 已签名，得到原始交易与哈希
    Signed,

    /// 已提交到节点
    Broadcast,
}

impl TransactionStage {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validated => "请求已校验",
            Self::Provisioned => "链上数据已准备",
            Self::Constructed => "交易已构造",
            Self::Signed => "交易已签名",
            Self::Broadcast => "交易已广播",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Broadcast)
    }

    pub fn next(&self) -> Option<Self> {
        use TransactionStage::*;

        match self {
            Validated => Some(Provisioned),
            Provisioned => Some(Constructed),
            Constructed => Some(Signed),
            Signed => Some(Broadcast),
            Broadcast => None,
        }
    }

    /// 验证阶段转换合法性：只允许前进到紧邻的下一阶段
    pub fn can_transition_to(&self, target: &Self) -> bool {
        self.next().as_ref() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Provisioned => "provisioned",
            Self::Constructed => "constructed",
            Self::Signed => "signed",
            Self::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for TransactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 链上交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// 在内存池中 / 未打包
    Pending,

    /// 已打包且执行成功
    Confirmed,

    /// 已打包但执行失败（EVM receipt status = 0 等）
    Failed,
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// 兼容各 provider 的状态字符串
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "confirmed" | "success" | "completed" | "0x1" => Self::Confirmed,
            "failed" | "error" | "reverted" | "0x0" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
