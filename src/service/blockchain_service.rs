//! 统一区块链服务接口
//!
//! 上层通过 `BlockchainService` 查询余额、交易、区块，估算费用并广播，
//! 无需关心具体链。所有金额均为最小单位整数的十进制字符串。

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{chain_config::Chain, transaction_status::TransactionStatus},
    error::{WalletError, WalletResult},
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 数据模型
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    /// 代币合约地址
    pub contract: String,
    pub balance: String,
}

/// 账户余额（查询时的快照，不缓存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub chain: Chain,
    pub address: String,
    /// 原生币余额（最小单位）
    pub native: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub chain: Chain,
    pub hash: String,
    pub from: Option<String>,
    pub to: Option<String>,
    /// 转账金额（最小单位）
    pub value: String,
    pub fee: Option<String>,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    /// unix 秒
    pub timestamp: Option<i64>,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBlock {
    pub chain: Chain,
    pub number: u64,
    pub hash: String,
    pub parent_hash: Option<String>,
    pub timestamp: Option<i64>,
    pub transaction_count: usize,
}

/// 区块定位：高度或哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    Number(u64),
    Hash(String),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Number(n) => write!(f, "#{}", n),
            BlockId::Hash(h) => f.write_str(h),
        }
    }
}

/// 费用估算请求（金额为最小单位）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimateRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    /// ERC-20 合约地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// 调用方指定的费用参数；提供的项不再向 provider 查询
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeOverride {
    /// wei
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// UTXO 链费率（最小单位 / vbyte）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<u64>,
}

/// 构建交易所需的链上数据请求
#[derive(Debug, Clone, Default)]
pub struct NetworkStateRequest {
    pub from: String,
    pub to: String,
    /// 最小单位
    pub amount: u128,
    /// ERC-20 合约地址
    pub token: Option<String>,
    pub nonce: Option<u64>,
    pub fee: FeeOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmFeeData {
    Legacy { gas_price: u128 },
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl EvmFeeData {
    /// 单位 gas 的最高价格
    pub fn max_price(&self) -> u128 {
        match self {
            EvmFeeData::Legacy { gas_price } => *gas_price,
            EvmFeeData::Eip1559 { max_fee_per_gas, .. } => *max_fee_per_gas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// Provisioned 阶段获得的链上数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkState {
    Evm {
        chain_id: u64,
        nonce: u64,
        fee: EvmFeeData,
        gas_limit: u64,
    },
    Utxo {
        /// provider 返回顺序
        utxos: Vec<Utxo>,
        /// 最小单位 / vbyte
        fee_rate: u64,
    },
    Ton {
        seqno: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 订阅
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    NewBlock { chain: Chain, number: u64, hash: String },
    BalanceChanged { chain: Chain, address: String, balance: String },
}

/// 推送订阅句柄
///
/// 链不支持推送时为 inactive：`next()` 立即返回 `None`。
/// `unsubscribe()` 可重复调用；drop 时同样释放后台监听任务。
pub struct Subscription {
    chain: Chain,
    handle: Option<JoinHandle<()>>,
    events: Option<mpsc::Receiver<ChainEvent>>,
}

/// 订阅事件通道容量
pub const SUBSCRIPTION_BUFFER: usize = 64;

impl Subscription {
    pub fn active(chain: Chain, handle: JoinHandle<()>, events: mpsc::Receiver<ChainEvent>) -> Self {
        Self {
            chain,
            handle: Some(handle),
            events: Some(events),
        }
    }

    /// 不支持推送的链返回的空订阅
    pub fn inactive(chain: Chain) -> Self {
        tracing::debug!(chain = %chain, "push notifications not supported, subscription is a no-op");
        Self {
            chain,
            handle: None,
            events: None,
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn push_supported(&self) -> bool {
        self.events.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub async fn next(&mut self) -> Option<ChainEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(chain = %self.chain, "subscription released");
        }
        self.events = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("chain", &self.chain)
            .field("push_supported", &self.push_supported())
            .field("active", &self.is_active())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 服务接口
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait BlockchainService: Send + Sync {
    fn chain(&self) -> Chain;

    async fn get_balance(&self, address: &str) -> WalletResult<Balance>;

    /// 代币余额，仅 EVM 支持
    async fn get_token_balance(&self, address: &str, token: &str) -> WalletResult<TokenBalance> {
        let _ = (address, token);
        Err(WalletError::InvalidRequest(format!(
            "token balances are not supported on {}",
            self.chain()
        )))
    }

    async fn get_transaction(&self, hash: &str) -> WalletResult<Option<ChainTransaction>>;

    async fn get_block(&self, id: &BlockId) -> WalletResult<Option<ChainBlock>>;

    async fn get_latest_block(&self) -> WalletResult<ChainBlock>;

    /// 尽力而为：没有索引服务的链可能返回空列表
    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<ChainTransaction>>;

    /// 返回最小单位的费用
    async fn estimate_fee(&self, request: &FeeEstimateRequest) -> WalletResult<String>;

    /// 广播已签名交易（hex），返回交易哈希；不重试
    async fn broadcast_transaction(&self, raw_transaction_hex: &str) -> WalletResult<String>;

    /// 纯格式校验，不访问网络
    fn validate_address(&self, address: &str) -> bool;

    async fn subscribe_to_address(&self, address: &str) -> WalletResult<Subscription>;

    async fn subscribe_to_blocks(&self) -> WalletResult<Subscription>;

    /// 获取构建交易所需的 nonce / UTXO / seqno 与费用数据
    async fn fetch_network_state(&self, request: &NetworkStateRequest) -> WalletResult<NetworkState>;
}
