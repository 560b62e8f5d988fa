//! 钱包核心错误类型
//!
//! 所有公开操作返回 `WalletResult<T>`；错误码与上层 API 约定的 snake_case 字符串保持一致

use serde::Serialize;

use crate::domain::chain_config::Chain;

/// 稳定错误码（上层 API 直接透传）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorCode {
    InvalidMnemonic,
    ChainNotSupported,
    InvalidAddress,
    InvalidAmount,
    InsufficientBalance,
    RpcError,
    InvalidCredentials,
    DecryptionFailed,
    DerivationFailed,
    InvalidSignature,
    InvalidParameter,
    ConfigError,
    Internal,
}

impl WalletErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidMnemonic => "invalid_mnemonic",
            Self::ChainNotSupported => "chain_not_supported",
            Self::InvalidAddress => "invalid_address",
            Self::InvalidAmount => "invalid_amount",
            Self::InsufficientBalance => "insufficient_balance",
            Self::RpcError => "rpc_error",
            Self::InvalidCredentials => "invalid_credentials",
            Self::DecryptionFailed => "decryption_failed",
            Self::DerivationFailed => "derivation_failed",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidParameter => "invalid_parameter",
            Self::ConfigError => "config_error",
            Self::Internal => "internal",
        }
    }
}

/// 钱包核心错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("invalid {chain} address: {address}")]
    InvalidAddress { chain: Chain, address: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient funds on {chain}: required {required}, available {available}")]
    InsufficientFunds {
        chain: Chain,
        required: u128,
        available: u128,
    },

    #[error("{chain} provider error during {operation}: {message}")]
    Network {
        chain: Chain,
        operation: String,
        message: String,
    },

    #[error("wrong password")]
    WrongPassword,

    #[error("corrupt ciphertext: {0}")]
    CorruptCiphertext(String),

    #[error("{chain} derivation failed: {message}")]
    DerivationFailure { chain: Chain, message: String },

    #[error("{chain} signing failed: {message}")]
    Signing { chain: Chain, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("entropy source failure: {0}")]
    Entropy(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// 序列化后的错误体（不含任何 provider 内部细节之外的敏感数据）
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl WalletError {
    pub fn network(chain: Chain, operation: &str, message: impl std::fmt::Display) -> Self {
        Self::Network {
            chain,
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn derivation(chain: Chain, message: impl std::fmt::Display) -> Self {
        Self::DerivationFailure {
            chain,
            message: message.to_string(),
        }
    }

    pub fn signing(chain: Chain, message: impl std::fmt::Display) -> Self {
        Self::Signing {
            chain,
            message: message.to_string(),
        }
    }

    pub fn invalid_address(chain: Chain, address: &str) -> Self {
        Self::InvalidAddress {
            chain,
            address: address.to_string(),
        }
    }

    pub fn code(&self) -> WalletErrorCode {
        match self {
            Self::InvalidMnemonic(_) => WalletErrorCode::InvalidMnemonic,
            Self::UnsupportedChain(_) => WalletErrorCode::ChainNotSupported,
            Self::InvalidAddress { .. } => WalletErrorCode::InvalidAddress,
            Self::InvalidAmount(_) => WalletErrorCode::InvalidAmount,
            Self::InsufficientFunds { .. } => WalletErrorCode::InsufficientBalance,
            Self::Network { .. } => WalletErrorCode::RpcError,
            Self::WrongPassword => WalletErrorCode::InvalidCredentials,
            Self::CorruptCiphertext(_) => WalletErrorCode::DecryptionFailed,
            Self::DerivationFailure { .. } => WalletErrorCode::DerivationFailed,
            Self::Signing { .. } => WalletErrorCode::InvalidSignature,
            Self::InvalidRequest(_) => WalletErrorCode::InvalidParameter,
            Self::Config(_) => WalletErrorCode::ConfigError,
            Self::Entropy(_) => WalletErrorCode::Internal,
        }
    }

    /// 校验类错误：在任何网络或签名工作之前同步返回
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidMnemonic(_)
                | Self::UnsupportedChain(_)
                | Self::InvalidAddress { .. }
                | Self::InvalidAmount(_)
                | Self::InvalidRequest(_)
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().as_str(),
            message: self.to_string(),
        }
    }
}
