//! Domain 模块
//!
//! 包含密钥管理、链参数、派生策略等核心领域逻辑（不访问网络）

pub mod chain_config;
pub mod derivation;
pub mod key_material;
pub mod mnemonic;
pub mod multi_chain_wallet;
pub mod ton_cell;
pub mod ton_wallet;
pub mod transaction_status;

// Re-exports
pub use chain_config::{AddressFormat, Chain, ChainConfig, ChainRegistry, CurveType};
pub use derivation::{DerivationStrategy, DerivationStrategyFactory};
pub use key_material::{AddressRecord, KeyPair, SecretMnemonic, Seed};
pub use mnemonic::MnemonicManager;
pub use multi_chain_wallet::{CreateWalletRequest, MultiChainWalletService, WalletInfo};
pub use ton_wallet::TonWalletVersion;
pub use transaction_status::{TransactionStage, TransactionStatus};
