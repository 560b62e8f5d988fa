//! IronCore Wallet - 多链非托管钱包核心
//!
//! 助记词管理、多链地址派生（Ethereum / Bitcoin / Dogecoin / TON）、
//! 统一链服务接口与交易构建签名。私钥只在调用方进程内存中存在。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{WalletError, WalletErrorCode, WalletResult};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::{ChainsConfig, Config},
        domain::{
            AddressRecord, Chain, ChainConfig, ChainRegistry, DerivationStrategy,
            DerivationStrategyFactory, KeyPair, MnemonicManager, MultiChainWalletService, Seed,
            TransactionStage,
        },
        error::{WalletError, WalletErrorCode, WalletResult},
        service::{
            BlockchainService, BlockchainServiceFactory, SignedTransaction, TransactionRequest,
            TransactionService,
        },
    };
}
