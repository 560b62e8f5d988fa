//! Service 模块
//!
//! 链服务（provider 访问）、服务工厂与交易流水线

pub mod blockchain_client;
pub mod blockchain_factory;
pub mod blockchain_service;
pub mod evm_service;
pub mod ton_service;
pub mod transaction_builder;
pub mod utxo_service;

// Re-exports
pub use blockchain_factory::BlockchainServiceFactory;
pub use blockchain_service::{
    Balance, BlockId, BlockchainService, ChainBlock, ChainEvent, ChainTransaction,
    FeeEstimateRequest, FeeOverride, NetworkState, Subscription,
};
pub use transaction_builder::{
    SignedTransaction, TokenSpec, TransactionRequest, TransactionService,
};
