//! 地址验证模块
//!
//! 统一入口：按链标识分派到对应派生策略的纯格式校验，不访问网络

use std::collections::BTreeMap;

use crate::{
    config::ChainsConfig,
    domain::{
        chain_config::{Chain, ChainRegistry},
        derivation::{DerivationStrategy, DerivationStrategyFactory},
    },
    error::WalletResult,
    utils::chain_normalizer,
};

/// 地址验证器（每条链一个策略，按网络配置区分主网 / 测试网）
pub struct AddressValidator {
    strategies: BTreeMap<Chain, Box<dyn DerivationStrategy>>,
}

impl AddressValidator {
    pub fn new(chains: &ChainsConfig) -> WalletResult<Self> {
        let registry = ChainRegistry::from_config(chains);
        let strategies = Chain::ALL
            .iter()
            .map(|&chain| {
                DerivationStrategyFactory::from_registry(chain, &registry, chains)
                    .map(|strategy| (chain, strategy))
            })
            .collect::<WalletResult<_>>()?;

        Ok(Self { strategies })
    }

    /// 验证地址格式
    ///
    /// - `chain`: 链标识符（会自动标准化）
    /// - 不支持的链返回 `UnsupportedChain`
    pub fn validate(&self, chain: &str, address: &str) -> WalletResult<bool> {
        let chain = chain_normalizer::normalize_chain_identifier(chain)?;
        Ok(self.validate_for(chain, address))
    }

    pub fn validate_for(&self, chain: Chain, address: &str) -> bool {
        self.strategies
            .get(&chain)
            .map(|strategy| strategy.validate_address(address))
            .unwrap_or(false)
    }

    /// 该地址在哪些链上格式有效
    pub fn detect_chains(&self, address: &str) -> Vec<Chain> {
        self.strategies
            .iter()
            .filter(|(_, strategy)| strategy.validate_address(address))
            .map(|(chain, _)| *chain)
            .collect()
    }
}
