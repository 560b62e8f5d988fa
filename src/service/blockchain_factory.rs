//! 区块链服务工厂
//!
//! 每条链的服务在首次使用时创建并缓存，之后复用同一实例。
//! 工厂由调用方持有（通常包在 `Arc` 里共享），不使用全局状态。

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    config::ChainsConfig,
    domain::chain_config::Chain,
    error::WalletResult,
    service::{
        blockchain_service::BlockchainService, evm_service::EvmService, ton_service::TonService,
        utxo_service::UtxoService,
    },
};

pub struct BlockchainServiceFactory {
    config: ChainsConfig,
    cache: Arc<RwLock<HashMap<Chain, Arc<dyn BlockchainService>>>>,
}

impl BlockchainServiceFactory {
    pub fn new(config: ChainsConfig) -> Self {
        Self {
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ChainsConfig {
        &self.config
    }

    /// 获取（必要时创建）链服务；并发首次调用只会保留一个实例
    pub async fn get(&self, chain: Chain) -> WalletResult<Arc<dyn BlockchainService>> {
        // 1. 读锁快速路径
        if let Some(service) = self.cache.read().await.get(&chain) {
            return Ok(Arc::clone(service));
        }

        // 2. 写锁内再次检查
        let mut cache = self.cache.write().await;
        if let Some(service) = cache.get(&chain) {
            return Ok(Arc::clone(service));
        }

        // 3. 创建并缓存
        let service = self.build(chain)?;
        tracing::debug!(chain = %chain, "blockchain service created");
        cache.insert(chain, Arc::clone(&service));
        Ok(service)
    }

    /// 注入指定实现（测试桩或自定义 provider），覆盖已缓存的实例
    pub async fn with_service(&self, chain: Chain, service: Arc<dyn BlockchainService>) {
        self.cache.write().await.insert(chain, service);
    }

    /// 已创建服务的链，按枚举顺序
    pub async fn cached_chains(&self) -> Vec<Chain> {
        let cache = self.cache.read().await;
        Chain::ALL
            .iter()
            .copied()
            .filter(|chain| cache.contains_key(chain))
            .collect()
    }

    fn build(&self, chain: Chain) -> WalletResult<Arc<dyn BlockchainService>> {
        Ok(match chain {
            Chain::Ethereum => Arc::new(EvmService::new(
                &self.config.ethereum,
                self.config.request_timeout_secs,
            )?),
            Chain::Bitcoin | Chain::Dogecoin => Arc::new(UtxoService::new(chain, &self.config)?),
            Chain::Ton => Arc::new(TonService::new(&self.config)?),
        })
    }
}
