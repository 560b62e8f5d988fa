//! 多链钱包服务
//!
//! 一个种子派生多条链的地址；各链互不影响，单链失败只记录在该链的结果里

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    config::ChainsConfig,
    domain::{
        chain_config::{Chain, ChainConfig, ChainRegistry, CurveType},
        derivation::{DerivationStrategy, DerivationStrategyFactory},
        key_material::{AddressRecord, SecretMnemonic, Seed},
        mnemonic::MnemonicManager,
    },
    error::{WalletError, WalletResult},
};

/// 单链钱包派生请求
///
/// 助记词与 passphrase 存放在清零缓冲区，`Debug` 不输出明文
#[derive(Default)]
pub struct CreateWalletRequest {
    /// 链标识 (chain_id / symbol / 别名)
    pub chain: String,
    /// 必须由客户端提供
    pub mnemonic: Option<SecretMnemonic>,
    pub passphrase: Option<Zeroizing<String>>,
    /// 地址索引 (默认 0)
    pub index: Option<u32>,
}

impl fmt::Debug for CreateWalletRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateWalletRequest")
            .field("chain", &self.chain)
            .field("mnemonic", &self.mnemonic)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("index", &self.index)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub chain: Chain,
    pub address: String,
    /// 公钥 (hex)
    pub public_key: String,
    pub derivation_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletChainInfo {
    pub chain: Chain,
    pub name: String,
    pub symbol: String,
    pub curve_type: String,
}

/// 批量派生结果：每条链独立成功或失败
pub type BatchDerivation = BTreeMap<Chain, WalletResult<Vec<AddressRecord>>>;

/// 多链钱包创建结果：每条链独立成功或失败
pub type BatchWallets = BTreeMap<Chain, WalletResult<WalletInfo>>;

/// 多链钱包服务
pub struct MultiChainWalletService {
    registry: ChainRegistry,
    strategies: BTreeMap<Chain, Box<dyn DerivationStrategy>>,
    mnemonics: MnemonicManager,
}

impl MultiChainWalletService {
    /// 为所有支持的链创建策略
    pub fn new(chains: &ChainsConfig) -> WalletResult<Self> {
        let registry = ChainRegistry::from_config(chains);
        let mut strategies = BTreeMap::new();
        for chain in Chain::ALL {
            strategies.insert(
                chain,
                DerivationStrategyFactory::from_registry(chain, &registry, chains)?,
            );
        }

        Ok(Self {
            registry,
            strategies,
            mnemonics: MnemonicManager::default(),
        })
    }

    /// 替换某条链的策略
    pub fn with_strategy(mut self, strategy: Box<dyn DerivationStrategy>) -> Self {
        self.strategies.insert(strategy.chain(), strategy);
        self
    }

    pub fn strategy(&self, chain: Chain) -> WalletResult<&dyn DerivationStrategy> {
        self.strategies
            .get(&chain)
            .map(|s| s.as_ref())
            .ok_or_else(|| WalletError::UnsupportedChain(chain.to_string()))
    }

    pub fn supported_chains(&self) -> Vec<Chain> {
        self.strategies.keys().copied().collect()
    }

    /// 所有链派生 `count` 个地址
    pub fn derive_all_chains(&self, seed: &Seed, count: u32) -> BatchDerivation {
        let chains = self.supported_chains();
        self.derive_addresses_for_chains(seed, &chains, count)
    }

    /// 指定链派生 `count` 个地址
    pub fn derive_addresses_for_chains(
        &self,
        seed: &Seed,
        chains: &[Chain],
        count: u32,
    ) -> BatchDerivation {
        let mut results = BTreeMap::new();

        for &chain in chains {
            let result = self
                .strategy(chain)
                .and_then(|strategy| strategy.derive_addresses(seed, count));

            match &result {
                Ok(records) => {
                    tracing::debug!(chain = %chain, count = records.len(), "derived addresses");
                }
                Err(e) => {
                    tracing::warn!(chain = %chain, error = %e, "address derivation failed");
                }
            }
            results.insert(chain, result);
        }

        let failed = results.values().filter(|r| r.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                failed,
                total = results.len(),
                "batch derivation completed with failures"
            );
        }

        results
    }

    /// 从助记词派生单链钱包
    pub fn create_wallet(&self, request: &CreateWalletRequest) -> WalletResult<WalletInfo> {
        let chain: Chain = request.chain.parse()?;
        let mnemonic = request.mnemonic.as_ref().ok_or_else(|| {
            WalletError::InvalidRequest("mnemonic must be provided by the client".to_string())
        })?;

        let seed = self.mnemonics.to_seed(
            mnemonic.phrase(),
            request.passphrase.as_ref().map(|p| p.as_str()),
        )?;
        self.wallet_info(chain, &seed, request.index.unwrap_or(0))
    }

    /// 同一助记词在多条链上各派生索引 0 的钱包
    ///
    /// 助记词无效时整体失败；其余错误只记录在对应链的结果里
    pub fn create_multi_chain_wallets(
        &self,
        chains: &[Chain],
        mnemonic: &SecretMnemonic,
        passphrase: Option<&str>,
    ) -> WalletResult<BatchWallets> {
        let seed = self.mnemonics.to_seed(mnemonic.phrase(), passphrase)?;

        let mut wallets = BTreeMap::new();
        for &chain in chains {
            let result = self.wallet_info(chain, &seed, 0);
            if let Err(e) = &result {
                tracing::warn!(chain = %chain, error = %e, "failed to create wallet");
            }
            wallets.insert(chain, result);
        }

        Ok(wallets)
    }

    fn wallet_info(&self, chain: Chain, seed: &Seed, index: u32) -> WalletResult<WalletInfo> {
        let strategy = self.strategy(chain)?;
        let key = strategy.derive_private_key(seed, index)?;

        Ok(WalletInfo {
            chain,
            address: strategy.address_from_public_key(&key.public_key)?,
            public_key: key.public_key_hex(),
            derivation_path: key.derivation_path.clone(),
        })
    }

    /// 校验地址（纯格式与校验和）
    pub fn validate_address(&self, chain: Chain, address: &str) -> WalletResult<bool> {
        Ok(self.strategy(chain)?.validate_address(address))
    }

    pub fn list_supported_chains(&self) -> Vec<WalletChainInfo> {
        self.registry
            .list_all()
            .into_iter()
            .filter(|config| self.strategies.contains_key(&config.chain))
            .map(chain_info)
            .collect()
    }

    /// 按曲线类型分组
    pub fn list_chains_by_curve(&self) -> HashMap<String, Vec<WalletChainInfo>> {
        [CurveType::Secp256k1, CurveType::Ed25519]
            .into_iter()
            .map(|curve| {
                let chains = self
                    .registry
                    .get_by_curve_type(curve)
                    .into_iter()
                    .filter(|config| self.strategies.contains_key(&config.chain))
                    .map(chain_info)
                    .collect();
                (format!("{:?}", curve), chains)
            })
            .collect()
    }
}

fn chain_info(config: &ChainConfig) -> WalletChainInfo {
    WalletChainInfo {
        chain: config.chain,
        name: config.name.clone(),
        symbol: config.symbol.clone(),
        curve_type: format!("{:?}", config.curve_type),
    }
}

#[cfg(test)]
#[path = "multi_chain_wallet_tests.rs"]
mod multi_chain_wallet_tests;
