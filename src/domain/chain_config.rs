//! 多链配置模块
//!
//! 定义支持的四条链及其派生路径、地址编码与网络参数表

use std::{collections::HashMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    config::ChainsConfig,
    error::{WalletError, WalletResult},
};

/// 支持的链（封闭集合，新增链需要同时实现派生策略、区块链服务与交易构建）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// EVM 账户链
    Ethereum,
    /// UTXO 链 A (native segwit)
    Bitcoin,
    /// UTXO 链 B (legacy P2PKH)
    Dogecoin,
    /// ed25519 账户链（地址由钱包合约决定）
    Ton,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Ethereum, Chain::Bitcoin, Chain::Dogecoin, Chain::Ton];

    /// 规范名称（小写）
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bitcoin => "bitcoin",
            Chain::Dogecoin => "dogecoin",
            Chain::Ton => "ton",
        }
    }

    pub fn is_evm(&self) -> bool {
        matches!(self, Chain::Ethereum)
    }

    pub fn is_utxo(&self) -> bool {
        matches!(self, Chain::Bitcoin | Chain::Dogecoin)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::utils::chain_normalizer::normalize_chain_identifier(s)
    }
}

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    /// secp256k1 曲线 (Ethereum, Bitcoin, Dogecoin)
    Secp256k1,
    /// ed25519 曲线 (TON)
    Ed25519,
}

/// 地址编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFormat {
    /// 十六进制 0x... (EIP-55 checksum)
    Hex,
    /// Bech32 witness program (P2WPKH)
    Bech32,
    /// Base58Check + 版本字节
    Base58Check,
    /// TON 用户友好格式 (base64url + CRC16)
    TonUserFriendly,
}

/// HD 派生标准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivationStandard {
    /// BIP44: m/44'/coin_type'/0'/0/index
    BIP44,
    /// BIP84: m/84'/coin_type'/0'/0/index (native segwit)
    BIP84,
    /// SLIP-0010: m/44'/coin_type'/index' (ed25519 只支持硬化派生)
    SLIP0010,
}

impl DerivationStandard {
    pub fn purpose(&self) -> u32 {
        match self {
            DerivationStandard::BIP44 | DerivationStandard::SLIP0010 => 44,
            DerivationStandard::BIP84 => 84,
        }
    }
}

/// 链配置（网络参数表，纯数据）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: Chain,
    /// 链名称
    pub name: String,
    /// 链符号 (ETH, BTC, DOGE, TON)
    pub symbol: String,
    /// 最小单位精度
    pub decimals: u32,
    pub curve_type: CurveType,
    pub address_format: AddressFormat,
    pub derivation_standard: DerivationStandard,
    /// SLIP-44 coin type
    pub coin_type: u32,
    /// EIP-155 chain id（仅 EVM）
    pub evm_chain_id: Option<u64>,
    /// P2PKH 版本字节（Base58Check 链）
    pub p2pkh_version: Option<u8>,
    /// P2SH 版本字节（Base58Check 链）
    pub p2sh_version: Option<u8>,
    /// Bech32 HRP
    pub bech32_hrp: Option<String>,
    /// 签名消息前缀
    pub message_prefix: Option<String>,
    /// 找零粉尘阈值（最小单位），低于等于该值的找零并入手续费
    pub dust_limit: u64,
    /// 是否为测试网
    pub is_testnet: bool,
}

impl ChainConfig {
    /// 生成派生路径（account 固定为 0，外部地址链）
    pub fn derivation_path(&self, index: u32) -> String {
        match self.derivation_standard {
            DerivationStandard::BIP44 | DerivationStandard::BIP84 => format!(
                "m/{}'/{}'/0'/0/{}",
                self.derivation_standard.purpose(),
                self.coin_type,
                index
            ),
            DerivationStandard::SLIP0010 => {
                format!("m/44'/{}'/{}'", self.coin_type, index)
            }
        }
    }
}

/// 链配置注册表
pub struct ChainRegistry {
    configs: HashMap<Chain, ChainConfig>,
}

impl ChainRegistry {
    /// 创建主网注册表
    pub fn new() -> Self {
        let mut registry = Self {
            configs: HashMap::new(),
        };

        registry.register_default_chains();
        registry
    }

    /// 按运行配置创建注册表（测试网参数、EVM chain id）
    pub fn from_config(chains: &ChainsConfig) -> Self {
        let mut registry = Self::new();

        if let Some(eth) = registry.configs.get_mut(&Chain::Ethereum) {
            eth.evm_chain_id = Some(chains.ethereum.chain_id);
            eth.is_testnet = chains.ethereum.chain_id != 1;
        }

        if chains.bitcoin.testnet {
            registry.register(ChainConfig {
                name: "Bitcoin Testnet".to_string(),
                coin_type: 1,
                bech32_hrp: Some("tb".to_string()),
                is_testnet: true,
                ..Self::bitcoin_mainnet()
            });
        }

        if chains.dogecoin.testnet {
            registry.register(ChainConfig {
                name: "Dogecoin Testnet".to_string(),
                coin_type: 1,
                p2pkh_version: Some(0x71),
                p2sh_version: Some(0xc4),
                is_testnet: true,
                ..Self::dogecoin_mainnet()
            });
        }

        if chains.ton.testnet {
            if let Some(ton) = registry.configs.get_mut(&Chain::Ton) {
                ton.is_testnet = true;
            }
        }

        registry
    }

    fn bitcoin_mainnet() -> ChainConfig {
        ChainConfig {
            chain: Chain::Bitcoin,
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            decimals: 8,
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Bech32,
            derivation_standard: DerivationStandard::BIP84,
            coin_type: 0,
            evm_chain_id: None,
            p2pkh_version: Some(0x00),
            p2sh_version: Some(0x05),
            bech32_hrp: Some("bc".to_string()),
            message_prefix: Some("\x18Bitcoin Signed Message:\n".to_string()),
            dust_limit: 546,
            is_testnet: false,
        }
    }

    fn dogecoin_mainnet() -> ChainConfig {
        ChainConfig {
            chain: Chain::Dogecoin,
            name: "Dogecoin".to_string(),
            symbol: "DOGE".to_string(),
            decimals: 8,
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Base58Check,
            derivation_standard: DerivationStandard::BIP44,
            coin_type: 3,
            evm_chain_id: None,
            p2pkh_version: Some(0x1e),
            p2sh_version: Some(0x16),
            bech32_hrp: None,
            message_prefix: Some("\x19Dogecoin Signed Message:\n".to_string()),
            // 0.01 DOGE
            dust_limit: 1_000_000,
            is_testnet: false,
        }
    }

    /// 注册默认支持的链
    fn register_default_chains(&mut self) {
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Secp256k1 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        self.register(ChainConfig {
            chain: Chain::Ethereum,
            name: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Hex,
            derivation_standard: DerivationStandard::BIP44,
            coin_type: 60,
            evm_chain_id: Some(1),
            p2pkh_version: None,
            p2sh_version: None,
            bech32_hrp: None,
            message_prefix: Some("\x19Ethereum Signed Message:\n".to_string()),
            dust_limit: 0,
            is_testnet: false,
        });

        self.register(Self::bitcoin_mainnet());
        self.register(Self::dogecoin_mainnet());

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Ed25519 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        // TON: 地址 = 钱包合约 StateInit 哈希，与钱包版本相关
        self.register(ChainConfig {
            chain: Chain::Ton,
            name: "TON".to_string(),
            symbol: "TON".to_string(),
            decimals: 9,
            curve_type: CurveType::Ed25519,
            address_format: AddressFormat::TonUserFriendly,
            derivation_standard: DerivationStandard::SLIP0010,
            coin_type: 607,
            evm_chain_id: None,
            p2pkh_version: None,
            p2sh_version: None,
            bech32_hrp: None,
            message_prefix: None,
            dust_limit: 0,
            is_testnet: false,
        });
    }

    /// 注册链配置（同一链重复注册时覆盖）
    pub fn register(&mut self, config: ChainConfig) {
        self.configs.insert(config.chain, config);
    }

    pub fn get(&self, chain: Chain) -> WalletResult<&ChainConfig> {
        self.configs
            .get(&chain)
            .ok_or_else(|| WalletError::UnsupportedChain(chain.to_string()))
    }

    /// 按曲线类型分组获取所有链
    pub fn get_by_curve_type(&self, curve_type: CurveType) -> Vec<&ChainConfig> {
        let mut configs: Vec<&ChainConfig> = self
            .configs
            .values()
            .filter(|c| c.curve_type == curve_type)
            .collect();
        configs.sort_by_key(|c| c.chain);
        configs
    }

    /// 列出所有支持的链（按 Chain 顺序）
    pub fn list_all(&self) -> Vec<&ChainConfig> {
        let mut configs: Vec<&ChainConfig> = self.configs.values().collect();
        configs.sort_by_key(|c| c.chain);
        configs
    }

    /// 验证链配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (chain, config) in &self.configs {
            if config.name.is_empty() {
                errors.push(format!("Chain {} has empty name", chain));
            }
            if config.symbol.is_empty() {
                errors.push(format!("Chain {} has empty symbol", chain));
            }

            if config.coin_type == 0 && *chain != Chain::Bitcoin {
                errors.push(format!(
                    "Chain {} has invalid coin_type: 0 (only BTC should use 0)",
                    config.name
                ));
            }

            match (config.curve_type, config.address_format) {
                (CurveType::Secp256k1, AddressFormat::Hex) => match config.evm_chain_id {
                    None => errors.push(format!("Chain {} is missing evm_chain_id", config.name)),
                    // EIP-155 不允许 0
                    Some(0) => errors.push(format!("Chain {} has evm_chain_id 0", config.name)),
                    Some(_) => {}
                },
                (CurveType::Secp256k1, AddressFormat::Bech32) => {
                    if config.bech32_hrp.is_none() {
                        errors.push(format!("Chain {} is missing bech32_hrp", config.name));
                    }
                }
                (CurveType::Secp256k1, AddressFormat::Base58Check) => {
                    if config.p2pkh_version.is_none() {
                        errors.push(format!("Chain {} is missing p2pkh_version", config.name));
                    }
                }
                (CurveType::Ed25519, AddressFormat::TonUserFriendly) => {
                    if config.derivation_standard != DerivationStandard::SLIP0010 {
                        errors.push(format!(
                            "Chain {} uses ed25519 but not SLIP-0010",
                            config.name
                        ));
                    }
                }
                _ => {
                    errors.push(format!(
                        "Chain {} has incompatible curve_type and address_format: {:?} / {:?}",
                        config.name, config.curve_type, config.address_format
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
