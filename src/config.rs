//! 配置管理模块
//! 支持从环境变量（含 .env）和 TOML 配置文件加载配置

use std::{path::Path, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{chain_config::ChainRegistry, ton_wallet::TonWalletVersion};

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub chains: ChainsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 各链 provider 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainsConfig {
    pub ethereum: EvmNetworkConfig,
    pub bitcoin: UtxoNetworkConfig,
    pub dogecoin: UtxoNetworkConfig,
    pub ton: TonNetworkConfig,
    /// HTTP 客户端超时（秒）
    pub request_timeout_secs: u64,
}

/// EVM JSON-RPC 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmNetworkConfig {
    pub rpc_url: String,
    /// 提供时启用区块/地址推送订阅
    pub ws_url: Option<String>,
    pub chain_id: u64,
}

/// Esplora 风格 REST API 配置（Bitcoin / Dogecoin 共用）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtxoNetworkConfig {
    pub api_url: String,
    pub testnet: bool,
    /// /fee-estimates 的目标确认块数
    pub fee_target_blocks: u32,
    /// provider 无费率数据时使用的费率（sat/vB）
    pub fallback_fee_rate: u64,
}

/// TON 配置
///
/// 钱包地址由钱包合约（版本 + wallet_id + 公钥）决定；修改 `wallet_version`
/// 或 `wallet_id` 会让同一把密钥得到不同的地址
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TonNetworkConfig {
    pub api_url: String,
    /// toncenter v3 index（按哈希查交易）
    pub index_url: Option<String>,
    pub api_key: Option<String>,
    pub wallet_version: TonWalletVersion,
    pub wallet_id: u32,
    pub workchain: i8,
    pub testnet: bool,
    /// 外部消息有效期（秒）
    pub message_ttl_secs: u32,
}

/// 安全相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// 助记词静态加密的 PBKDF2 迭代次数
    pub pbkdf2_iterations: u32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "text"),
        }
    }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self {
            ethereum: EvmNetworkConfig::default(),
            bitcoin: UtxoNetworkConfig {
                api_url: env_or("BITCOIN_API_URL", "https://blockstream.info/api"),
                testnet: env_flag("BITCOIN_TESTNET"),
                fee_target_blocks: env_parse("BITCOIN_FEE_TARGET_BLOCKS", 6),
                fallback_fee_rate: env_parse("BITCOIN_FALLBACK_FEE_RATE", 10),
            },
            dogecoin: UtxoNetworkConfig {
                // 自建 electrs (Esplora 兼容) 实例
                api_url: env_or("DOGECOIN_API_URL", "http://127.0.0.1:3002"),
                testnet: env_flag("DOGECOIN_TESTNET"),
                fee_target_blocks: env_parse("DOGECOIN_FEE_TARGET_BLOCKS", 6),
                // 0.01 DOGE/kB
                fallback_fee_rate: env_parse("DOGECOIN_FALLBACK_FEE_RATE", 1_000),
            },
            ton: TonNetworkConfig::default(),
            request_timeout_secs: env_parse("CHAIN_REQUEST_TIMEOUT_SECS", 30),
        }
    }
}

impl Default for EvmNetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: env_or("ETH_RPC_URL", "https://ethereum-rpc.publicnode.com"),
            ws_url: std::env::var("ETH_WS_URL").ok(),
            chain_id: env_parse("ETH_CHAIN_ID", 1),
        }
    }
}

impl Default for UtxoNetworkConfig {
    fn default() -> Self {
        Self {
            api_url: "https://blockstream.info/api".to_string(),
            testnet: false,
            fee_target_blocks: 6,
            fallback_fee_rate: 10,
        }
    }
}

impl Default for TonNetworkConfig {
    fn default() -> Self {
        Self {
            api_url: env_or("TON_API_URL", "https://toncenter.com/api/v2"),
            index_url: std::env::var("TON_INDEX_URL").ok(),
            api_key: std::env::var("TON_API_KEY").ok(),
            wallet_version: std::env::var("TON_WALLET_VERSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            wallet_id: env_parse("TON_WALLET_ID", crate::domain::ton_wallet::DEFAULT_WALLET_ID),
            workchain: env_parse("TON_WORKCHAIN", 0),
            testnet: env_flag("TON_TESTNET"),
            message_ttl_secs: env_parse("TON_MESSAGE_TTL_SECS", 60),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: env_parse(
                "MNEMONIC_PBKDF2_ITERATIONS",
                crate::infrastructure::pbkdf2::DEFAULT_ITERATIONS,
            ),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 .env，若存在）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            logging: LoggingConfig::default(),
            chains: ChainsConfig::default(),
            security: SecurityConfig::default(),
        })
    }

    /// 从配置文件加载配置（缺省字段使用默认值）
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        let http_urls = [
            ("ethereum.rpc_url", &self.chains.ethereum.rpc_url),
            ("bitcoin.api_url", &self.chains.bitcoin.api_url),
            ("dogecoin.api_url", &self.chains.dogecoin.api_url),
            ("ton.api_url", &self.chains.ton.api_url),
        ];
        for (name, url) in http_urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if let Some(ws) = &self.chains.ethereum.ws_url {
            if !ws.starts_with("ws://") && !ws.starts_with("wss://") {
                anyhow::bail!("ethereum.ws_url must start with ws:// or wss://");
            }
        }

        if self.chains.ton.workchain != 0 && self.chains.ton.workchain != -1 {
            anyhow::bail!("ton.workchain must be 0 or -1");
        }

        if self.security.pbkdf2_iterations < 10_000 {
            anyhow::bail!("security.pbkdf2_iterations must be at least 10000");
        }

        if let Err(errors) = ChainRegistry::from_config(&self.chains).validate_configs() {
            anyhow::bail!("invalid chain parameters: {}", errors.join("; "));
        }

        Ok(())
    }
}
