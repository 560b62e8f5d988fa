//! 链标识符标准化模块
//!
//! 接受 chain_id / symbol / 别名，统一解析为 `Chain`

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::{
    domain::chain_config::Chain,
    error::{WalletError, WalletResult},
};

/// 链标识符配置
#[derive(Debug, Clone)]
pub struct ChainIdentifier {
    pub chain: Chain,
    /// 链ID（EVM 为 EIP-155，其余为 SLIP-44 coin type）
    pub chain_id: i64,
    /// 符号（大写）
    pub symbol: &'static str,
    /// 全称
    pub full_name: &'static str,
    /// 别名列表（小写）
    pub aliases: &'static [&'static str],
}

/// 链标识符注册表（静态初始化，键全部小写）
static CHAIN_REGISTRY: Lazy<HashMap<String, ChainIdentifier>> = Lazy::new(|| {
    let chains = vec![
        ChainIdentifier {
            chain: Chain::Ethereum,
            chain_id: 1,
            symbol: "ETH",
            full_name: "Ethereum Mainnet",
            aliases: &["eth", "ethereum", "evm", "mainnet"],
        },
        ChainIdentifier {
            chain: Chain::Bitcoin,
            chain_id: 0,
            symbol: "BTC",
            full_name: "Bitcoin",
            aliases: &["btc", "bitcoin", "xbt"],
        },
        ChainIdentifier {
            chain: Chain::Dogecoin,
            chain_id: 3,
            symbol: "DOGE",
            full_name: "Dogecoin",
            aliases: &["doge", "dogecoin"],
        },
        ChainIdentifier {
            chain: Chain::Ton,
            chain_id: 607,
            symbol: "TON",
            full_name: "The Open Network",
            aliases: &["ton", "toncoin", "the-open-network"],
        },
    ];

    let mut registry = HashMap::new();
    for chain in chains {
        registry.insert(chain.chain.as_str().to_string(), chain.clone());

        for alias in chain.aliases {
            registry.insert(alias.to_string(), chain.clone());
        }

        registry.insert(chain.chain_id.to_string(), chain.clone());
    }

    registry
});

/// 标准化链标识符
///
/// ```rust
/// # use ironcore_wallet::utils::chain_normalizer::normalize_chain_identifier;
/// # use ironcore_wallet::domain::chain_config::Chain;
/// assert_eq!(normalize_chain_identifier("ETH").unwrap(), Chain::Ethereum);
/// assert_eq!(normalize_chain_identifier("3").unwrap(), Chain::Dogecoin);
/// ```
pub fn normalize_chain_identifier(input: &str) -> WalletResult<Chain> {
    get_chain_identifier(input).map(|id| id.chain)
}

/// 获取链标识信息
pub fn get_chain_identifier(input: &str) -> WalletResult<&'static ChainIdentifier> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(WalletError::UnsupportedChain(
            "chain identifier cannot be empty".to_string(),
        ));
    }

    CHAIN_REGISTRY
        .get(&trimmed.to_lowercase())
        .ok_or_else(|| WalletError::UnsupportedChain(trimmed.to_string()))
}

/// 判断是否为EVM链
pub fn is_evm_chain(chain: &str) -> bool {
    normalize_chain_identifier(chain)
        .map(|c| c.is_evm())
        .unwrap_or(false)
}

/// 判断是否为UTXO链
pub fn is_utxo_chain(chain: &str) -> bool {
    normalize_chain_identifier(chain)
        .map(|c| c.is_utxo())
        .unwrap_or(false)
}

/// 获取链符号
pub fn get_chain_symbol(chain: &str) -> WalletResult<&'static str> {
    get_chain_identifier(chain).map(|id| id.symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ethereum() {
        assert_eq!(normalize_chain_identifier("ETH").unwrap(), Chain::Ethereum);
        assert_eq!(normalize_chain_identifier("eth").unwrap(), Chain::Ethereum);
        assert_eq!(normalize_chain_identifier("Ethereum").unwrap(), Chain::Ethereum);
        assert_eq!(normalize_chain_identifier("1").unwrap(), Chain::Ethereum);
    }

    #[test]
    fn test_normalize_utxo_and_ton() {
        assert_eq!(normalize_chain_identifier("BTC").unwrap(), Chain::Bitcoin);
        assert_eq!(normalize_chain_identifier("0").unwrap(), Chain::Bitcoin);
        assert_eq!(normalize_chain_identifier("DOGE").unwrap(), Chain::Dogecoin);
        assert_eq!(normalize_chain_identifier("607").unwrap(), Chain::Ton);
        assert_eq!(normalize_chain_identifier("  Ton ").unwrap(), Chain::Ton);
    }

    #[test]
    fn test_chain_kind_helpers() {
        assert!(is_evm_chain("ethereum"));
        assert!(!is_evm_chain("dogecoin"));
        assert!(is_utxo_chain("btc"));
        assert!(is_utxo_chain("doge"));
        assert!(!is_utxo_chain("ton"));
        assert!(!is_evm_chain("solana"));
        assert_eq!(get_chain_symbol("dogecoin").unwrap(), "DOGE");
    }

    #[test]
    fn test_invalid_chain() {
        assert!(matches!(
            normalize_chain_identifier("invalid_chain"),
            Err(WalletError::UnsupportedChain(_))
        ));
        assert!(normalize_chain_identifier("").is_err());
        assert!(normalize_chain_identifier("   ").is_err());
    }
}
