//! 链参数表测试：路径、版本字节与测试网切换

use super::*;

#[test]
fn test_derivation_paths() {
    let registry = ChainRegistry::new();

    let eth = registry.get(Chain::Ethereum).unwrap();
    assert_eq!(eth.derivation_path(0), "m/44'/60'/0'/0/0");
    assert_eq!(eth.derivation_path(7), "m/44'/60'/0'/0/7");

    let btc = registry.get(Chain::Bitcoin).unwrap();
    assert_eq!(btc.derivation_path(0), "m/84'/0'/0'/0/0");

    let doge = registry.get(Chain::Dogecoin).unwrap();
    assert_eq!(doge.derivation_path(2), "m/44'/3'/0'/0/2");

    // ed25519 只能硬化派生
    let ton = registry.get(Chain::Ton).unwrap();
    assert_eq!(ton.derivation_path(3), "m/44'/607'/3'");
}

#[test]
fn test_zero_evm_chain_id_is_invalid() {
    let mut chains = crate::config::ChainsConfig::default();
    chains.ethereum.chain_id = 0;

    let errors = ChainRegistry::from_config(&chains)
        .validate_configs()
        .unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("evm_chain_id 0"));
}

#[test]
fn test_network_parameters() {
    let registry = ChainRegistry::new();

    let doge = registry.get(Chain::Dogecoin).unwrap();
    assert_eq!(doge.p2pkh_version, Some(0x1e));
    assert_eq!(doge.p2sh_version, Some(0x16));
    assert_eq!(doge.coin_type, 3);
    assert_eq!(
        doge.message_prefix.as_deref(),
        Some("\x19Dogecoin Signed Message:\n")
    );

    let btc = registry.get(Chain::Bitcoin).unwrap();
    assert_eq!(btc.bech32_hrp.as_deref(), Some("bc"));
    assert_eq!(btc.dust_limit, 546);

    let eth = registry.get(Chain::Ethereum).unwrap();
    assert_eq!(eth.evm_chain_id, Some(1));
    assert_eq!(eth.decimals, 18);
}

#[test]
fn test_curve_grouping() {
    let registry = ChainRegistry::new();

    let secp = registry.get_by_curve_type(CurveType::Secp256k1);
    let chains: Vec<Chain> = secp.iter().map(|c| c.chain).collect();
    assert_eq!(chains, vec![Chain::Ethereum, Chain::Bitcoin, Chain::Dogecoin]);

    let ed = registry.get_by_curve_type(CurveType::Ed25519);
    assert_eq!(ed.len(), 1);
    assert_eq!(ed[0].chain, Chain::Ton);
}

#[test]
fn test_default_registry_is_valid() {
    let registry = ChainRegistry::new();
    assert!(registry.validate_configs().is_ok());
    assert_eq!(registry.list_all().len(), Chain::ALL.len());
}

#[test]
fn test_testnet_registry() {
    let mut chains = crate::config::ChainsConfig::default();
    chains.bitcoin.testnet = true;
    chains.dogecoin.testnet = true;
    chains.ethereum.chain_id = 11155111;

    let registry = ChainRegistry::from_config(&chains);

    let btc = registry.get(Chain::Bitcoin).unwrap();
    assert!(btc.is_testnet);
    assert_eq!(btc.bech32_hrp.as_deref(), Some("tb"));
    assert_eq!(btc.derivation_path(0), "m/84'/1'/0'/0/0");

    let doge = registry.get(Chain::Dogecoin).unwrap();
    assert_eq!(doge.p2pkh_version, Some(0x71));

    let eth = registry.get(Chain::Ethereum).unwrap();
    assert_eq!(eth.evm_chain_id, Some(11155111));
    assert!(eth.is_testnet);

    assert!(registry.validate_configs().is_ok());
}

#[test]
fn test_chain_display_and_parse() {
    assert_eq!(Chain::Dogecoin.to_string(), "dogecoin");
    assert_eq!("ETH".parse::<Chain>().unwrap(), Chain::Ethereum);
    assert_eq!(" doge ".parse::<Chain>().unwrap(), Chain::Dogecoin);
    assert!(matches!(
        "solana".parse::<Chain>(),
        Err(WalletError::UnsupportedChain(_))
    ));
}
