//! 多链钱包地址生成测试
//! 使用 BIP39 标准测试助记词验证各链地址与批量派生的容错

use super::*;
use crate::domain::key_material::KeyPair;

const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn mnemonic() -> Option<SecretMnemonic> {
    Some(SecretMnemonic::new(TEST_MNEMONIC.to_string()))
}

fn chains_config() -> ChainsConfig {
    let mut chains = ChainsConfig::default();
    chains.ethereum.chain_id = 1;
    chains.bitcoin.testnet = false;
    chains.dogecoin.testnet = false;
    chains.ton.testnet = false;
    chains.ton.wallet_version = crate::domain::ton_wallet::TonWalletVersion::V3R2;
    chains.ton.wallet_id = crate::domain::ton_wallet::DEFAULT_WALLET_ID;
    chains.ton.workchain = 0;
    chains
}

fn service() -> MultiChainWalletService {
    MultiChainWalletService::new(&chains_config()).unwrap()
}

fn seed() -> Seed {
    MnemonicManager::default().to_seed(TEST_MNEMONIC, None).unwrap()
}

/// 总是失败的策略，模拟单链故障
struct FailingStrategy(Chain);

impl DerivationStrategy for FailingStrategy {
    fn chain(&self) -> Chain {
        self.0
    }

    fn derivation_path(&self, index: u32) -> String {
        format!("m/0/{}", index)
    }

    fn derive_private_key(&self, _seed: &Seed, _index: u32) -> WalletResult<KeyPair> {
        Err(WalletError::derivation(self.0, "forced failure"))
    }

    fn address_from_public_key(&self, _public_key: &[u8]) -> WalletResult<String> {
        Err(WalletError::derivation(self.0, "forced failure"))
    }

    fn validate_address(&self, _address: &str) -> bool {
        false
    }
}

#[test]
fn test_ethereum_address_generation_bip39() {
    let wallet = service()
        .create_wallet(&CreateWalletRequest {
            chain: "ETH".to_string(),
            mnemonic: mnemonic(),
            passphrase: None,
            index: Some(0),
        })
        .unwrap();

    assert_eq!(wallet.chain, Chain::Ethereum);
    assert_eq!(wallet.address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(wallet.derivation_path, "m/44'/60'/0'/0/0");
    // 压缩公钥
    assert_eq!(wallet.public_key.len(), 66);
}

#[test]
fn test_create_wallet_requires_mnemonic() {
    let result = service().create_wallet(&CreateWalletRequest {
        chain: "btc".to_string(),
        ..Default::default()
    });
    assert!(matches!(result, Err(WalletError::InvalidRequest(_))));

    let result = service().create_wallet(&CreateWalletRequest {
        chain: "solana".to_string(),
        mnemonic: mnemonic(),
        ..Default::default()
    });
    assert!(matches!(result, Err(WalletError::UnsupportedChain(_))));
}

#[test]
fn test_passphrase_changes_addresses() {
    let svc = service();
    let plain = svc
        .create_wallet(&CreateWalletRequest {
            chain: "doge".to_string(),
            mnemonic: mnemonic(),
            ..Default::default()
        })
        .unwrap();
    let protected = svc
        .create_wallet(&CreateWalletRequest {
            chain: "doge".to_string(),
            mnemonic: mnemonic(),
            passphrase: Some(Zeroizing::new("TREZOR".to_string())),
            index: None,
        })
        .unwrap();

    assert_eq!(plain.address, "DBus3bamQjgJULBJtYXpEzDWQRwF5iwxgC");
    assert_ne!(plain.address, protected.address);
}

#[test]
fn test_derive_all_chains() {
    let results = service().derive_all_chains(&seed(), 5);
    assert_eq!(results.len(), 4);

    let eth = results[&Chain::Ethereum].as_ref().unwrap();
    assert_eq!(eth.len(), 5);
    assert_eq!(eth[0].address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(eth[1].address, "0x6Fac4D18c912343BF86fa7049364Dd4E424Ab9C0");
    assert_eq!(eth[2].address, "0xb6716976A3ebe8D39aCEB04372f22Ff8e6802D7A");

    let btc = results[&Chain::Bitcoin].as_ref().unwrap();
    assert_eq!(btc[0].address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");

    let ton = results[&Chain::Ton].as_ref().unwrap();
    assert_eq!(ton[0].address, "EQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina5Lf");
}

#[test]
fn test_partial_batch_failure_is_isolated() {
    let svc = service().with_strategy(Box::new(FailingStrategy(Chain::Bitcoin)));
    let results = svc.derive_all_chains(&seed(), 3);

    assert!(matches!(
        results[&Chain::Bitcoin],
        Err(WalletError::DerivationFailure {
            chain: Chain::Bitcoin,
            ..
        })
    ));
    for chain in [Chain::Ethereum, Chain::Dogecoin, Chain::Ton] {
        assert_eq!(results[&chain].as_ref().unwrap().len(), 3, "{}", chain);
    }
}

#[test]
fn test_derive_for_selected_chains() {
    let results = service().derive_addresses_for_chains(&seed(), &[Chain::Dogecoin], 2);
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[&Chain::Dogecoin].as_ref().unwrap()[0].derivation_path,
        "m/44'/3'/0'/0/0"
    );
}

#[test]
fn test_create_multi_chain_reports_each_chain() {
    let svc = service().with_strategy(Box::new(FailingStrategy(Chain::Ton)));
    let phrase = SecretMnemonic::new(TEST_MNEMONIC.to_string());
    let wallets = svc
        .create_multi_chain_wallets(&[Chain::Ethereum, Chain::Ton, Chain::Bitcoin], &phrase, None)
        .unwrap();

    assert_eq!(wallets.len(), 3);
    assert_eq!(
        wallets[&Chain::Ethereum].as_ref().unwrap().address,
        "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
    );
    assert_eq!(
        wallets[&Chain::Bitcoin].as_ref().unwrap().address,
        "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
    );
    // 失败的链不会被丢弃
    assert!(matches!(
        wallets[&Chain::Ton],
        Err(WalletError::DerivationFailure {
            chain: Chain::Ton,
            ..
        })
    ));
}

#[test]
fn test_create_multi_chain_rejects_invalid_mnemonic() {
    let phrase = SecretMnemonic::new("abandon abandon abandon".to_string());
    let result = service().create_multi_chain_wallets(&[Chain::Ethereum], &phrase, None);
    assert!(result.is_err());
}

#[test]
fn test_request_debug_hides_secrets() {
    let request = CreateWalletRequest {
        chain: "eth".to_string(),
        mnemonic: mnemonic(),
        passphrase: Some(Zeroizing::new("correct horse".to_string())),
        index: Some(3),
    };

    let printed = format!("{:?}", request);
    assert!(!printed.contains("abandon"));
    assert!(!printed.contains("correct horse"));
    assert!(printed.contains("12 words"));
    assert!(printed.contains("index: Some(3)"));
}

#[test]
fn test_list_chains_by_curve() {
    let grouped = service().list_chains_by_curve();
    assert_eq!(grouped["Secp256k1"].len(), 3);
    assert_eq!(grouped["Ed25519"].len(), 1);
}

#[test]
fn test_validate_address() {
    let svc = service();
    assert!(svc
        .validate_address(Chain::Ethereum, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94")
        .unwrap());
    assert!(!svc
        .validate_address(Chain::Dogecoin, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94")
        .unwrap());
}
