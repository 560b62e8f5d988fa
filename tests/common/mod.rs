//! 测试辅助模块
//! 标准测试助记词与各链已知地址

#![allow(dead_code)]

use ironcore_wallet::{
    config::ChainsConfig,
    domain::{mnemonic::MnemonicManager, Seed},
};

/// BIP39 标准测试向量
pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// m/44'/60'/0'/0/{0..4}
pub const ETH_ADDRESSES: [&str; 5] = [
    "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
    "0x6Fac4D18c912343BF86fa7049364Dd4E424Ab9C0",
    "0xb6716976A3ebe8D39aCEB04372f22Ff8e6802D7A",
    "0xF3f50213C1d2e255e4B2bAD430F8A38EEF8D718E",
    "0x51cA8ff9f1C0a99f88E86B8112eA3237F55374cA",
];

/// m/84'/0'/0'/0/{0,1}
pub const BTC_ADDRESSES: [&str; 2] = [
    "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu",
    "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g",
];

/// m/44'/3'/0'/0/0
pub const DOGE_ADDRESS: &str = "DBus3bamQjgJULBJtYXpEzDWQRwF5iwxgC";

/// m/44'/607'/{0,1}'，wallet v3r2
pub const TON_ADDRESSES: [&str; 2] = [
    "EQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina5Lf",
    "EQBwCHMxXsb6n-AJC5HBhxaXqdcI7qD2I8mQSkYTHqD2dR1F",
];

/// 测试用低迭代次数
pub fn mnemonics() -> MnemonicManager {
    MnemonicManager::with_iterations(1_000)
}

pub fn test_seed() -> Seed {
    mnemonics().to_seed(TEST_MNEMONIC, None).unwrap()
}

/// 固定主网参数，不受环境变量影响
pub fn mainnet_chains() -> ChainsConfig {
    let mut chains = ChainsConfig::default();
    chains.ethereum.chain_id = 1;
    chains.bitcoin.testnet = false;
    chains.dogecoin.testnet = false;
    chains.ton.testnet = false;
    chains.ton.workchain = 0;
    chains.ton.wallet_id = 698_983_191;
    chains.ton.wallet_version = ironcore_wallet::domain::TonWalletVersion::V3R2;
    chains
}
