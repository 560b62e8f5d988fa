//! 钱包派生策略
//!
//! 每条链一个策略，统一从 BIP39 种子派生密钥与地址：
//! - EVM: BIP44 secp256k1，EIP-55 校验和地址
//! - Bitcoin: BIP84 P2WPKH
//! - Dogecoin: BIP44 P2PKH (Base58Check)
//! - TON: SLIP-0010 ed25519，地址来自钱包合约

use bitcoin::hashes::Hash;
use coins_bip32::prelude::XPriv;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use hmac::{Hmac, Mac};
use k256::ecdsa::{SigningKey, VerifyingKey};
use sha2::Sha512;
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::{
    config::ChainsConfig,
    domain::{
        chain_config::{Chain, ChainConfig, ChainRegistry},
        key_material::{AddressRecord, KeyPair, Seed},
        ton_cell::TonAddress,
        ton_wallet::{TonWalletVersion, WalletV3},
    },
    error::{WalletError, WalletResult},
};

/// 钱包派生策略 trait
pub trait DerivationStrategy: Send + Sync {
    fn chain(&self) -> Chain;

    fn derivation_path(&self, index: u32) -> String;

    /// 派生指定索引的密钥对（各索引相互独立）
    fn derive_private_key(&self, seed: &Seed, index: u32) -> WalletResult<KeyPair>;

    /// 由公钥计算地址
    fn address_from_public_key(&self, public_key: &[u8]) -> WalletResult<String>;

    /// 校验地址格式与校验和（纯函数，不访问网络）
    fn validate_address(&self, address: &str) -> bool;

    fn derive_address(&self, seed: &Seed, index: u32) -> WalletResult<AddressRecord> {
        let key = self.derive_private_key(seed, index)?;
        Ok(AddressRecord {
            chain: self.chain(),
            address: self.address_from_public_key(&key.public_key)?,
            derivation_path: key.derivation_path.clone(),
            index,
        })
    }

    /// 派生索引 `0..count` 的地址，按索引顺序返回；任一失败则整体失败
    fn derive_addresses(&self, seed: &Seed, count: u32) -> WalletResult<Vec<AddressRecord>> {
        (0..count).map(|i| self.derive_address(seed, i)).collect()
    }
}

/// BIP32 secp256k1 派生
fn derive_secp256k1(
    chain: Chain,
    seed: &Seed,
    path: &str,
) -> WalletResult<(Zeroizing<Vec<u8>>, Vec<u8>)> {
    let master = XPriv::root_from_seed(seed.as_bytes(), None)
        .map_err(|e| WalletError::derivation(chain, e))?;
    let child = master
        .derive_path(path)
        .map_err(|e| WalletError::derivation(chain, e))?;

    let signing_key: &SigningKey = child.as_ref();
    let private_key = Zeroizing::new(signing_key.to_bytes().to_vec());
    let public_key = signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec();
    Ok((private_key, public_key))
}

fn secp256k1_key_pair(
    config: &ChainConfig,
    seed: &Seed,
    index: u32,
) -> WalletResult<KeyPair> {
    let path = config.derivation_path(index);
    let (private_key, public_key) = derive_secp256k1(config.chain, seed, &path)?;
    Ok(KeyPair::new(config.chain, index, path, private_key, public_key))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EVM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct EvmStrategy {
    config: ChainConfig,
}

impl EvmStrategy {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }
}

/// EIP-55 校验和编码
pub fn evm_checksum_address(address: &[u8; 20]) -> String {
    ethers::utils::to_checksum(&ethers::types::Address::from_slice(address), None)
}

/// 全小写 / 全大写接受；大小写混合时必须符合 EIP-55
pub fn is_valid_evm_address(address: &str) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    if body.len() != 40 {
        return false;
    }
    let Ok(bytes) = hex::decode(body) else {
        return false;
    };

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    let mut raw = [0u8; 20];
    raw.copy_from_slice(&bytes);
    evm_checksum_address(&raw) == address
}

impl DerivationStrategy for EvmStrategy {
    fn chain(&self) -> Chain {
        self.config.chain
    }

    fn derivation_path(&self, index: u32) -> String {
        self.config.derivation_path(index)
    }

    fn derive_private_key(&self, seed: &Seed, index: u32) -> WalletResult<KeyPair> {
        secp256k1_key_pair(&self.config, seed, index)
    }

    fn address_from_public_key(&self, public_key: &[u8]) -> WalletResult<String> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|e| WalletError::derivation(self.chain(), e))?;
        let uncompressed = key.to_encoded_point(false);
        // 去掉 0x04 前缀后取 keccak256 的后 20 字节
        let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Ok(evm_checksum_address(&address))
    }

    fn validate_address(&self, address: &str) -> bool {
        is_valid_evm_address(address)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bitcoin (P2WPKH)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BitcoinStrategy {
    config: ChainConfig,
    network: bitcoin::Network,
}

impl BitcoinStrategy {
    pub fn new(config: ChainConfig) -> Self {
        let network = match config.bech32_hrp.as_deref() {
            Some("tb") => bitcoin::Network::Testnet,
            Some("bcrt") => bitcoin::Network::Regtest,
            _ => bitcoin::Network::Bitcoin,
        };
        Self { config, network }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn network(&self) -> bitcoin::Network {
        self.network
    }

    /// 解析并检查网络
    pub fn parse_address(&self, address: &str) -> WalletResult<bitcoin::Address> {
        address
            .trim()
            .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
            .ok()
            .and_then(|a| a.require_network(self.network).ok())
            .ok_or_else(|| WalletError::invalid_address(self.chain(), address))
    }
}

impl DerivationStrategy for BitcoinStrategy {
    fn chain(&self) -> Chain {
        self.config.chain
    }

    fn derivation_path(&self, index: u32) -> String {
        self.config.derivation_path(index)
    }

    fn derive_private_key(&self, seed: &Seed, index: u32) -> WalletResult<KeyPair> {
        secp256k1_key_pair(&self.config, seed, index)
    }

    fn address_from_public_key(&self, public_key: &[u8]) -> WalletResult<String> {
        let public_key = bitcoin::PublicKey::from_slice(public_key)
            .map_err(|e| WalletError::derivation(self.chain(), e))?;
        let address = bitcoin::Address::p2wpkh(&public_key, self.network)
            .map_err(|e| WalletError::derivation(self.chain(), e))?;
        Ok(address.to_string())
    }

    fn validate_address(&self, address: &str) -> bool {
        self.parse_address(address).is_ok()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dogecoin (P2PKH, Base58Check)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct DogecoinStrategy {
    config: ChainConfig,
}

/// Base58Check 地址解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base58Payload {
    PubkeyHash([u8; 20]),
    ScriptHash([u8; 20]),
}

impl DogecoinStrategy {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    fn p2pkh_version(&self) -> u8 {
        self.config.p2pkh_version.unwrap_or(0x1e)
    }

    fn p2sh_version(&self) -> u8 {
        self.config.p2sh_version.unwrap_or(0x16)
    }

    pub fn decode_address(&self, address: &str) -> WalletResult<Base58Payload> {
        let invalid = || WalletError::invalid_address(self.chain(), address);
        let payload = bs58::decode(address.trim())
            .with_check(None)
            .into_vec()
            .map_err(|_| invalid())?;
        if payload.len() != 21 {
            return Err(invalid());
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        match payload[0] {
            v if v == self.p2pkh_version() => Ok(Base58Payload::PubkeyHash(hash)),
            v if v == self.p2sh_version() => Ok(Base58Payload::ScriptHash(hash)),
            _ => Err(invalid()),
        }
    }

    pub fn encode_pubkey_hash(&self, hash: &[u8; 20]) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.p2pkh_version());
        payload.extend_from_slice(hash);
        bs58::encode(payload).with_check().into_string()
    }
}

impl DerivationStrategy for DogecoinStrategy {
    fn chain(&self) -> Chain {
        self.config.chain
    }

    fn derivation_path(&self, index: u32) -> String {
        self.config.derivation_path(index)
    }

    fn derive_private_key(&self, seed: &Seed, index: u32) -> WalletResult<KeyPair> {
        secp256k1_key_pair(&self.config, seed, index)
    }

    fn address_from_public_key(&self, public_key: &[u8]) -> WalletResult<String> {
        let public_key = bitcoin::PublicKey::from_slice(public_key)
            .map_err(|e| WalletError::derivation(self.chain(), e))?;
        if !public_key.compressed {
            return Err(WalletError::derivation(
                self.chain(),
                "uncompressed public keys are not used",
            ));
        }
        Ok(self.encode_pubkey_hash(&public_key.pubkey_hash().to_byte_array()))
    }

    fn validate_address(&self, address: &str) -> bool {
        self.decode_address(address).is_ok()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TON (SLIP-0010 ed25519 + 钱包合约)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const HARDENED: u32 = 0x8000_0000;

/// SLIP-0010 ed25519 派生（所有层级均为硬化派生）
///
/// 返回 (私钥, chain code)
pub fn slip10_derive(
    seed: &[u8],
    path: &[u32],
) -> WalletResult<(Zeroizing<[u8; 32]>, [u8; 32])> {
    let hmac = |key: &[u8], data: &[&[u8]]| -> WalletResult<Zeroizing<[u8; 64]>> {
        let mut mac = Hmac::<Sha512>::new_from_slice(key)
            .map_err(|e| WalletError::derivation(Chain::Ton, e))?;
        for part in data {
            mac.update(part);
        }
        let mut out = Zeroizing::new([0u8; 64]);
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    };

    let mut i = hmac(b"ed25519 seed", &[seed])?;
    for &index in path {
        let hardened = index | HARDENED;
        let (key, chain_code) = i.split_at(32);
        i = hmac(chain_code, &[&[0u8][..], key, &hardened.to_be_bytes()[..]])?;
    }

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&i[..32]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&i[32..]);
    Ok((key, chain_code))
}

/// 解析 `m/44'/607'/0'` 形式的全硬化路径
fn parse_hardened_path(path: &str) -> WalletResult<Vec<u32>> {
    let invalid = || WalletError::derivation(Chain::Ton, format!("invalid path: {}", path));
    let rest = path.strip_prefix("m/").ok_or_else(invalid)?;
    rest.split('/')
        .map(|segment| {
            let n = segment.strip_suffix('\'').ok_or_else(invalid)?;
            let n: u32 = n.parse().map_err(|_| invalid())?;
            if n >= HARDENED {
                return Err(invalid());
            }
            Ok(n)
        })
        .collect()
}

pub struct TonStrategy {
    config: ChainConfig,
    wallet_version: TonWalletVersion,
    wallet_id: u32,
    workchain: i8,
}

impl TonStrategy {
    pub fn new(config: ChainConfig, ton: &crate::config::TonNetworkConfig) -> Self {
        Self {
            config,
            wallet_version: ton.wallet_version,
            wallet_id: ton.wallet_id,
            workchain: ton.workchain,
        }
    }

    pub fn wallet(&self, public_key: [u8; 32]) -> WalletV3 {
        WalletV3::new(self.wallet_version, self.wallet_id, self.workchain, public_key)
    }
}

impl DerivationStrategy for TonStrategy {
    fn chain(&self) -> Chain {
        self.config.chain
    }

    fn derivation_path(&self, index: u32) -> String {
        self.config.derivation_path(index)
    }

    fn derive_private_key(&self, seed: &Seed, index: u32) -> WalletResult<KeyPair> {
        let path = self.derivation_path(index);
        let (private_key, _) = slip10_derive(seed.as_bytes(), &parse_hardened_path(&path)?)?;
        let signing_key = Ed25519SigningKey::from_bytes(&private_key);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();

        Ok(KeyPair::new(
            Chain::Ton,
            index,
            path,
            Zeroizing::new(private_key.to_vec()),
            public_key,
        ))
    }

    fn address_from_public_key(&self, public_key: &[u8]) -> WalletResult<String> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| WalletError::derivation(Chain::Ton, "ed25519 public key must be 32 bytes"))?;
        let address = self
            .wallet(public_key)
            .address()
            .map_err(|e| WalletError::derivation(Chain::Ton, e))?;
        Ok(address.to_user_friendly(true, self.config.is_testnet))
    }

    fn validate_address(&self, address: &str) -> bool {
        TonAddress::parse(address).is_ok()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 策略工厂
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 策略工厂
pub struct DerivationStrategyFactory;

impl DerivationStrategyFactory {
    /// 按链创建策略（网络参数来自运行配置）
    pub fn create_strategy(
        chain: Chain,
        chains: &ChainsConfig,
    ) -> WalletResult<Box<dyn DerivationStrategy>> {
        let registry = ChainRegistry::from_config(chains);
        Self::from_registry(chain, &registry, chains)
    }

    pub fn from_registry(
        chain: Chain,
        registry: &ChainRegistry,
        chains: &ChainsConfig,
    ) -> WalletResult<Box<dyn DerivationStrategy>> {
        let config = registry.get(chain)?.clone();
        Ok(match chain {
            Chain::Ethereum => Box::new(EvmStrategy::new(config)),
            Chain::Bitcoin => Box::new(BitcoinStrategy::new(config)),
            Chain::Dogecoin => Box::new(DogecoinStrategy::new(config)),
            Chain::Ton => Box::new(TonStrategy::new(config, &chains.ton)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mnemonic::MnemonicManager;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn seed() -> Seed {
        MnemonicManager::default().to_seed(MNEMONIC, None).unwrap()
    }

    fn mainnet() -> ChainsConfig {
        let mut chains = ChainsConfig::default();
        chains.ethereum.chain_id = 1;
        chains.bitcoin.testnet = false;
        chains.dogecoin.testnet = false;
        chains.ton.testnet = false;
        chains.ton.wallet_version = TonWalletVersion::V3R2;
        chains.ton.wallet_id = crate::domain::ton_wallet::DEFAULT_WALLET_ID;
        chains.ton.workchain = 0;
        chains
    }

    fn strategy(chain: Chain) -> Box<dyn DerivationStrategy> {
        DerivationStrategyFactory::create_strategy(chain, &mainnet()).unwrap()
    }

    #[test]
    fn test_ethereum_derivation() {
        let eth = strategy(Chain::Ethereum);
        let key = eth.derive_private_key(&seed(), 0).unwrap();
        assert_eq!(
            hex::encode(key.private_key()),
            "1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
        assert_eq!(key.derivation_path, "m/44'/60'/0'/0/0");

        let addresses = eth.derive_addresses(&seed(), 3).unwrap();
        assert_eq!(addresses[0].address, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
        assert_eq!(addresses[1].address, "0x6Fac4D18c912343BF86fa7049364Dd4E424Ab9C0");
        assert_eq!(addresses[2].address, "0xb6716976A3ebe8D39aCEB04372f22Ff8e6802D7A");
    }

    #[test]
    fn test_bitcoin_derivation() {
        let btc = strategy(Chain::Bitcoin);
        let key = btc.derive_private_key(&seed(), 0).unwrap();
        assert_eq!(
            hex::encode(key.private_key()),
            "4604b4b710fe91f584fff084e1a9159fe4f8408fff380596a604948474ce4fa3"
        );
        assert_eq!(key.public_key.len(), 33);

        let addresses = btc.derive_addresses(&seed(), 2).unwrap();
        assert_eq!(addresses[0].address, "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu");
        assert_eq!(addresses[0].derivation_path, "m/84'/0'/0'/0/0");
        assert_eq!(addresses[1].address, "bc1qnjg0jd8228aq7egyzacy8cys3knf9xvrerkf9g");
    }

    #[test]
    fn test_dogecoin_derivation() {
        let doge = strategy(Chain::Dogecoin);
        let record = doge.derive_address(&seed(), 0).unwrap();
        assert_eq!(record.address, "DBus3bamQjgJULBJtYXpEzDWQRwF5iwxgC");
        assert_eq!(record.derivation_path, "m/44'/3'/0'/0/0");
        assert!(doge.validate_address(&record.address));
    }

    #[test]
    fn test_slip10_vector() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let (key, chain_code) = slip10_derive(&seed, &[]).unwrap();
        assert_eq!(
            hex::encode(*key),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(chain_code),
            "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb"
        );

        let (child, _) = slip10_derive(&seed, &[0]).unwrap();
        assert_eq!(
            hex::encode(*child),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn test_ton_derivation() {
        let ton = strategy(Chain::Ton);
        let key = ton.derive_private_key(&seed(), 0).unwrap();
        assert_eq!(key.derivation_path, "m/44'/607'/0'");
        assert_eq!(
            hex::encode(key.private_key()),
            "b477ef5ed17fb8a2b8faddd7a9835a227243a82c70b190c7af4896155aa7df9f"
        );
        assert_eq!(
            key.public_key_hex(),
            "7952e94118f34607c75e23258dd9220d66ccac5a3ee074125c25068e8107bfbf"
        );

        let addresses = ton.derive_addresses(&seed(), 2).unwrap();
        assert_eq!(addresses[0].address, "EQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina5Lf");
        assert_eq!(addresses[1].address, "EQBwCHMxXsb6n-AJC5HBhxaXqdcI7qD2I8mQSkYTHqD2dR1F");
    }

    #[test]
    fn test_ton_wallet_version_changes_address() {
        let mut chains = mainnet();
        chains.ton.wallet_version = TonWalletVersion::V3R1;
        let ton = DerivationStrategyFactory::create_strategy(Chain::Ton, &chains).unwrap();
        let record = ton.derive_address(&seed(), 0).unwrap();
        assert_eq!(record.address, "EQC74t6MvrpcbkQyzf5Lmmhy6MjwJT8fr0WvBTxAy-589_Px");
    }

    #[test]
    fn test_derivation_is_deterministic_and_unique() {
        for chain in Chain::ALL {
            let s = strategy(chain);
            let first = s.derive_addresses(&seed(), 10).unwrap();
            let second = s.derive_addresses(&seed(), 10).unwrap();
            assert_eq!(first, second);

            let unique: std::collections::HashSet<_> =
                first.iter().map(|r| r.address.clone()).collect();
            assert_eq!(unique.len(), 10, "{} produced duplicate addresses", chain);
            assert!(first.iter().enumerate().all(|(i, r)| r.index == i as u32));
            assert!(first.iter().all(|r| s.validate_address(&r.address)));
        }
    }

    #[test]
    fn test_address_validation() {
        let eth = strategy(Chain::Ethereum);
        assert!(eth.validate_address("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"));
        assert!(eth.validate_address("0x9858effd232b4033e47d90003d41ec34ecaeda94"));
        // 校验和错误
        assert!(!eth.validate_address("0x9858efFD232B4033E47d90003D41EC34EcaEda94"));
        assert!(!eth.validate_address("9858EfFD232B4033E47d90003D41EC34EcaEda94"));
        assert!(!eth.validate_address("0x1234"));

        let btc = strategy(Chain::Bitcoin);
        assert!(btc.validate_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"));
        assert!(!btc.validate_address("tb1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"));
        assert!(!btc.validate_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyv"));

        let doge = strategy(Chain::Dogecoin);
        assert!(!doge.validate_address("DBus3bamQjgJULBJtYXpEzDWQRwF5iwxgD"));
        assert!(!doge.validate_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"));

        let ton = strategy(Chain::Ton);
        assert!(ton.validate_address("UQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina88a"));
        assert!(ton.validate_address(
            "0:bd2c92faf468cf1cc4f267ff7f3f640a4c69d084c5acd9e464e8c5438838a76b"
        ));
        assert!(!ton.validate_address("EQC9LJL69GjPHMTyZ_9_P2QKTGnQhMWs2eRk6MVDiDina5Lg"));
    }

    #[test]
    fn test_bitcoin_testnet_network() {
        let mut chains = mainnet();
        chains.bitcoin.testnet = true;
        let btc = DerivationStrategyFactory::create_strategy(Chain::Bitcoin, &chains).unwrap();
        let record = btc.derive_address(&seed(), 0).unwrap();
        assert!(record.address.starts_with("tb1q"));
        assert_eq!(record.derivation_path, "m/84'/1'/0'/0/0");
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(parse_hardened_path("m/44'/607'/3'").unwrap(), vec![44, 607, 3]);
        assert!(parse_hardened_path("m/44'/607'/0").is_err());
        assert!(parse_hardened_path("44'/607'").is_err());
    }
}
