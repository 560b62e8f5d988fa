//! 密钥材料与派生结果
//!
//! 助记词、种子、私钥只存在于自动清零的缓冲区中，`Debug` 输出一律脱敏

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    domain::{chain_config::Chain, derivation::DerivationStrategy},
    error::{WalletError, WalletResult},
};

/// 清零缓冲区
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// BIP39 助记词（drop 时清零）
pub struct SecretMnemonic {
    phrase: Zeroizing<String>,
}

impl SecretMnemonic {
    /// 包装调用方提供的助记词（不做校验，派生时才校验）
    pub fn new(phrase: String) -> Self {
        Self {
            phrase: Zeroizing::new(phrase),
        }
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn word_count(&self) -> usize {
        self.phrase.split_whitespace().count()
    }
}

impl fmt::Debug for SecretMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretMnemonic({} words, <redacted>)", self.word_count())
    }
}

/// HD 种子（BIP32 允许 16..=64 字节）
pub struct Seed {
    bytes: SecretBytes,
}

impl Seed {
    pub fn from_bytes(bytes: &[u8]) -> WalletResult<Self> {
        if !(16..=64).contains(&bytes.len()) {
            return Err(WalletError::InvalidRequest(format!(
                "seed must be 16..=64 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({} bytes, <redacted>)", self.bytes.len())
    }
}

/// 单个地址的签名密钥对
pub struct KeyPair {
    pub chain: Chain,
    pub index: u32,
    pub derivation_path: String,
    /// secp256k1: 33 字节压缩公钥；ed25519: 32 字节公钥
    pub public_key: Vec<u8>,
    private_key: SecretBytes,
}

impl KeyPair {
    pub(crate) fn new(
        chain: Chain,
        index: u32,
        derivation_path: String,
        private_key: SecretBytes,
        public_key: Vec<u8>,
    ) -> Self {
        Self {
            chain,
            index,
            derivation_path,
            public_key,
            private_key,
        }
    }

    /// 导入调用方已持有的私钥
    ///
    /// 链由策略决定。私钥必须是该链曲线上的合法 32 字节标量，
    /// 公钥由私钥重新计算，并且必须能经策略生成地址。
    /// 导入的密钥没有派生路径，`derivation_path` 为空
    pub fn from_private_key(
        strategy: &dyn DerivationStrategy,
        private_key: SecretBytes,
    ) -> WalletResult<Self> {
        let chain = strategy.chain();
        if private_key.len() != 32 {
            return Err(WalletError::InvalidRequest(format!(
                "{} private key must be 32 bytes, got {}",
                chain,
                private_key.len()
            )));
        }

        let public_key = match chain {
            Chain::Ton => {
                let mut bytes = Zeroizing::new([0u8; 32]);
                bytes.copy_from_slice(&private_key);
                ed25519_dalek::SigningKey::from_bytes(&bytes)
                    .verifying_key()
                    .to_bytes()
                    .to_vec()
            }
            Chain::Ethereum | Chain::Bitcoin | Chain::Dogecoin => {
                let signing_key = k256::ecdsa::SigningKey::from_slice(&private_key).map_err(|_| {
                    WalletError::InvalidRequest(format!(
                        "{} private key is not a valid secp256k1 scalar",
                        chain
                    ))
                })?;
                signing_key
                    .verifying_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec()
            }
        };

        strategy.address_from_public_key(&public_key)?;
        Ok(Self::new(chain, 0, String::new(), private_key, public_key))
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("chain", &self.chain)
            .field("index", &self.index)
            .field("derivation_path", &self.derivation_path)
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// 派生出的收款地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub chain: Chain,
    pub address: String,
    pub derivation_path: String,
    pub index: u32,
}
