//! 助记词 / 种子管理
//!
//! - 生成与校验 BIP39 助记词（英文词表）
//! - 助记词 → 种子（PBKDF2-HMAC-SHA512, 2048 次, salt = "mnemonic" + passphrase）
//! - 助记词静态加密：PBKDF2-HMAC-SHA256 派生密钥 + AES-256-GCM
//!
//! 加密格式：
//! ```text
//! [version 0x01][iterations u32 BE][salt 16][nonce 12][ciphertext + tag 16]
//! ```

use base64::Engine;
use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{
    config::SecurityConfig,
    domain::key_material::{SecretMnemonic, Seed},
    error::{WalletError, WalletResult},
    infrastructure::{
        encryption::{self, NONCE_LENGTH, TAG_LENGTH},
        pbkdf2::{self, SALT_LENGTH},
    },
};

const BLOB_VERSION: u8 = 0x01;
const HEADER_LENGTH: usize = 1 + 4 + SALT_LENGTH;
// 解密时接受的迭代次数范围，超出视为损坏数据
const MIN_BLOB_ITERATIONS: u32 = 1_000;
const MAX_BLOB_ITERATIONS: u32 = 10_000_000;

/// 支持的熵长度（比特）
pub const SUPPORTED_STRENGTHS: [usize; 5] = [128, 160, 192, 224, 256];

/// 助记词管理器
#[derive(Debug, Clone)]
pub struct MnemonicManager {
    pbkdf2_iterations: u32,
}

impl MnemonicManager {
    pub fn new(security: &SecurityConfig) -> Self {
        Self::with_iterations(security.pbkdf2_iterations)
    }

    pub fn with_iterations(pbkdf2_iterations: u32) -> Self {
        Self { pbkdf2_iterations }
    }

    /// 生成助记词
    ///
    /// # Arguments
    /// * `strength_bits` - 熵长度（128 → 12 词, 256 → 24 词）
    pub fn generate(&self, strength_bits: usize) -> WalletResult<SecretMnemonic> {
        if !SUPPORTED_STRENGTHS.contains(&strength_bits) {
            return Err(WalletError::InvalidRequest(format!(
                "mnemonic strength must be one of {:?} bits, got {}",
                SUPPORTED_STRENGTHS, strength_bits
            )));
        }

        let mut entropy = Zeroizing::new(vec![0u8; strength_bits / 8]);
        rand::thread_rng()
            .try_fill_bytes(&mut entropy)
            .map_err(|e| WalletError::Entropy(e.to_string()))?;

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::Entropy(e.to_string()))?;

        tracing::debug!(words = mnemonic.word_count(), "Generated mnemonic");

        Ok(SecretMnemonic::new(mnemonic.to_string()))
    }

    /// 校验词表与校验和，不抛错
    pub fn validate(&self, phrase: &str) -> bool {
        parse_mnemonic(phrase).is_ok()
    }

    /// 助记词 → 64 字节种子
    pub fn to_seed(&self, phrase: &str, passphrase: Option<&str>) -> WalletResult<Seed> {
        let mnemonic = parse_mnemonic(phrase)?;
        let seed = Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or("")));
        Seed::from_bytes(&seed[..])
    }

    /// 加密助记词用于持久化
    pub fn encrypt_at_rest(&self, phrase: &str, password: &str) -> WalletResult<Vec<u8>> {
        let mnemonic = parse_mnemonic(phrase)?;
        let normalized = Zeroizing::new(mnemonic.to_string());

        let (key, salt) = pbkdf2::derive_key_from_password(password, None, self.pbkdf2_iterations)
            .map_err(|e| WalletError::InvalidRequest(e.to_string()))?;

        let sealed = encryption::encrypt_data(normalized.as_bytes(), &key)
            .map_err(|e| WalletError::Entropy(e.to_string()))?;

        let mut blob = Vec::with_capacity(HEADER_LENGTH + sealed.len());
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&self.pbkdf2_iterations.to_be_bytes());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&sealed);

        Ok(blob)
    }

    /// 解密助记词
    ///
    /// 认证失败 → `WrongPassword`；格式/内容异常 → `CorruptCiphertext`
    pub fn decrypt_at_rest(&self, blob: &[u8], password: &str) -> WalletResult<SecretMnemonic> {
        if blob.len() < HEADER_LENGTH + NONCE_LENGTH + TAG_LENGTH {
            return Err(WalletError::CorruptCiphertext(format!(
                "blob too short: {} bytes",
                blob.len()
            )));
        }
        if blob[0] != BLOB_VERSION {
            return Err(WalletError::CorruptCiphertext(format!(
                "unknown blob version: {:#04x}",
                blob[0]
            )));
        }

        let iterations = u32::from_be_bytes([blob[1], blob[2], blob[3], blob[4]]);
        if !(MIN_BLOB_ITERATIONS..=MAX_BLOB_ITERATIONS).contains(&iterations) {
            return Err(WalletError::CorruptCiphertext(format!(
                "implausible iteration count: {}",
                iterations
            )));
        }

        let salt = &blob[5..HEADER_LENGTH];
        let key = pbkdf2::derive_key_with_salt(password, salt, iterations)
            .map_err(|e| WalletError::CorruptCiphertext(e.to_string()))?;

        let plaintext = Zeroizing::new(
            encryption::decrypt_data(&blob[HEADER_LENGTH..], &key)
                .map_err(|_| WalletError::WrongPassword)?,
        );

        let phrase = std::str::from_utf8(&plaintext)
            .map_err(|_| WalletError::CorruptCiphertext("plaintext is not UTF-8".to_string()))?;

        let mnemonic = parse_mnemonic(phrase)
            .map_err(|_| WalletError::CorruptCiphertext("plaintext is not a mnemonic".to_string()))?;

        Ok(SecretMnemonic::new(mnemonic.to_string()))
    }

    /// 文本存储版本（标准 base64）
    pub fn encrypt_at_rest_base64(&self, phrase: &str, password: &str) -> WalletResult<String> {
        let blob = self.encrypt_at_rest(phrase, password)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    pub fn decrypt_at_rest_base64(&self, encoded: &str, password: &str) -> WalletResult<SecretMnemonic> {
        let blob = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| WalletError::CorruptCiphertext(format!("invalid base64: {}", e)))?;
        self.decrypt_at_rest(&blob, password)
    }
}

impl Default for MnemonicManager {
    fn default() -> Self {
        Self::with_iterations(pbkdf2::DEFAULT_ITERATIONS)
    }
}

/// 解析助记词（空白归一、转小写）
fn parse_mnemonic(phrase: &str) -> WalletResult<Mnemonic> {
    let normalized = Zeroizing::new(
        phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" "),
    );

    if normalized.is_empty() {
        return Err(WalletError::InvalidMnemonic("empty mnemonic".to_string()));
    }

    Mnemonic::parse_in(Language::English, normalized.as_str())
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}
