//! AES-256-GCM 加密/解密模块
//! 用于助记词静态加密存储

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// GCM nonce 长度
pub const NONCE_LENGTH: usize = 12;
/// GCM 认证标签长度
pub const TAG_LENGTH: usize = 16;

/// 加密密钥（使用Zeroize保护）
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; 32],
}

impl EncryptionKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// 加密数据
///
/// # Returns
/// 返回 nonce (12字节) + ciphertext + tag
pub fn encrypt_data(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|e| anyhow!("Invalid key: {}", e))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// 解密数据（nonce + ciphertext + tag）
///
/// 认证失败（密钥错误或数据被篡改）返回错误，不会返回错误明文
pub fn decrypt_data(encrypted: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if encrypted.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(anyhow!("Encrypted data too short"));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|e| anyhow!("Invalid key: {}", e))?;

    let nonce = Nonce::from_slice(&encrypted[..NONCE_LENGTH]);
    let ciphertext = &encrypted[NONCE_LENGTH..];

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = EncryptionKey::new(*b"01234567890123456789012345678901");
        let data = b"Hello, World!";

        let encrypted = encrypt_data(data, &key).unwrap();
        assert_eq!(encrypted.len(), NONCE_LENGTH + data.len() + TAG_LENGTH);

        let decrypted = decrypt_data(&encrypted, &key).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_nonce_is_random() {
        let key = EncryptionKey::new([7u8; 32]);
        let a = encrypt_data(b"same", &key).unwrap();
        let b = encrypt_data(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_and_tamper_rejected() {
        let key = EncryptionKey::new([1u8; 32]);
        let other = EncryptionKey::new([2u8; 32]);
        let mut encrypted = encrypt_data(b"secret", &key).unwrap();

        assert!(decrypt_data(&encrypted, &other).is_err());

        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(decrypt_data(&encrypted, &key).is_err());

        assert!(decrypt_data(&[0u8; 5], &key).is_err());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = EncryptionKey::new([9u8; 32]);
        assert_eq!(format!("{:?}", key), "EncryptionKey(<redacted>)");
    }
}
