//! PBKDF2 密钥派生模块
//! 用于从用户密码派生助记词静态加密密钥

use anyhow::{anyhow, Result};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::infrastructure::encryption::EncryptionKey;

/// 默认迭代次数
pub const DEFAULT_ITERATIONS: u32 = 100_000;
/// 盐值长度
pub const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32; // AES-256

/// 从密码派生加密密钥
///
/// # Arguments
/// * `password` - 用户密码
/// * `salt` - 盐值（为 None 时生成随机盐值）
/// * `iterations` - 迭代次数
///
/// # Returns
/// 返回 (密钥, 盐值) 元组
pub fn derive_key_from_password(
    password: &str,
    salt: Option<&[u8]>,
    iterations: u32,
) -> Result<(EncryptionKey, [u8; SALT_LENGTH])> {
    let salt_bytes = match salt {
        Some(s) => {
            <[u8; SALT_LENGTH]>::try_from(s).map_err(|_| anyhow!("Salt must be {} bytes", SALT_LENGTH))?
        }
        None => {
            let mut salt = [0u8; SALT_LENGTH];
            rand::thread_rng()
                .try_fill_bytes(&mut salt)
                .map_err(|e| anyhow!("Failed to generate salt: {}", e))?;
            salt
        }
    };

    let key = derive_key_with_salt(password, &salt_bytes, iterations)?;
    Ok((key, salt_bytes))
}

/// 从密码和盐值派生密钥（用于解密）
pub fn derive_key_with_salt(password: &str, salt: &[u8], iterations: u32) -> Result<EncryptionKey> {
    if salt.len() != SALT_LENGTH {
        return Err(anyhow!("Salt must be {} bytes", SALT_LENGTH));
    }
    if iterations == 0 {
        return Err(anyhow!("PBKDF2 iterations must be positive"));
    }

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);

    Ok(EncryptionKey::new(key))
}
