//! RPC 响应校验
//! JSON-RPC quantity / hash 字段的解析与范围检查

use anyhow::{Context, Result};

/// 验证 JSON-RPC 2.0 响应结构（必须有 result 或 error）
pub fn validate_rpc_response(json: &serde_json::Value) -> Result<()> {
    if !json.is_object() {
        anyhow::bail!("RPC response is not a JSON object");
    }
    if json.get("result").is_none() && json.get("error").is_none() {
        anyhow::bail!("RPC response has neither result nor error");
    }
    Ok(())
}

/// 解析 u64 quantity（nonce、区块号、gas）
pub fn parse_quantity_u64(hex_str: &str) -> Result<u64> {
    let digits = hex_str.trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 16 {
        anyhow::bail!("Invalid u64 quantity: {:?}", hex_str);
    }
    u64::from_str_radix(digits, 16).context("Failed to parse u64 quantity")
}

/// 解析 u128 quantity（余额、gas price）
pub fn parse_quantity_u128(hex_str: &str) -> Result<u128> {
    let digits = hex_str.trim_start_matches("0x");
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        anyhow::bail!("Quantity exceeds 128 bits: {}", hex_str);
    }
    u128::from_str_radix(digits, 16).context("Failed to parse u128 quantity")
}

/// 解析 256 位 quantity 为十进制字符串（ERC-20 余额可能超过 u128）
pub fn parse_quantity_decimal(hex_str: &str) -> Result<String> {
    let digits = hex_str.trim_start_matches("0x");
    if digits.len() > 64 {
        anyhow::bail!("Quantity exceeds 256 bits: {}", hex_str);
    }
    if digits.is_empty() {
        return Ok("0".to_string());
    }
    let value = ethers::types::U256::from_str_radix(digits, 16)
        .map_err(|e| anyhow::anyhow!("Failed to parse quantity: {}", e))?;
    Ok(value.to_string())
}

/// 验证 32 字节交易哈希，返回 0x 前缀小写形式
pub fn validate_tx_hash(tx_hash: &str) -> Result<String> {
    let hash = tx_hash.trim_start_matches("0x");

    if hash.len() != 64 {
        anyhow::bail!(
            "Invalid transaction hash length: expected 64, got {}",
            hash.len()
        );
    }

    if !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid transaction hash format: contains non-hex characters");
    }

    Ok(format!("0x{}", hash.to_lowercase()))
}
