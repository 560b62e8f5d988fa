//! 日志脱敏
//! 地址、原始交易等只以截断形式进入日志；私钥与助记词从不记录

/// 脱敏十六进制字符串（显示前缀和后缀）
pub fn redact_hex_string(hex: &str, show_chars: usize) -> String {
    if !hex.is_ascii() || hex.len() <= show_chars * 2 {
        return "*".repeat(hex.chars().count());
    }

    let prefix = &hex[..show_chars];
    let suffix = &hex[hex.len() - show_chars..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    if !address.is_ascii() || address.len() < 10 {
        return "*".repeat(address.chars().count());
    }

    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{}...{}", prefix, suffix)
}

/// 原始交易只保留前后 10 个字符
pub fn redact_raw_transaction(raw_hex: &str) -> String {
    redact_hex_string(raw_hex, 10)
}
