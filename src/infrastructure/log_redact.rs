//! 日志脱敏
//! 私钥、助记词永远不进入日志；地址与交易数据按需截断

/// 脱敏十六进制字符串（显示前缀和后缀）
pub fn redact_hex_string(hex: &str, show_chars: usize) -> String {
    if hex.len() <= show_chars * 2 {
        return "*".repeat(hex.len());
    }

    let prefix = &hex[..show_chars];
    let suffix = &hex[hex.len() - show_chars..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    if address.len() < 10 {
        return "*".repeat(address.len());
    }

    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏钱包秘密（助记词或私钥），只保留形状信息
pub fn redact_secret(secret: &str) -> String {
    let words = secret.split_whitespace().count();
    if words > 1 {
        format!("[redacted: {} words]", words)
    } else {
        format!("[redacted: {} chars]", secret.trim().chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hex_string() {
        let hex = "0x1234567890abcdef1234567890abcdef12345678";
        let redacted = redact_hex_string(hex, 10);
        assert_eq!(redacted, "0x12345678...ef12345678");
    }

    #[test]
    fn test_redact_address() {
        let address = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bFd2";
        let redacted = redact_address(address);
        assert_eq!(redacted, "0x742d...bFd2");
    }

    #[test]
    fn test_redact_secret_hides_content() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        let redacted = redact_secret(phrase);
        assert_eq!(redacted, "[redacted: 12 words]");
        assert!(!redacted.contains("abandon"));

        let key = "0x0000000000000000000000000000000000000000000000000000000000000001";
        assert_eq!(redact_secret(key), "[redacted: 66 chars]");
    }
}
