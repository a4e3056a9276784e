//! 钱包输入文件加载
//!
//! 纯文本，每行一个助记词或私钥；空行忽略，无法解析的行记录脱敏告警后丢弃。

use std::path::Path;

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::{
    domain::{Credential, CredentialResolver},
    infrastructure::log_redact::{redact_address, redact_secret},
};

/// 加载结果
#[derive(Debug, Default)]
pub struct LoadedWallets {
    pub credentials: Vec<Credential>,
    /// 被丢弃的非空行数
    pub rejected: usize,
}

/// 逐行解析
pub fn parse_wallet_lines(content: &str) -> LoadedWallets {
    let mut loaded = LoadedWallets::default();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match CredentialResolver::resolve(line) {
            Ok(credential) => {
                tracing::debug!(
                    line = idx + 1,
                    wallet = %redact_address(&credential.checksum_address()),
                    format = ?credential.format(),
                    "Wallet loaded"
                );
                loaded.credentials.push(credential);
            }
            Err(e) => {
                tracing::warn!(
                    line = idx + 1,
                    secret = %redact_secret(line),
                    code = e.code(),
                    "Skipping unrecognized wallet line"
                );
                loaded.rejected += 1;
            }
        }
    }

    loaded
}

/// 读取钱包文件；文件内容在使用后清零
pub fn load_wallet_file<P: AsRef<Path>>(path: P) -> Result<LoadedWallets> {
    let content = Zeroizing::new(
        std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read wallet file: {:?}", path.as_ref()))?,
    );
    Ok(parse_wallet_lines(&content))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_blank_and_malformed_lines() {
        let content = format!(
            "\n{}\n   \nnot a wallet\n0x0000000000000000000000000000000000000000000000000000000000000001\n",
            TEST_MNEMONIC
        );
        let loaded = parse_wallet_lines(&content);
        assert_eq!(loaded.credentials.len(), 2);
        assert_eq!(loaded.rejected, 1);
        assert_eq!(
            loaded.credentials[0].checksum_address(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        assert_eq!(
            loaded.credentials[1].checksum_address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_load_wallet_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  {}  ", TEST_MNEMONIC).unwrap();
        writeln!(file).unwrap();

        let loaded = load_wallet_file(file.path()).unwrap();
        assert_eq!(loaded.credentials.len(), 1);
        assert_eq!(loaded.rejected, 0);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_wallet_file("/definitely/not/here/wallet_data.txt").is_err());
    }
}
