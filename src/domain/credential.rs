//! 钱包凭证解析
//!
//! 把异构的钱包秘密（原始私钥或 BIP39 助记词）统一成签名密钥 + 地址。
//! 格式判断是显式的：先按形状分类为 [`SecretFormat`]，再走对应的派生路径，
//! 不依赖"先试私钥、失败再试助记词"的异常回退。

use std::fmt;

use bip39::{Language, Mnemonic};
use coins_bip32::path::DerivationPath;
use ethers::{types::Address, utils::to_checksum};
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::error::CredentialError;

/// BIP44 以太坊路径：purpose=44, coin=60, account=0, change=0, index=0
pub const ETHEREUM_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// 助记词最少单词数
pub const MIN_MNEMONIC_WORDS: usize = 12;

/// 钱包秘密的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretFormat {
    /// 32 字节十六进制私钥（可带 0x 前缀）
    RawKey,
    /// 不少于 12 个单词的助记词
    SeedPhrase,
    Unrecognized,
}

impl SecretFormat {
    /// 仅按形状判断，不做任何派生
    pub fn detect(raw: &str) -> Self {
        let trimmed = raw.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::RawKey;
        }
        if trimmed.split_whitespace().count() >= MIN_MNEMONIC_WORDS {
            return Self::SeedPhrase;
        }
        Self::Unrecognized
    }
}

/// 已解析的钱包凭证
///
/// 创建后不可变，由单条注册流水线独占。
#[derive(Clone)]
pub struct Credential {
    address: Address,
    signing_key: SigningKey,
    format: SecretFormat,
}

impl Credential {
    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 校验和格式地址
    pub fn checksum_address(&self) -> String {
        to_checksum(&self.address, None)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn format(&self) -> SecretFormat {
        self.format
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("address", &self.checksum_address())
            .field("format", &self.format)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// 凭证解析器：确定性、无副作用
pub struct CredentialResolver;

impl CredentialResolver {
    pub fn resolve(raw: &str) -> Result<Credential, CredentialError> {
        match SecretFormat::detect(raw) {
            SecretFormat::RawKey => Self::from_private_key(raw.trim()),
            SecretFormat::SeedPhrase => Self::from_mnemonic(raw.trim()),
            SecretFormat::Unrecognized => Err(CredentialError::Unrecognized),
        }
    }

    fn from_private_key(raw: &str) -> Result<Credential, CredentialError> {
        let hex_part = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        let bytes =
            hex::decode(hex_part).map_err(|e| CredentialError::InvalidPrivateKey(e.to_string()))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| CredentialError::InvalidPrivateKey("scalar out of range".into()))?;

        Ok(Credential {
            address: address_of(&signing_key),
            signing_key,
            format: SecretFormat::RawKey,
        })
    }

    fn from_mnemonic(phrase: &str) -> Result<Credential, CredentialError> {
        use coins_bip32::prelude::*;

        let normalized = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
        let mnemonic = Mnemonic::parse_in(Language::English, normalized.as_str())
            .map_err(|e| CredentialError::InvalidMnemonic(e.to_string()))?;
        let seed = mnemonic.to_seed("");

        let derivation_path = ETHEREUM_DERIVATION_PATH
            .parse::<DerivationPath>()
            .map_err(|e| CredentialError::Derivation(e.to_string()))?;

        let master_key = XPriv::root_from_seed(&seed, None)
            .map_err(|e| CredentialError::Derivation(e.to_string()))?;
        let derived_key = master_key
            .derive_path(&derivation_path)
            .map_err(|e| CredentialError::Derivation(e.to_string()))?;

        // XPriv 实现 AsRef<SigningKey>
        let signing_key: &SigningKey = derived_key.as_ref();

        Ok(Credential {
            address: address_of(signing_key),
            signing_key: signing_key.clone(),
            format: SecretFormat::SeedPhrase,
        })
    }
}

/// keccak256(未压缩公钥去掉 0x04 前缀) 的后 20 字节
fn address_of(signing_key: &SigningKey) -> Address {
    let public_key = signing_key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&public_key.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_detect_formats() {
        assert_eq!(
            SecretFormat::detect(
                "0x0000000000000000000000000000000000000000000000000000000000000001"
            ),
            SecretFormat::RawKey
        );
        assert_eq!(
            SecretFormat::detect(
                "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
            ),
            SecretFormat::RawKey
        );
        assert_eq!(SecretFormat::detect(TEST_MNEMONIC), SecretFormat::SeedPhrase);
        assert_eq!(SecretFormat::detect("too short"), SecretFormat::Unrecognized);
        assert_eq!(SecretFormat::detect("0x1234"), SecretFormat::Unrecognized);
    }

    #[test]
    fn test_private_key_address() {
        let credential = CredentialResolver::resolve(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(
            credential.checksum_address(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
        assert_eq!(credential.format(), SecretFormat::RawKey);
    }

    #[test]
    fn test_mnemonic_bip39_vector() {
        let credential = CredentialResolver::resolve(TEST_MNEMONIC).unwrap();
        assert_eq!(
            credential.checksum_address(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        assert_eq!(credential.format(), SecretFormat::SeedPhrase);
    }

    #[test]
    fn test_zero_key_rejected() {
        let err = CredentialResolver::resolve(
            "0x0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap_err();
        assert!(matches!(err, CredentialError::InvalidPrivateKey(_)));
    }

    #[test]
    fn test_bad_checksum_mnemonic_rejected() {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
        let err = CredentialResolver::resolve(phrase).unwrap_err();
        assert!(matches!(err, CredentialError::InvalidMnemonic(_)));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let credential = CredentialResolver::resolve(TEST_MNEMONIC).unwrap();
        let rendered = format!("{:?}", credential);
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"));
    }
}
