//! 错误类型定义
//!
//! 凭证解析错误在加载阶段处理（跳过该钱包），
//! 注册流水线内的所有错误在流水线边界被转换为 `RegistrationOutcome`，不会向批处理层传播。

use ethers::providers::{ProviderError, RpcError};
use thiserror::Error;

use crate::domain::basename::{selector, ERR_NAME_NOT_AVAILABLE};

/// 凭证解析错误
#[derive(Debug, Error)]
pub enum CredentialError {
    /// 既不是私钥也不是助记词
    #[error("unrecognized wallet secret format")]
    Unrecognized,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),
}

impl CredentialError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unrecognized => "credential_unrecognized",
            Self::InvalidPrivateKey(_) => "invalid_private_key",
            Self::InvalidMnemonic(_) => "invalid_mnemonic",
            Self::Derivation(_) => "derivation_failed",
        }
    }
}

/// 远端调用错误（链上 RPC 或域名查询 API）
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rpc error: {0}")]
    Provider(#[from] ProviderError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    /// 远端明确拒绝（revert、非 2xx 等）
    #[error("rejected by remote: {0}")]
    Rejected(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl GatewayError {
    /// 远端报错是否表示名称已被占用
    ///
    /// 节点返回的 revert 只带 ABI 编码的错误数据（`NameNotAvailable(string)` 选择器），
    /// 文本匹配只对已解码的消息有效。
    pub fn indicates_name_taken(&self) -> bool {
        if self
            .revert_data()
            .is_some_and(|data| data.starts_with(&selector(ERR_NAME_NOT_AVAILABLE)))
        {
            return true;
        }
        let msg = self.to_string().to_lowercase();
        msg.contains("namenotavailable") || msg.contains("name not available")
    }

    /// JSON-RPC 错误响应中的 revert 数据
    pub fn revert_data(&self) -> Option<Vec<u8>> {
        let Self::Provider(err) = self else {
            return None;
        };
        let data = err.as_error_response()?.data.as_ref()?;
        // 部分节点把数据再包一层 {"data": "0x..."}
        let raw = data
            .as_str()
            .or_else(|| data.get("data").and_then(|inner| inner.as_str()))?;
        hex::decode(raw.trim_start_matches("0x")).ok()
    }
}

/// 单个钱包注册流水线错误
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("domain lookup failed: {0}")]
    Lookup(#[source] GatewayError),

    #[error("availability check failed: {0}")]
    AvailabilityCheck(#[source] GatewayError),

    #[error("quote failed: {0}")]
    Quote(#[source] GatewayError),

    #[error("gas estimation failed: {0}")]
    Estimation(#[source] GatewayError),

    #[error("fee query failed: {0}")]
    FeeQuery(#[source] GatewayError),

    #[error("nonce query failed: {0}")]
    NonceQuery(#[source] GatewayError),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("submission failed: {0}")]
    Submission(#[source] GatewayError),

    /// 名称在可用性检查之后被他人注册
    #[error("name {0} was taken before the transaction landed")]
    AlreadyTaken(String),

    #[error("no available name found after {attempts} attempts")]
    SearchExhausted { attempts: u32 },

    #[error("registration cancelled")]
    Cancelled,
}

impl RegistrationError {
    /// 稳定的错误码，用于日志与汇总
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "lookup_failed",
            Self::AvailabilityCheck(_) => "availability_check_failed",
            Self::Quote(_) => "quote_failed",
            Self::Estimation(_) => "gas_estimation_failed",
            Self::FeeQuery(_) => "fee_query_failed",
            Self::NonceQuery(_) => "nonce_query_failed",
            Self::Signing(_) => "signing_failed",
            Self::Submission(_) => "submission_failed",
            Self::AlreadyTaken(_) => "already_taken",
            Self::SearchExhausted { .. } => "search_exhausted",
            Self::Cancelled => "cancelled",
        }
    }

    /// 下次运行重试是否有意义；主动取消不算
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Signing(_) | Self::Cancelled)
    }
}
