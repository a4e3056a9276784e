//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RPC_URL: &str = "https://base.llamarpc.com";
pub const DEFAULT_CHAIN_ID: u64 = 8453;
pub const DEFAULT_NETWORK: &str = "base-mainnet";
pub const DEFAULT_LOOKUP_URL: &str = "https://www.base.org/api/basenames/getUsernames";

pub const REGISTRAR_CONTROLLER_ADDRESS: &str = "0x4cCb0BB02FCABA27e82a56646E81d8c5bC4119a5";
pub const L2_RESOLVER_ADDRESS: &str = "0xC6d566A56A1aFf6508b41f6c90ff131615583BCD";
/// ENSIP-11: 0x80000000 | chain_id
pub const BASE_COIN_TYPE: u64 = 0x8000_0000 | DEFAULT_CHAIN_ID;
pub const NAME_SUFFIX: &str = "base.eth";

pub const DEFAULT_MAX_DOMAINS_PER_WALLET: u64 = 4;
pub const DEFAULT_MAX_CONCURRENT: usize = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_GAS_MULTIPLIER_MIN: f64 = 1.15;
pub const DEFAULT_GAS_MULTIPLIER_MAX: f64 = 1.30;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub wallets: WalletsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 链RPC配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// 域名查询 API 使用的网络名
    pub network: String,
    pub request_timeout_secs: u64,
}

/// 合约地址配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub registrar_controller: Address,
    pub l2_resolver: Address,
    pub coin_type: u64,
    pub name_suffix: String,
}

/// 已持有域名查询 API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// 注册流程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// 钱包已持有域名数达到该值即跳过
    pub max_domains_per_wallet: u64,
    /// 同时运行的流水线上限
    pub max_concurrent: usize,
    /// 名称不可用时的重试间隔
    pub retry_delay_ms: u64,
    /// None 表示无限重试
    pub max_search_attempts: Option<u32>,
    pub search_timeout_secs: Option<u64>,
    pub gas_multiplier_min: f64,
    pub gas_multiplier_max: f64,
    /// 构建交易后、签名前再检查一次可用性
    pub recheck_before_submit: bool,
}

/// 钱包输入文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletsConfig {
    pub file: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn addr(s: &str) -> Address {
    s.parse::<Address>().expect("valid address literal")
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("BASE_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.into()),
            chain_id: env_parse("BASE_CHAIN_ID").unwrap_or(DEFAULT_CHAIN_ID),
            network: std::env::var("BASE_NETWORK").unwrap_or_else(|_| DEFAULT_NETWORK.into()),
            request_timeout_secs: env_parse("RPC_TIMEOUT_SECS").unwrap_or(30),
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            registrar_controller: addr(REGISTRAR_CONTROLLER_ADDRESS),
            l2_resolver: addr(L2_RESOLVER_ADDRESS),
            coin_type: BASE_COIN_TYPE,
            name_suffix: NAME_SUFFIX.into(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("BASENAME_LOOKUP_URL").unwrap_or_else(|_| DEFAULT_LOOKUP_URL.into()),
            timeout_secs: env_parse("BASENAME_LOOKUP_TIMEOUT_SECS").unwrap_or(30),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_domains_per_wallet: env_parse("MAX_REGISTER_DOMAIN")
                .unwrap_or(DEFAULT_MAX_DOMAINS_PER_WALLET),
            max_concurrent: env_parse("MAX_CONCURRENT").unwrap_or(DEFAULT_MAX_CONCURRENT),
            retry_delay_ms: env_parse("RETRY_DELAY_MS").unwrap_or(DEFAULT_RETRY_DELAY_MS),
            max_search_attempts: env_parse("MAX_SEARCH_ATTEMPTS"),
            search_timeout_secs: env_parse("SEARCH_TIMEOUT_SECS"),
            gas_multiplier_min: DEFAULT_GAS_MULTIPLIER_MIN,
            gas_multiplier_max: DEFAULT_GAS_MULTIPLIER_MAX,
            recheck_before_submit: std::env::var("RECHECK_BEFORE_SUBMIT")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            file: std::env::var("WALLETS_FILE").unwrap_or_else(|_| "wallet_data.txt".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl RegistrationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self::default())
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高，缺省段落回落到环境变量）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) if path.as_ref().exists() => Self::from_file(path),
            _ => Self::from_env(),
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.chain.rpc_url.starts_with("http://") && !self.chain.rpc_url.starts_with("https://")
        {
            anyhow::bail!("chain.rpc_url must be an http(s) URL");
        }
        if self.lookup.url.trim().is_empty() {
            anyhow::bail!("lookup.url must not be empty");
        }
        if self.chain.chain_id == 0 {
            anyhow::bail!("chain.chain_id must be non-zero");
        }
        if self.contracts.name_suffix.trim_matches('.').is_empty() {
            anyhow::bail!("contracts.name_suffix must not be empty");
        }

        let reg = &self.registration;
        if reg.max_concurrent == 0 {
            anyhow::bail!("registration.max_concurrent must be at least 1");
        }
        if !(reg.gas_multiplier_min.is_finite() && reg.gas_multiplier_max.is_finite()) {
            anyhow::bail!("gas multipliers must be finite");
        }
        if reg.gas_multiplier_min < 1.0 || reg.gas_multiplier_min > reg.gas_multiplier_max {
            anyhow::bail!(
                "gas multipliers must satisfy 1.0 <= min <= max (got {} / {})",
                reg.gas_multiplier_min,
                reg.gas_multiplier_max
            );
        }
        if reg.max_search_attempts == Some(0) {
            anyhow::bail!("registration.max_search_attempts must be at least 1 when set");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
