//! 测试辅助模块
//! 提供内存中的链上网关与域名查询桩实现

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use basename_registrar::{
    domain::{Credential, CredentialResolver, FeeParams, OwnedDomains, RegistrationQuote},
    error::GatewayError,
    service::{
        chain_gateway::{ChainGateway, DomainLookup},
        registration_pipeline::RegistrationSettings,
    },
};
use ethers::{
    providers::{HttpClientError, JsonRpcError, ProviderError},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, H256, U256},
};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// 第 n 个测试私钥（n >= 1）
pub fn test_credential(n: u64) -> Credential {
    CredentialResolver::resolve(&format!("0x{:064x}", n)).expect("valid test key")
}

pub fn test_settings() -> RegistrationSettings {
    RegistrationSettings {
        retry_delay: Duration::from_secs(1),
        rng_seed: Some(1),
        ..RegistrationSettings::default()
    }
}

pub fn test_quote() -> RegistrationQuote {
    RegistrationQuote {
        duration: U256::from(31_557_600u64),
        price: U256::from(1_000_000_000_000_000u64),
    }
}

pub fn test_fees() -> FeeParams {
    FeeParams {
        base_fee: U256::from(1_000_000_000u64),
        priority_fee: U256::from(100_000_000u64),
    }
}

/// 统计同时处于网络活动中的流水线数量
#[derive(Debug, Default)]
pub struct ActivityProbe {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ActivityProbe {
    pub fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// 域名查询桩
#[derive(Default)]
pub struct MockLookup {
    owned: OwnedDomains,
    fail: bool,
    delay: Duration,
    panic_for: Option<Address>,
    probe: Option<Arc<ActivityProbe>>,
    pub calls: AtomicUsize,
}

impl MockLookup {
    pub fn owning(count: u64) -> Self {
        Self {
            owned: OwnedDomains {
                count,
                domains: (0..count).map(|i| format!("owned{i}.base.eth")).collect(),
            },
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: Arc<ActivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn panicking_for(mut self, wallet: Address) -> Self {
        self.panic_for = Some(wallet);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainLookup for MockLookup {
    async fn owned_domains(&self, owner: Address) -> Result<OwnedDomains, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_for == Some(owner) {
            panic!("lookup exploded for {owner:?}");
        }
        if let Some(probe) = &self.probe {
            probe.enter();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            if let Some(probe) = &self.probe {
                probe.exit();
            }
            return Err(GatewayError::Rejected("lookup returned status 502".into()));
        }
        Ok(self.owned.clone())
    }
}

/// 链上网关桩
pub struct MockChainGateway {
    availability: Mutex<VecDeque<bool>>,
    default_available: bool,
    quote: RegistrationQuote,
    raw_gas: U256,
    fees: FeeParams,
    nonce: U256,
    submit_failures: AtomicUsize,
    submit_error: String,
    submit_revert: Option<String>,
    submit_delay: Duration,
    probe: Option<Arc<ActivityProbe>>,
    pub availability_checks: AtomicUsize,
    pub estimate_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub checked_names: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<Bytes>>,
}

impl Default for MockChainGateway {
    fn default() -> Self {
        Self {
            availability: Mutex::new(VecDeque::new()),
            default_available: true,
            quote: test_quote(),
            raw_gas: U256::from(200_000u64),
            fees: test_fees(),
            nonce: U256::from(7u64),
            submit_failures: AtomicUsize::new(0),
            submit_error: "nonce too low".into(),
            submit_revert: None,
            submit_delay: Duration::ZERO,
            probe: None,
            availability_checks: AtomicUsize::new(0),
            estimate_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            checked_names: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl MockChainGateway {
    /// 依次返回给定的可用性结果，用完后回落到 `default_available`
    pub fn with_availability(self, sequence: &[bool]) -> Self {
        *self.availability.lock().unwrap() = sequence.iter().copied().collect();
        self
    }

    pub fn never_available(mut self) -> Self {
        self.default_available = false;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = U256::from(nonce);
        self
    }

    /// 接下来的 n 次广播失败
    pub fn failing_submissions(self, n: usize, error: &str) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        Self {
            submit_error: error.to_string(),
            ..self
        }
    }

    /// 接下来的 n 次广播以节点的 JSON-RPC revert 形式失败（code 3 + 十六进制错误数据）
    pub fn reverting_submissions(self, n: usize, revert_data: &str) -> Self {
        self.submit_failures.store(n, Ordering::SeqCst);
        Self {
            submit_revert: Some(revert_data.to_string()),
            ..self
        }
    }

    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    pub fn with_probe(mut self, probe: Arc<ActivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn availability_check_count(&self) -> usize {
        self.availability_checks.load(Ordering::SeqCst)
    }

    pub fn estimate_count(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainGateway for MockChainGateway {
    async fn is_available(&self, label: &str) -> Result<bool, GatewayError> {
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        self.checked_names.lock().unwrap().push(label.to_string());
        let next = self.availability.lock().unwrap().pop_front();
        Ok(next.unwrap_or(self.default_available))
    }

    async fn quote(&self, _label: &str) -> Result<RegistrationQuote, GatewayError> {
        Ok(self.quote)
    }

    async fn estimate_gas(&self, _tx: &TypedTransaction) -> Result<U256, GatewayError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw_gas)
    }

    async fn fee_params(&self) -> Result<FeeParams, GatewayError> {
        Ok(self.fees)
    }

    async fn next_nonce(&self, _address: Address) -> Result<U256, GatewayError> {
        Ok(self.nonce)
    }

    async fn submit(&self, raw_tx: Bytes) -> Result<H256, GatewayError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }

        let should_fail = self
            .submit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if let Some(probe) = &self.probe {
            probe.exit();
        }

        if should_fail {
            return Err(match &self.submit_revert {
                Some(data) => execution_reverted(data),
                None => GatewayError::Rejected(self.submit_error.clone()),
            });
        }

        let hash = H256::from(ethers::utils::keccak256(&raw_tx));
        self.submitted.lock().unwrap().push(raw_tx);
        Ok(hash)
    }
}

/// 节点对 revert 的标准响应
pub fn execution_reverted(data: &str) -> GatewayError {
    GatewayError::Provider(ProviderError::JsonRpcClientError(Box::new(
        HttpClientError::JsonRpcError(JsonRpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(serde_json::Value::String(data.to_string())),
        }),
    )))
}
