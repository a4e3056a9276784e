//! 单钱包注册流水线
//!
//! 状态机：
//! `CheckHoldings → GenerateCandidate ⇄ CheckAvailability → Quote → BuildTransaction → Sign → Submit → Done`
//!
//! - 已持有域名达到上限时直接以成功结束，不产生任何写操作
//! - 候选名称不可用时按固定间隔重试；默认不设上限，可配置次数上限与超时
//! - 每次构建交易都重新获取费用参数、gas 估算和 nonce
//! - 任意环节失败都在 [`RegistrationPipeline::run`] 边界转换为 [`RegistrationOutcome`]

use std::{future::Future, sync::Arc, time::Duration};

use ethers::{
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, H256,
    },
};
use rand::{rngs::StdRng, SeedableRng};
use tokio::time::Instant;
use tracing::Instrument;

use crate::{
    config::{
        Config, ContractsConfig, DEFAULT_CHAIN_ID, DEFAULT_MAX_DOMAINS_PER_WALLET,
        DEFAULT_RETRY_DELAY_MS,
    },
    domain::{
        basename::{self, RegisterRequest, ResolverCalls},
        Credential, GasParameters, GeneratedName, NameCandidate, NameGenerator, OwnedDomains,
        RegistrationOutcome, RegistrationQuote, RegistrationTransaction,
    },
    error::{GatewayError, RegistrationError},
    infrastructure::{log_redact::redact_hex_string, shutdown::ShutdownSignal},
    service::{
        chain_gateway::{ChainGateway, DomainLookup},
        gas::GasLimitPolicy,
    },
};

/// 候选名称搜索策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchPolicy {
    /// None 表示不限次数
    pub max_attempts: Option<u32>,
    /// None 表示不限时长；在每轮开始时检查
    pub timeout: Option<Duration>,
}

/// 流水线运行参数
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub chain_id: u64,
    pub registrar_controller: Address,
    pub resolver: Address,
    pub coin_type: u64,
    pub name_suffix: String,
    pub max_domains_per_wallet: u64,
    pub retry_delay: Duration,
    pub search: SearchPolicy,
    pub gas_policy: GasLimitPolicy,
    pub recheck_before_submit: bool,
    /// 固定随机种子（测试用）；None 时每次运行从系统熵初始化
    pub rng_seed: Option<u64>,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        let contracts = ContractsConfig::default();
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            registrar_controller: contracts.registrar_controller,
            resolver: contracts.l2_resolver,
            coin_type: contracts.coin_type,
            name_suffix: contracts.name_suffix,
            max_domains_per_wallet: DEFAULT_MAX_DOMAINS_PER_WALLET,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            search: SearchPolicy::default(),
            gas_policy: GasLimitPolicy::default(),
            recheck_before_submit: false,
            rng_seed: None,
        }
    }
}

impl RegistrationSettings {
    pub fn from_config(config: &Config) -> Self {
        let reg = &config.registration;
        Self {
            chain_id: config.chain.chain_id,
            registrar_controller: config.contracts.registrar_controller,
            resolver: config.contracts.l2_resolver,
            coin_type: config.contracts.coin_type,
            name_suffix: config.contracts.name_suffix.clone(),
            max_domains_per_wallet: reg.max_domains_per_wallet,
            retry_delay: reg.retry_delay(),
            search: SearchPolicy {
                max_attempts: reg.max_search_attempts,
                timeout: reg.search_timeout(),
            },
            gas_policy: GasLimitPolicy::from_multipliers(
                reg.gas_multiplier_min,
                reg.gas_multiplier_max,
            ),
            recheck_before_submit: reg.recheck_before_submit,
            rng_seed: None,
        }
    }
}

enum Completion {
    Registered {
        domain: String,
        tx_hash: H256,
        attempts: u32,
    },
    AlreadySufficient(OwnedDomains),
}

struct SearchState {
    attempts: u32,
    started: Instant,
}

pub struct RegistrationPipeline {
    gateway: Arc<dyn ChainGateway>,
    lookup: Arc<dyn DomainLookup>,
    generator: NameGenerator,
    settings: RegistrationSettings,
}

impl RegistrationPipeline {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        lookup: Arc<dyn DomainLookup>,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            gateway,
            lookup,
            generator: NameGenerator::default(),
            settings,
        }
    }

    pub fn with_generator(mut self, generator: NameGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn settings(&self) -> &RegistrationSettings {
        &self.settings
    }

    /// 运行完整流水线，所有错误都被收敛为结果，不向调用方传播
    pub async fn run(&self, credential: Credential, shutdown: ShutdownSignal) -> RegistrationOutcome {
        let wallet = credential.address();
        let span = tracing::info_span!("register", wallet = %credential.checksum_address());

        async move {
            match self.execute(&credential, &shutdown).await {
                Ok(Completion::Registered {
                    domain,
                    tx_hash,
                    attempts,
                }) => {
                    tracing::info!(
                        domain = %domain,
                        tx_hash = ?tx_hash,
                        attempts = attempts,
                        "Domain registration submitted"
                    );
                    RegistrationOutcome::registered(wallet, domain, tx_hash, attempts)
                }
                Ok(Completion::AlreadySufficient(owned)) => {
                    tracing::info!(
                        count = owned.count,
                        domains = ?owned.domains,
                        "Wallet already holds enough domains"
                    );
                    RegistrationOutcome::already_sufficient(wallet, owned)
                }
                Err(e) => {
                    tracing::error!(code = e.code(), error = %e, "Domain registration failed");
                    RegistrationOutcome::failed(wallet, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        credential: &Credential,
        shutdown: &ShutdownSignal,
    ) -> Result<Completion, RegistrationError> {
        let owner = credential.address();

        // 1. CheckHoldings
        let owned = guarded(shutdown, async {
            self.lookup
                .owned_domains(owner)
                .await
                .map_err(RegistrationError::Lookup)
        })
        .await?;

        if owned.count >= self.settings.max_domains_per_wallet {
            return Ok(Completion::AlreadySufficient(owned));
        }

        let mut rng = self.rng_for(owner);
        let mut search = SearchState {
            attempts: 0,
            started: Instant::now(),
        };

        loop {
            // 2. GenerateCandidate ⇄ CheckAvailability
            let candidate = self.find_available(&mut rng, &mut search, shutdown).await?;

            // 3. Quote
            let quote = guarded(shutdown, self.quote(&candidate)).await?;

            // 4. BuildTransaction
            let tx = guarded(
                shutdown,
                self.build_transaction(credential, &candidate, quote, &mut rng),
            )
            .await?;

            if self.settings.recheck_before_submit {
                let still_available = guarded(shutdown, self.check_available(&candidate)).await?;
                if !still_available {
                    tracing::warn!(
                        name = %candidate,
                        "Name was taken while building the transaction, searching again"
                    );
                    self.pause(shutdown).await?;
                    continue;
                }
            }

            // 5. Sign
            let raw_tx = self.sign(credential, &tx)?;
            tracing::debug!(
                domain = %tx.domain,
                raw_tx = %redact_hex_string(&hex::encode(&raw_tx), 10),
                "Signed registration transaction"
            );

            // 6. Submit
            let tx_hash = guarded(shutdown, async {
                self.gateway
                    .submit(raw_tx)
                    .await
                    .map_err(|e| taken_or(e, &tx.domain, RegistrationError::Submission))
            })
            .await?;

            return Ok(Completion::Registered {
                domain: tx.domain,
                tx_hash,
                attempts: search.attempts,
            });
        }
    }

    async fn find_available(
        &self,
        rng: &mut StdRng,
        search: &mut SearchState,
        shutdown: &ShutdownSignal,
    ) -> Result<NameCandidate, RegistrationError> {
        loop {
            if shutdown.is_cancelled() {
                return Err(RegistrationError::Cancelled);
            }
            let exhausted = self
                .settings
                .search
                .max_attempts
                .is_some_and(|max| search.attempts >= max)
                || self
                    .settings
                    .search
                    .timeout
                    .is_some_and(|timeout| search.started.elapsed() >= timeout);
            if exhausted {
                return Err(RegistrationError::SearchExhausted {
                    attempts: search.attempts,
                });
            }

            search.attempts += 1;
            match self.generator.generate(rng) {
                GeneratedName::Accepted(candidate) => {
                    if guarded(shutdown, self.check_available(&candidate)).await? {
                        tracing::debug!(
                            name = %candidate,
                            attempt = search.attempts,
                            "Found available name"
                        );
                        return Ok(candidate);
                    }
                    tracing::debug!(
                        name = %candidate,
                        attempt = search.attempts,
                        "Name not available, retrying"
                    );
                }
                GeneratedName::BoundExceeded(last) => {
                    tracing::warn!(
                        last = %last,
                        attempt = search.attempts,
                        "Name generator hit its attempt bound without a valid candidate"
                    );
                }
            }

            self.pause(shutdown).await?;
        }
    }

    async fn check_available(&self, candidate: &NameCandidate) -> Result<bool, RegistrationError> {
        self.gateway
            .is_available(candidate.as_str())
            .await
            .map_err(RegistrationError::AvailabilityCheck)
    }

    async fn quote(&self, candidate: &NameCandidate) -> Result<RegistrationQuote, RegistrationError> {
        self.gateway
            .quote(candidate.as_str())
            .await
            .map_err(RegistrationError::Quote)
    }

    /// 构建注册交易：注册调用内嵌三条解析器记录，费用/gas/nonce 均实时获取
    pub async fn build_transaction(
        &self,
        credential: &Credential,
        candidate: &NameCandidate,
        quote: RegistrationQuote,
        rng: &mut StdRng,
    ) -> Result<RegistrationTransaction, RegistrationError> {
        let owner = credential.address();
        let domain = basename::full_name(candidate.as_str(), &self.settings.name_suffix);
        let resolver_calls = ResolverCalls::build(&domain, owner, self.settings.coin_type);

        let data = RegisterRequest {
            name: candidate.to_string(),
            owner,
            duration: quote.duration,
            resolver: self.settings.resolver,
            data: resolver_calls.to_vec(),
            reverse_record: true,
        }
        .encode();

        let gas: GasParameters = self
            .gateway
            .fee_params()
            .await
            .map_err(RegistrationError::FeeQuery)?
            .into();

        let request = Eip1559TransactionRequest::new()
            .from(owner)
            .to(self.settings.registrar_controller)
            .data(data)
            .value(quote.price)
            .chain_id(self.settings.chain_id);

        let raw_estimate = self
            .gateway
            .estimate_gas(&TypedTransaction::Eip1559(request.clone()))
            .await
            .map_err(|e| taken_or(e, &domain, RegistrationError::Estimation))?;
        let gas_limit = self.settings.gas_policy.inflate(raw_estimate, rng);

        let nonce = self
            .gateway
            .next_nonce(owner)
            .await
            .map_err(RegistrationError::NonceQuery)?;

        let request = request
            .nonce(nonce)
            .gas(gas_limit)
            .max_fee_per_gas(gas.max_fee)
            .max_priority_fee_per_gas(gas.priority_fee);

        tracing::debug!(
            domain = %domain,
            nonce = %nonce,
            raw_estimate = %raw_estimate,
            gas_limit = %gas_limit,
            max_fee = %gas.max_fee,
            "Built registration transaction"
        );

        Ok(RegistrationTransaction {
            domain,
            resolver_calls,
            quote,
            gas,
            gas_limit,
            nonce,
            request,
        })
    }

    fn sign(
        &self,
        credential: &Credential,
        tx: &RegistrationTransaction,
    ) -> Result<Bytes, RegistrationError> {
        let wallet =
            LocalWallet::from(credential.signing_key().clone()).with_chain_id(self.settings.chain_id);
        let typed = tx.typed();
        let signature = wallet
            .sign_transaction_sync(&typed)
            .map_err(|e| RegistrationError::Signing(e.to_string()))?;
        Ok(typed.rlp_signed(&signature))
    }

    async fn pause(&self, shutdown: &ShutdownSignal) -> Result<(), RegistrationError> {
        shutdown
            .run(tokio::time::sleep(self.settings.retry_delay))
            .await
            .ok_or(RegistrationError::Cancelled)
    }

    fn rng_for(&self, owner: Address) -> StdRng {
        match self.settings.rng_seed {
            Some(seed) => {
                let mut tail = [0u8; 8];
                tail.copy_from_slice(&owner.as_bytes()[12..]);
                StdRng::seed_from_u64(seed ^ u64::from_be_bytes(tail))
            }
            None => StdRng::from_entropy(),
        }
    }
}

/// 与取消信号竞争执行
async fn guarded<T, F>(shutdown: &ShutdownSignal, fut: F) -> Result<T, RegistrationError>
where
    F: Future<Output = Result<T, RegistrationError>>,
{
    shutdown
        .run(fut)
        .await
        .unwrap_or(Err(RegistrationError::Cancelled))
}

/// 远端报"名称不可用"时归为 AlreadyTaken，否则按调用方给的类别
fn taken_or(
    error: GatewayError,
    domain: &str,
    otherwise: fn(GatewayError) -> RegistrationError,
) -> RegistrationError {
    if error.indicates_name_taken() {
        RegistrationError::AlreadyTaken(domain.to_string())
    } else {
        otherwise(error)
    }
}
