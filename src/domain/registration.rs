//! 注册流程领域模型

use chrono::{DateTime, Utc};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, H256, U256,
};
use serde::Serialize;

use crate::{domain::basename::ResolverCalls, error::RegistrationError};

/// 钱包已持有的域名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnedDomains {
    pub count: u64,
    pub domains: Vec<String>,
}

/// 最短注册时长及其价格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrationQuote {
    /// 秒
    pub duration: U256,
    /// wei
    pub price: U256,
}

/// 链上费用参数（最新区块 base fee + 节点建议的 priority fee）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeParams {
    pub base_fee: U256,
    pub priority_fee: U256,
}

/// EIP-1559 Gas 参数，每次构建交易时重新获取
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasParameters {
    pub base_fee: U256,
    pub priority_fee: U256,
    pub max_fee: U256,
}

impl From<FeeParams> for GasParameters {
    fn from(fees: FeeParams) -> Self {
        Self {
            base_fee: fees.base_fee,
            priority_fee: fees.priority_fee,
            max_fee: fees.base_fee.saturating_add(fees.priority_fee),
        }
    }
}

/// 已构建、待签名的注册交易
#[derive(Debug, Clone)]
pub struct RegistrationTransaction {
    /// 完整域名（含后缀）
    pub domain: String,
    pub resolver_calls: ResolverCalls,
    pub quote: RegistrationQuote,
    pub gas: GasParameters,
    pub gas_limit: U256,
    pub nonce: U256,
    pub request: Eip1559TransactionRequest,
}

impl RegistrationTransaction {
    pub fn typed(&self) -> TypedTransaction {
        TypedTransaction::Eip1559(self.request.clone())
    }

    pub fn value(&self) -> U256 {
        self.request.value.unwrap_or_default()
    }

    pub fn data(&self) -> Bytes {
        self.request.data.clone().unwrap_or_default()
    }
}

/// 单个钱包本次运行的最终结果
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    pub wallet: Address,
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 交易已广播（不等待链上确认）
    Registered {
        domain: String,
        tx_hash: H256,
        attempts: u32,
    },
    /// 已达持有上限，无需注册
    AlreadySufficient { count: u64, domains: Vec<String> },
    Failed {
        code: &'static str,
        message: String,
        retryable: bool,
    },
}

impl RegistrationOutcome {
    pub fn registered(wallet: Address, domain: String, tx_hash: H256, attempts: u32) -> Self {
        Self {
            wallet,
            status: OutcomeStatus::Registered {
                domain,
                tx_hash,
                attempts,
            },
        }
    }

    pub fn already_sufficient(wallet: Address, owned: OwnedDomains) -> Self {
        Self {
            wallet,
            status: OutcomeStatus::AlreadySufficient {
                count: owned.count,
                domains: owned.domains,
            },
        }
    }

    pub fn failed(wallet: Address, error: &RegistrationError) -> Self {
        Self {
            wallet,
            status: OutcomeStatus::Failed {
                code: error.code(),
                message: error.to_string(),
                retryable: error.is_retryable(),
            },
        }
    }

    /// 任务本身异常终止（panic / abort）
    pub fn aborted(wallet: Address, message: String) -> Self {
        Self {
            wallet,
            status: OutcomeStatus::Failed {
                code: "task_aborted",
                message,
                retryable: true,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// 批量运行汇总
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<RegistrationOutcome>,
    pub successful: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<RegistrationOutcome>) -> Self {
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        let failed = outcomes.len() - successful;
        Self {
            outcomes,
            successful,
            failed,
            finished_at: Utc::now(),
        }
    }
}
