//! Basename 批量注册
//!
//! 为一批钱包在 Base 链上注册 `*.base.eth` 域名：解析凭证、生成候选名称、
//! 检查可用性、构建并广播注册交易，在共享 RPC 端点上以受控并发运行。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use config::Config;
pub use error::{CredentialError, GatewayError, RegistrationError};

pub mod prelude {
    pub use crate::{
        config::Config,
        domain::{
            BatchReport, Credential, CredentialResolver, OutcomeStatus, RegistrationOutcome,
        },
        error::{CredentialError, GatewayError, RegistrationError},
        infrastructure::shutdown::{self, ShutdownSignal, ShutdownTrigger},
        service::{
            batch_driver::BatchDriver,
            chain_gateway::{ChainGateway, DomainLookup},
            registration_pipeline::{RegistrationPipeline, RegistrationSettings, SearchPolicy},
        },
    };
}
