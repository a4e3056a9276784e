//! Domain 模块
//!
//! 包含核心业务逻辑和领域模型

pub mod basename;
pub mod credential;
pub mod name_corpus;
pub mod name_generator;
pub mod registration;

// 重新导出常用类型
pub use credential::{Credential, CredentialResolver, SecretFormat};
pub use name_generator::{GeneratedName, NameCandidate, NameGenerator};
pub use registration::{
    BatchReport, FeeParams, GasParameters, OutcomeStatus, OwnedDomains, RegistrationOutcome,
    RegistrationQuote, RegistrationTransaction,
};
