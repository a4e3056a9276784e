//! 批量注册驱动
//!
//! 每个钱包一个独立任务，计数信号量作为准入闸门限制同时运行的流水线数量。
//! 许可在任务内以 RAII 方式持有，任何退出路径（成功、失败、panic）都会释放。
//! 单个钱包的失败不会影响其它钱包，也不会向调用方传播。

use std::sync::Arc;

use ethers::types::Address;
use tokio::{sync::Semaphore, task::JoinHandle};

use crate::{
    domain::{BatchReport, Credential, RegistrationOutcome},
    error::RegistrationError,
    infrastructure::shutdown::ShutdownSignal,
    service::registration_pipeline::RegistrationPipeline,
};

pub struct BatchDriver {
    pipeline: Arc<RegistrationPipeline>,
    max_concurrent: usize,
    shutdown: ShutdownSignal,
}

impl BatchDriver {
    /// `max_concurrent` 为 0 时按 1 处理
    pub fn new(
        pipeline: Arc<RegistrationPipeline>,
        max_concurrent: usize,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            pipeline,
            max_concurrent: max_concurrent.max(1),
            shutdown,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// 运行整批钱包，等待全部结束后汇总；结果顺序与输入顺序一致
    pub async fn run_batch(&self, credentials: Vec<Credential>) -> BatchReport {
        let gate = Arc::new(Semaphore::new(self.max_concurrent));

        let tasks: Vec<(Address, JoinHandle<RegistrationOutcome>)> = credentials
            .into_iter()
            .map(|credential| {
                let wallet = credential.address();
                let gate = gate.clone();
                let pipeline = self.pipeline.clone();
                let shutdown = self.shutdown.clone();

                let handle = tokio::spawn(async move {
                    let permit = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => None,
                        permit = gate.acquire_owned() => permit.ok(),
                    };
                    let Some(_permit) = permit else {
                        return RegistrationOutcome::failed(wallet, &RegistrationError::Cancelled);
                    };

                    pipeline.run(credential, shutdown).await
                });

                (wallet, handle)
            })
            .collect();

        let joined = futures::future::join_all(tasks.into_iter().map(
            |(wallet, handle)| async move {
                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(wallet = ?wallet, error = %e, "Registration task aborted");
                        RegistrationOutcome::aborted(wallet, e.to_string())
                    }
                }
            },
        ))
        .await;

        let report = BatchReport::from_outcomes(joined);
        tracing::info!(
            successful = report.successful,
            failed = report.failed,
            "Registration completed"
        );
        report
    }
}
