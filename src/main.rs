//! Basename 批量注册入口

use std::sync::Arc;

use anyhow::{Context, Result};
use basename_registrar::{
    config::Config,
    infrastructure::{logging, shutdown},
    service::{
        batch_driver::BatchDriver,
        chain_gateway::{BasenameLookupClient, EthersChainGateway},
        registration_pipeline::{RegistrationPipeline, RegistrationSettings},
        wallet_loader,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指向的 TOML 优先）
    let config = Config::from_env_and_file(std::env::var("CONFIG_PATH").ok())?;
    config.validate().context("Invalid configuration")?;

    // ✅ 3. 初始化日志
    let _log_guard = logging::init_logging(&config.logging)?;

    // ✅ 4. 读取钱包
    let wallets = match wallet_loader::load_wallet_file(&config.wallets.file) {
        Ok(wallets) => wallets,
        Err(e) => {
            tracing::error!(error = %e, file = %config.wallets.file, "No wallet data (seed or private key)");
            return Err(e);
        }
    };
    if wallets.credentials.is_empty() {
        tracing::error!(
            rejected = wallets.rejected,
            "Count of private keys is 0, check validity of wallet data"
        );
        anyhow::bail!("no usable wallets in {}", config.wallets.file);
    }

    tracing::warn!(
        wallets = wallets.credentials.len(),
        rejected = wallets.rejected,
        max_concurrent = config.registration.max_concurrent,
        chain_id = config.chain.chain_id,
        "Loading wallets, starting registration"
    );

    // ✅ 5. 构建共享网络会话
    let gateway = Arc::new(EthersChainGateway::new(&config.chain, &config.contracts)?);
    let lookup = Arc::new(BasenameLookupClient::new(&config.lookup, &config.chain.network)?);

    // ✅ 6. Ctrl+C 取消
    let (trigger, signal) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, cancelling in-flight registrations");
            trigger.trigger();
        }
    });

    // ✅ 7. 运行批处理
    let pipeline = Arc::new(RegistrationPipeline::new(
        gateway,
        lookup,
        RegistrationSettings::from_config(&config),
    ));
    let driver = BatchDriver::new(pipeline, config.registration.max_concurrent, signal);
    let report = driver.run_batch(wallets.credentials).await;

    tracing::debug!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "Batch report"
    );

    Ok(())
}
