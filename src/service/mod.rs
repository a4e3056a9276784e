pub mod batch_driver;
pub mod chain_gateway; // 链上 RPC 与域名查询适配层
pub mod gas;
pub mod registration_pipeline;
pub mod wallet_loader;
