//! 链上网关与域名查询客户端
//!
//! 流水线只依赖 [`ChainGateway`] / [`DomainLookup`] 两个 trait，
//! 生产实现分别基于 ethers `Provider<Http>` 与 reqwest；两者都可被多条流水线并发共享。

use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider},
    types::{
        transaction::eip2718::TypedTransaction, Address, BlockNumber, Bytes, TransactionRequest,
        H256, U256,
    },
    utils::to_checksum,
};
use serde::Deserialize;

use crate::{
    config::{ChainConfig, ContractsConfig, LookupConfig},
    domain::{
        basename::{self, decode_bool, decode_uint},
        FeeParams, OwnedDomains, RegistrationQuote,
    },
    error::GatewayError,
};

/// 链上读写能力
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// 名称是否可注册
    async fn is_available(&self, label: &str) -> Result<bool, GatewayError>;

    /// 最短注册时长与对应价格
    async fn quote(&self, label: &str) -> Result<RegistrationQuote, GatewayError>;

    /// 模拟执行，返回原始 gas 估算
    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, GatewayError>;

    /// 最新区块 base fee 与建议 priority fee
    async fn fee_params(&self) -> Result<FeeParams, GatewayError>;

    /// 含 pending 的交易计数
    async fn next_nonce(&self, address: Address) -> Result<U256, GatewayError>;

    /// 广播已签名交易，不等待确认
    async fn submit(&self, raw_tx: Bytes) -> Result<H256, GatewayError>;
}

/// 已持有域名查询能力
#[async_trait]
pub trait DomainLookup: Send + Sync {
    async fn owned_domains(&self, owner: Address) -> Result<OwnedDomains, GatewayError>;
}

fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(GatewayError::Http)
}

/// 基于 ethers 的链上网关
pub struct EthersChainGateway {
    provider: Provider<Http>,
    registrar_controller: Address,
}

impl EthersChainGateway {
    pub fn new(chain: &ChainConfig, contracts: &ContractsConfig) -> Result<Self, GatewayError> {
        let url = reqwest::Url::parse(&chain.rpc_url)
            .map_err(|e| GatewayError::InvalidEndpoint(format!("{}: {}", chain.rpc_url, e)))?;
        let client = build_http_client(chain.request_timeout_secs)?;
        let provider = Provider::new(Http::new_with_client(url, client));

        Ok(Self {
            provider,
            registrar_controller: contracts.registrar_controller,
        })
    }

    /// 对注册控制器执行 eth_call
    async fn call_controller(&self, data: Bytes) -> Result<Bytes, GatewayError> {
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.registrar_controller)
            .data(data)
            .into();
        Ok(self.provider.call(&tx, None).await?)
    }
}

#[async_trait]
impl ChainGateway for EthersChainGateway {
    async fn is_available(&self, label: &str) -> Result<bool, GatewayError> {
        let output = self.call_controller(basename::available_call(label)).await?;
        decode_bool(&output).map_err(GatewayError::Decode)
    }

    async fn quote(&self, label: &str) -> Result<RegistrationQuote, GatewayError> {
        let output = self
            .call_controller(basename::min_registration_duration_call())
            .await?;
        let duration = decode_uint(&output).map_err(GatewayError::Decode)?;

        let output = self
            .call_controller(basename::register_price_call(label, duration))
            .await?;
        let price = decode_uint(&output).map_err(GatewayError::Decode)?;

        Ok(RegistrationQuote { duration, price })
    }

    async fn estimate_gas(&self, tx: &TypedTransaction) -> Result<U256, GatewayError> {
        Ok(self.provider.estimate_gas(tx, None).await?)
    }

    async fn fee_params(&self) -> Result<FeeParams, GatewayError> {
        let block = self
            .provider
            .get_block(BlockNumber::Latest)
            .await?
            .ok_or_else(|| GatewayError::Decode("latest block not returned".into()))?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| GatewayError::Decode("latest block has no baseFeePerGas".into()))?;
        let priority_fee: U256 = self
            .provider
            .request("eth_maxPriorityFeePerGas", ())
            .await?;

        Ok(FeeParams {
            base_fee,
            priority_fee,
        })
    }

    async fn next_nonce(&self, address: Address) -> Result<U256, GatewayError> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn submit(&self, raw_tx: Bytes) -> Result<H256, GatewayError> {
        let pending = self.provider.send_raw_transaction(raw_tx).await?;
        Ok(pending.tx_hash())
    }
}

/// 域名查询 API 响应
#[derive(Debug, Deserialize)]
struct UsernamesResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    data: Option<Vec<UsernameRecord>>,
}

#[derive(Debug, Deserialize)]
struct UsernameRecord {
    domain: String,
}

impl From<UsernamesResponse> for OwnedDomains {
    fn from(resp: UsernamesResponse) -> Self {
        Self {
            count: resp.total_count,
            domains: resp
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|r| r.domain)
                .collect(),
        }
    }
}

/// 基于 HTTP 的已持有域名查询
pub struct BasenameLookupClient {
    http_client: reqwest::Client,
    url: String,
    network: String,
}

impl BasenameLookupClient {
    pub fn new(lookup: &LookupConfig, network: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            http_client: build_http_client(lookup.timeout_secs)?,
            url: lookup.url.clone(),
            network: network.to_string(),
        })
    }
}

#[async_trait]
impl DomainLookup for BasenameLookupClient {
    async fn owned_domains(&self, owner: Address) -> Result<OwnedDomains, GatewayError> {
        let address = to_checksum(&owner, None);
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("address", address.as_str()), ("network", self.network.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Rejected(format!(
                "lookup returned status {}",
                status
            )));
        }

        let body: UsernamesResponse = response.json().await?;
        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usernames_response() {
        let json = r#"{
            "total_count": 2,
            "data": [
                {"domain": "alice.base.eth", "token_id": "1"},
                {"domain": "bob.base.eth"}
            ]
        }"#;
        let parsed: UsernamesResponse = serde_json::from_str(json).unwrap();
        let owned = OwnedDomains::from(parsed);
        assert_eq!(owned.count, 2);
        assert_eq!(owned.domains, vec!["alice.base.eth", "bob.base.eth"]);
    }

    #[test]
    fn test_parse_empty_usernames_response() {
        let parsed: UsernamesResponse = serde_json::from_str(r#"{"data": null}"#).unwrap();
        let owned = OwnedDomains::from(parsed);
        assert_eq!(owned.count, 0);
        assert!(owned.domains.is_empty());
    }

    #[test]
    fn test_gateway_rejects_bad_rpc_url() {
        let chain = ChainConfig {
            rpc_url: "not a url".into(),
            ..ChainConfig::default()
        };
        let result = EthersChainGateway::new(&chain, &ContractsConfig::default());
        assert!(matches!(result, Err(GatewayError::InvalidEndpoint(_))));
    }
}
