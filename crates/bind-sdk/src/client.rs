//! ChainClient - JSON-RPC client used by bindings

use std::sync::Arc;
use std::time::Duration;

use bind_primitives::{parse_quantity_u256, parse_quantity_u64, Address, H256, U256};
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::ClientConfig;
use crate::filter::Filter;
use crate::transport::{deserialize_response, MockTransport, Transport};
use crate::types::{
    parse_hex_bytes, BlockId, CallRequest, Log, PendingTransaction, TransactionReceipt,
    TransactionRequest,
};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Shortest live feed polling interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Node-side filter handle returned by `eth_newFilter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterId(pub String);

/// Chain client for RPC communication.
///
/// Cheap to clone; clones share the transport and the cached chain ID.
#[derive(Clone)]
pub struct ChainClient {
    transport: Arc<dyn Transport>,
    chain_id: Arc<OnceCell<u64>>,
    poll_interval: Duration,
    subscription_buffer: usize,
}

impl ChainClient {
    /// Create a new client with HTTP transport
    #[cfg(feature = "http")]
    pub async fn connect(url: &str) -> Result<Self, SdkError> {
        Self::from_config(&ClientConfig {
            rpc_url: url.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Create an HTTP-backed client from configuration. The chain ID is
    /// fetched from the node unless configured.
    #[cfg(feature = "http")]
    pub async fn from_config(config: &ClientConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let transport = HttpTransport::with_timeout(&config.rpc_url, config.request_timeout())?;
        let client = Self::with_transport(transport).with_settings(config);

        let chain_id = client.chain_id().await?;
        debug!(url = %config.rpc_url, chain_id, "connected");

        Ok(client)
    }

    /// Create a new client with mock transport (for testing)
    pub fn new_mock() -> Self {
        Self {
            chain_id: Arc::new(OnceCell::new_with(Some(1))),
            ..Self::with_transport(MockTransport::new())
        }
    }

    /// Create a client with a custom transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let defaults = ClientConfig::default();
        Self {
            transport: Arc::new(transport),
            chain_id: Arc::new(OnceCell::new()),
            poll_interval: defaults.poll_interval(),
            subscription_buffer: defaults.subscription_buffer,
        }
    }

    /// Apply chain ID, polling and buffering settings from configuration.
    ///
    /// Zero intervals and buffers are raised to the smallest usable value.
    pub fn with_settings(mut self, config: &ClientConfig) -> Self {
        if let Some(id) = config.chain_id {
            self.chain_id = Arc::new(OnceCell::new_with(Some(id)));
        }
        self.poll_interval = config.poll_interval().max(MIN_POLL_INTERVAL);
        self.subscription_buffer = config.subscription_buffer.max(1);
        self
    }

    /// Live feed polling interval
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Capacity of each subscription's delivery channel
    pub fn subscription_buffer(&self) -> usize {
        self.subscription_buffer
    }

    /// Helper method to make RPC request and deserialize
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.transport.request_json(method, params).await?;
        deserialize_response(value)
    }

    // ==================== Chain Info ====================

    /// Get the chain ID. Asked from the node once, then cached.
    pub async fn chain_id(&self) -> Result<u64, SdkError> {
        self.chain_id
            .get_or_try_init(|| self.fetch_chain_id())
            .await
            .copied()
    }

    async fn fetch_chain_id(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_chainId", vec![]).await?;
        Ok(parse_quantity_u64(&result)?)
    }

    /// Get the current gas price
    pub async fn gas_price(&self) -> Result<U256, SdkError> {
        let result: String = self.request("eth_gasPrice", vec![]).await?;
        Ok(parse_quantity_u256(&result)?)
    }

    /// Get the current block number
    pub async fn block_number(&self) -> Result<u64, SdkError> {
        let result: String = self.request("eth_blockNumber", vec![]).await?;
        Ok(parse_quantity_u64(&result)?)
    }

    // ==================== Account Queries ====================

    /// Get the balance of an address
    pub async fn get_balance(&self, address: &Address, block: BlockId) -> Result<U256, SdkError> {
        let result: String = self
            .request(
                "eth_getBalance",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        Ok(parse_quantity_u256(&result)?)
    }

    /// Get the nonce (transaction count) of an address
    pub async fn get_nonce(&self, address: &Address, block: BlockId) -> Result<u64, SdkError> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        Ok(parse_quantity_u64(&result)?)
    }

    /// Get the code at an address
    pub async fn get_code(&self, address: &Address, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_getCode",
                vec![
                    Value::String(address.to_hex()),
                    serde_json::to_value(block)?,
                ],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    // ==================== Call & Estimation ====================

    /// Execute a call (read-only, does not create transaction)
    pub async fn call(&self, request: &CallRequest, block: BlockId) -> Result<Bytes, SdkError> {
        let result: String = self
            .request(
                "eth_call",
                vec![serde_json::to_value(request)?, serde_json::to_value(block)?],
            )
            .await?;
        parse_hex_bytes(&result)
    }

    /// Estimate gas for a transaction
    pub async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, SdkError> {
        let result: String = self
            .request("eth_estimateGas", vec![serde_json::to_value(request)?])
            .await?;
        Ok(parse_quantity_u64(&result)?)
    }

    // ==================== Transaction Submission ====================

    /// Send a raw transaction (RLP-encoded bytes)
    pub async fn send_raw_transaction(&self, tx: &[u8]) -> Result<PendingTransaction, SdkError> {
        let hex = format!("0x{}", hex::encode(tx));
        let result: H256 = self
            .request("eth_sendRawTransaction", vec![Value::String(hex)])
            .await?;
        debug!(hash = %result, "raw transaction sent");
        Ok(PendingTransaction::new(result))
    }

    /// Send a transaction for the node to sign with one of its accounts
    pub async fn send_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<PendingTransaction, SdkError> {
        let result: H256 = self
            .request("eth_sendTransaction", vec![serde_json::to_value(tx)?])
            .await?;
        debug!(hash = %result, "transaction sent");
        Ok(PendingTransaction::new(result))
    }

    /// Get a transaction receipt; `None` while the transaction is unmined
    pub async fn get_transaction_receipt(
        &self,
        hash: &H256,
    ) -> Result<Option<TransactionReceipt>, SdkError> {
        self.request(
            "eth_getTransactionReceipt",
            vec![Value::String(hash.to_hex())],
        )
        .await
    }

    // ==================== Logs & Filters ====================

    /// Fetch historical logs matching `filter`, in node order
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, SdkError> {
        self.request("eth_getLogs", vec![serde_json::to_value(filter)?])
            .await
    }

    /// Install a node-side log filter
    pub async fn new_filter(&self, filter: &Filter) -> Result<FilterId, SdkError> {
        let id: String = self
            .request("eth_newFilter", vec![serde_json::to_value(filter)?])
            .await?;
        debug!(filter_id = %id, "filter installed");
        Ok(FilterId(id))
    }

    /// Logs matched by an installed filter since the previous poll
    pub async fn get_filter_changes(&self, id: &FilterId) -> Result<Vec<Log>, SdkError> {
        self.request("eth_getFilterChanges", vec![Value::String(id.0.clone())])
            .await
    }

    /// Remove an installed filter. Returns whether the node knew it.
    pub async fn uninstall_filter(&self, id: &FilterId) -> Result<bool, SdkError> {
        let removed: bool = self
            .request("eth_uninstallFilter", vec![Value::String(id.0.clone())])
            .await?;
        debug!(filter_id = %id.0, removed, "filter uninstalled");
        Ok(removed)
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("poll_interval", &self.poll_interval)
            .field("subscription_buffer", &self.subscription_buffer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_client() -> (ChainClient, MockTransport) {
        let transport = MockTransport::new();
        (ChainClient::with_transport(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_client_mock_chain_id() {
        let client = ChainClient::new_mock();
        let chain_id = client.chain_id().await.unwrap();
        assert_eq!(chain_id, 1);
    }

    #[tokio::test]
    async fn test_client_fetches_chain_id_when_unset() {
        let (client, transport) = mock_client();
        transport.set_response("eth_chainId", json!("0x539"));
        assert_eq!(client.chain_id().await.unwrap(), 1337);
        assert_eq!(transport.request_count("eth_chainId"), 1);
    }

    #[tokio::test]
    async fn test_client_mock_gas_price() {
        let client = ChainClient::new_mock();
        let gas_price = client.gas_price().await.unwrap();
        assert_eq!(gas_price, U256::from(1_000_000_000u64)); // 1 gwei
    }

    #[tokio::test]
    async fn test_client_mock_block_number() {
        let client = ChainClient::new_mock();
        let block_number = client.block_number().await.unwrap();
        assert_eq!(block_number, 256);
    }

    #[tokio::test]
    async fn test_client_mock_balance() {
        let client = ChainClient::new_mock();
        let balance = client
            .get_balance(&Address::ZERO, BlockId::Latest)
            .await
            .unwrap();
        assert_eq!(balance, U256::from(1_000_000_000_000_000_000u128)); // 1 ETH
    }

    #[tokio::test]
    async fn test_client_mock_nonce() {
        let client = ChainClient::new_mock();
        let nonce = client
            .get_nonce(&Address::ZERO, BlockId::Latest)
            .await
            .unwrap();
        assert_eq!(nonce, 0);
    }

    #[tokio::test]
    async fn test_client_mock_estimate_gas() {
        let client = ChainClient::new_mock();
        let gas = client
            .estimate_gas(&CallRequest::default())
            .await
            .unwrap();
        assert_eq!(gas, 21000);
    }

    #[tokio::test]
    async fn test_client_call_passes_block_tag() {
        let (client, transport) = mock_client();
        transport.set_response("eth_call", json!("0x1234"));
        let result = client
            .call(&CallRequest::default(), BlockId::Number(16))
            .await
            .unwrap();
        assert_eq!(result.as_ref(), &[0x12, 0x34]);
        assert_eq!(transport.requests()[0].params[1], json!("0x10"));
    }

    #[tokio::test]
    async fn test_client_rpc_error_passes_through() {
        let (client, transport) = mock_client();
        transport.fail_next(
            "eth_call",
            SdkError::Rpc {
                code: 3,
                message: "execution reverted".into(),
                data: Some(json!("0x08c379a0")),
            },
        );
        match client.call(&CallRequest::default(), BlockId::Latest).await {
            Err(SdkError::Rpc { code, data, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(data, Some(json!("0x08c379a0")));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_missing_receipt_is_none() {
        let client = ChainClient::new_mock();
        let receipt = client.get_transaction_receipt(&H256::ZERO).await.unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_client_filter_roundtrip() {
        let (client, transport) = mock_client();
        let id = client.new_filter(&Filter::new()).await.unwrap();
        transport.push_log(Log::default());
        assert_eq!(client.get_filter_changes(&id).await.unwrap().len(), 1);
        assert!(client.uninstall_filter(&id).await.unwrap());
        assert!(!client.uninstall_filter(&id).await.unwrap());
    }

    #[test]
    fn test_client_settings_from_config() {
        let config = ClientConfig {
            chain_id: Some(5),
            poll_interval_ms: 50,
            subscription_buffer: 4,
            ..Default::default()
        };
        let client = ChainClient::with_transport(MockTransport::new()).with_settings(&config);
        assert_eq!(client.poll_interval(), Duration::from_millis(50));
        assert_eq!(client.subscription_buffer(), 4);
    }

    #[tokio::test]
    async fn test_client_caches_chain_id_across_clones() {
        let (client, transport) = mock_client();
        let clone = client.clone();
        assert_eq!(client.chain_id().await.unwrap(), 1);
        assert_eq!(clone.chain_id().await.unwrap(), 1);
        assert_eq!(client.chain_id().await.unwrap(), 1);
        assert_eq!(transport.request_count("eth_chainId"), 1);
    }

    #[tokio::test]
    async fn test_client_failed_chain_id_is_not_cached() {
        let (client, transport) = mock_client();
        transport.fail_next("eth_chainId", SdkError::Transport("connection refused".into()));
        assert!(matches!(client.chain_id().await, Err(SdkError::Transport(_))));
        assert_eq!(client.chain_id().await.unwrap(), 1);
        assert_eq!(transport.request_count("eth_chainId"), 2);
    }

    #[tokio::test]
    async fn test_client_configured_chain_id_skips_node() {
        let (client, transport) = mock_client();
        let client = client.with_settings(&ClientConfig {
            chain_id: Some(5),
            ..Default::default()
        });
        assert_eq!(client.chain_id().await.unwrap(), 5);
        assert_eq!(transport.request_count("eth_chainId"), 0);
    }

    #[test]
    fn test_client_settings_raise_zero_values() {
        let config = ClientConfig {
            poll_interval_ms: 0,
            subscription_buffer: 0,
            ..Default::default()
        };
        let client = ChainClient::with_transport(MockTransport::new()).with_settings(&config);
        assert_eq!(client.poll_interval(), MIN_POLL_INTERVAL);
        assert_eq!(client.subscription_buffer(), 1);
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_from_config_validates_first() {
        let config = ClientConfig {
            rpc_url: "http://127.0.0.1:9".to_string(),
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(ChainClient::from_config(&config).await, Err(SdkError::Config(_))));
    }
}
