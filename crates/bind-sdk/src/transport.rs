//! Transport layer for RPC communication

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

use bind_primitives::{format_quantity, parse_quantity_u64};

use crate::filter::Filter;
use crate::types::Log;
use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and get JSON response
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError>;
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

/// A request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// RPC method
    pub method: String,
    /// Positional params
    pub params: Vec<Value>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, Value>,
    defaults: HashMap<String, Value>,
    failures: HashMap<String, VecDeque<SdkError>>,
    logs: Vec<Log>,
    filters: HashMap<u64, (Filter, usize)>,
    next_filter_id: u64,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn matching_logs(&self, filter: &Filter, from: usize) -> Result<Value, SdkError> {
        let logs: Vec<&Log> = self.logs[from..]
            .iter()
            .filter(|log| filter.matches(log))
            .collect();
        Ok(serde_json::to_value(logs)?)
    }

    fn serve(&mut self, method: &str, params: &[Value]) -> Option<Result<Value, SdkError>> {
        let result = match method {
            "eth_getLogs" => parse_filter(params).and_then(|filter| self.matching_logs(&filter, 0)),
            "eth_newFilter" => parse_filter(params).map(|filter| {
                self.next_filter_id += 1;
                let id = self.next_filter_id;
                self.filters.insert(id, (filter, self.logs.len()));
                Value::String(format_quantity(id))
            }),
            "eth_getFilterChanges" => parse_filter_id(params).and_then(|id| {
                let (filter, cursor) = self.filters.get(&id).cloned().ok_or_else(|| SdkError::Rpc {
                    code: -32000,
                    message: "filter not found".to_string(),
                    data: None,
                })?;
                let changes = self.matching_logs(&filter, cursor)?;
                let len = self.logs.len();
                if let Some(entry) = self.filters.get_mut(&id) {
                    entry.1 = len;
                }
                Ok(changes)
            }),
            "eth_uninstallFilter" => {
                parse_filter_id(params).map(|id| Value::Bool(self.filters.remove(&id).is_some()))
            }
            _ => return None,
        };
        Some(result)
    }
}

fn parse_filter(params: &[Value]) -> Result<Filter, SdkError> {
    let raw = params
        .first()
        .cloned()
        .ok_or_else(|| SdkError::MissingField("filter".to_string()))?;
    deserialize_response(raw)
}

fn parse_filter_id(params: &[Value]) -> Result<u64, SdkError> {
    let id = params
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| SdkError::MissingField("filter id".to_string()))?;
    Ok(parse_quantity_u64(id)?)
}

/// Mock transport for testing.
///
/// Answers from canned per-method responses, serves `eth_getLogs` and the
/// `eth_*Filter*` family from an in-memory log store, and records every
/// request. Clones share state, so a test can keep a handle after moving a
/// clone into a client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        let mut defaults = HashMap::new();

        defaults.insert("eth_chainId".to_string(), Value::String("0x1".to_string()));
        // 1 gwei
        defaults.insert("eth_gasPrice".to_string(), Value::String("0x3b9aca00".to_string()));
        defaults.insert("eth_blockNumber".to_string(), Value::String("0x100".to_string()));
        // 1 ETH
        defaults.insert(
            "eth_getBalance".to_string(),
            Value::String("0xde0b6b3a7640000".to_string()),
        );
        defaults.insert("eth_getTransactionCount".to_string(), Value::String("0x0".to_string()));
        // 21000
        defaults.insert("eth_estimateGas".to_string(), Value::String("0x5208".to_string()));
        defaults.insert("eth_sendRawTransaction".to_string(), Value::String(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string()
        ));
        defaults.insert("eth_sendTransaction".to_string(), Value::String(
            "0x4e3a3754410177e6937ef1f84bba68ea139e8d1a2258c5f85db9f1cd715a1bdd".to_string()
        ));
        defaults.insert("eth_getTransactionReceipt".to_string(), Value::Null);
        defaults.insert("eth_call".to_string(), Value::String("0x".to_string()));
        defaults.insert("eth_getCode".to_string(), Value::String("0x".to_string()));

        Self {
            state: Arc::new(Mutex::new(MockState {
                defaults,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // Poisoning means another test thread panicked mid-update
        self.state.lock().expect("MockTransport mutex poisoned")
    }

    /// Set a mock response for a specific method
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned, which only happens if another thread panicked while
    /// holding the lock.
    pub fn set_response(&self, method: &str, response: Value) {
        self.lock().responses.insert(method.to_string(), response);
    }

    /// Clear custom responses
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn clear_responses(&self) {
        self.lock().responses.clear();
    }

    /// Fail the next request for `method` with `error`. Queued errors are
    /// used up in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn fail_next(&self, method: &str, error: SdkError) {
        self.lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    /// Append a log to the in-memory chain. Installed filters see it on
    /// their next `eth_getFilterChanges`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn push_log(&self, log: Log) {
        self.lock().logs.push(log);
    }

    /// Number of installed filters
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn installed_filters(&self) -> usize {
        self.lock().filters.len()
    }

    /// Every request seen so far, oldest first
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// How many times `method` was requested
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn request_count(&self, method: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SdkError::Transport("MockTransport mutex poisoned".to_string()))?;

        trace!(method, "mock rpc request");
        state.requests.push(RecordedRequest {
            method: method.to_string(),
            params: params.clone(),
        });

        if let Some(error) = state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        if let Some(response) = state.responses.get(method).cloned() {
            return Ok(response);
        }

        if let Some(result) = state.serve(method, &params) {
            return result;
        }

        if let Some(response) = state.defaults.get(method).cloned() {
            return Ok(response);
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        })
    }
}

/// HTTP transport for real RPC communication
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Create a transport whose requests fail after `timeout`
    pub fn with_timeout(url: &str, timeout: std::time::Duration) -> Result<Self, SdkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, SdkError> {
        let id = self.next_id();
        trace!(id, method, "sending rpc request");

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SdkError::Timeout(format!("{} ({})", method, e))
                } else {
                    SdkError::Transport(e.to_string())
                }
            })?;

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        if let Some(error) = response.error {
            trace!(id, code = error.code, "rpc error response");
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }

        // A null result (e.g. a missing receipt) is a valid answer
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}
