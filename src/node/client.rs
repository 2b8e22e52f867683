//! JSON-RPC node client with multi-endpoint failover

use super::types::{AccountInfo, RpcErrorBody, SubmitResponse, TransactionRecord};
use super::LedgerNode;
use crate::config::NodeConfig;
use crate::error::{RelayerError, RelayerResult};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Error code the node returns when a hash is unknown
const TXN_NOT_FOUND: &str = "txnNotFound";

/// Ledger node client over HTTP JSON-RPC
pub struct NodeClient {
    /// Node configuration
    config: NodeConfig,
    /// Parsed RPC endpoints (multiple for failover)
    endpoints: Vec<Url>,
    /// Current active endpoint index
    current_endpoint: AtomicUsize,
    http: Client,
}

impl NodeClient {
    /// Create a new node client
    pub fn new(config: NodeConfig) -> RelayerResult<Self> {
        let mut endpoints = Vec::new();

        for url in &config.rpc_urls {
            match Url::parse(url) {
                Ok(endpoint) => {
                    debug!("Added RPC endpoint for node {}: {}", config.name, url);
                    endpoints.push(endpoint);
                }
                Err(e) => {
                    warn!("Skipping invalid RPC URL {}: {}", url, e);
                }
            }
        }

        if endpoints.is_empty() {
            return Err(RelayerError::Config(format!(
                "Node {} has no valid RPC URLs",
                config.name
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            endpoints,
            current_endpoint: AtomicUsize::new(0),
            http,
        })
    }

    /// Get the active RPC endpoint
    pub fn endpoint(&self) -> &Url {
        let idx = self.current_endpoint.load(Ordering::Relaxed);
        &self.endpoints[idx % self.endpoints.len()]
    }

    /// Switch to next available endpoint
    pub fn failover(&self) {
        if self.endpoints.len() < 2 {
            return;
        }
        let current = self.current_endpoint.load(Ordering::Relaxed);
        let next = (current + 1) % self.endpoints.len();
        self.current_endpoint.store(next, Ordering::Relaxed);
        warn!("Node {} failover to endpoint {}", self.config.name, next);
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Issue one JSON-RPC call against the active endpoint
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> RelayerResult<T> {
        let body = json!({ "method": method, "params": [params] });
        let rpc_error = |message: String| RelayerError::Rpc {
            method: method.to_string(),
            message,
        };
        let malformed = |message: String| RelayerError::MalformedResponse {
            method: method.to_string(),
            message,
        };

        let response = self
            .http
            .post(self.endpoint().clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| rpc_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rpc_error(format!("HTTP {}", status)));
        }

        let mut envelope: Value = response
            .json()
            .await
            .map_err(|e| malformed(e.to_string()))?;
        let result = envelope
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| malformed("missing result".to_string()))?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let body: RpcErrorBody =
                serde_json::from_value(result).map_err(|e| malformed(e.to_string()))?;
            return Err(RelayerError::Node {
                method: method.to_string(),
                error: body.error,
                message: body.error_message,
            });
        }

        serde_json::from_value(result).map_err(|e| malformed(e.to_string()))
    }

    /// Read-only call that fails over across endpoints on transport errors
    async fn call_with_failover<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> RelayerResult<T> {
        let mut last_error = None;

        for _ in 0..self.endpoints.len() {
            match self.call(method, params.clone()).await {
                Err(e @ RelayerError::Rpc { .. }) => {
                    warn!(
                        "{} failed on node {} ({}): {}",
                        method,
                        self.config.name,
                        self.endpoint(),
                        e
                    );
                    last_error = Some(e);
                    self.failover();
                }
                other => return other,
            }
        }

        Err(last_error.unwrap_or(RelayerError::Rpc {
            method: method.to_string(),
            message: "All endpoints failed".to_string(),
        }))
    }
}

#[async_trait]
impl LedgerNode for NodeClient {
    async fn fetch_sequence(&self, address: &str) -> RelayerResult<u32> {
        let info: AccountInfo = self
            .call_with_failover("account_info", json!({ "account": address }))
            .await?;
        debug!("Fetched sequence {} for {}", info.account_data.sequence, address);
        Ok(info.account_data.sequence)
    }

    async fn fetch_transaction(&self, hash: &str) -> RelayerResult<Option<TransactionRecord>> {
        match self
            .call_with_failover("tx", json!({ "transaction": hash }))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(RelayerError::Node { error, .. }) if error == TXN_NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submit_transaction(&self, blob: &str) -> RelayerResult<SubmitResponse> {
        // No resubmission here: a transport failure is surfaced to the caller as-is.
        let result = self.call("submit", json!({ "tx_blob": blob })).await;
        if let Err(RelayerError::Rpc { .. }) = &result {
            self.failover();
        }
        result
    }

    async fn health_check(&self) -> bool {
        match self
            .call_with_failover::<Value>("server_info", json!({}))
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!("Health check failed for node {}: {}", self.config.name, e);
                false
            }
        }
    }
}
