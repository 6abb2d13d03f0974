//! JSON-RPC client for the local chain
//!
//! Only the handful of calls the runner needs: the node's accounts and its
//! client version string.

use crate::error::{CoverageError, CoverageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// Error object returned by the node
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// Node metadata gathered right after startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Raw `web3_clientVersion` string
    pub client_version: String,
    /// Unlocked accounts
    pub accounts: Vec<String>,
}

/// JSON-RPC client for an Ethereum-style node
#[derive(Debug)]
pub struct RpcClient {
    endpoint: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self::with_client(endpoint, client)
    }

    /// Create a client with a custom reqwest client
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call a method and decode its result
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> CoverageResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        tracing::debug!(endpoint = %self.endpoint, method, "rpc call");

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoverageError::rpc(method, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoverageError::rpc(method, format!("HTTP {status}: {body}")));
        }

        let response: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| CoverageError::rpc(method, format!("invalid response: {e}")))?;
        decode(method, response)
    }

    /// `eth_accounts`
    pub async fn accounts(&self) -> CoverageResult<Vec<String>> {
        self.call("eth_accounts", Value::Array(Vec::new())).await
    }

    /// `web3_clientVersion`
    pub async fn client_version(&self) -> CoverageResult<String> {
        self.call("web3_clientVersion", Value::Array(Vec::new()))
            .await
    }

    /// Fetch client version and accounts
    pub async fn node_info(&self) -> CoverageResult<NodeInfo> {
        let client_version = self.client_version().await?;
        let accounts = self.accounts().await?;
        Ok(NodeInfo {
            client_version,
            accounts,
        })
    }
}

fn decode<T>(method: &str, response: RpcResponse<T>) -> CoverageResult<T> {
    if let Some(error) = response.error {
        return Err(CoverageError::rpc(
            method,
            format!("{} (code {})", error.message, error.code),
        ));
    }
    response
        .result
        .ok_or_else(|| CoverageError::rpc(method, "response has neither result nor error"))
}
