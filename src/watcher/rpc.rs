//! Minimal JSON-RPC client for the node provider.
//!
//! Only the two calls the watcher needs are implemented: `eth_blockNumber`
//! and `eth_getLogs` filtered on the relayed contract and event topic.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Network;
use super::decode::{PATHZ_CHOOSED_TOPIC, parse_quantity};
use crate::error::RelayError;

/// Timeout applied to every node provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Emitting contract.
    pub address: String,
    /// Hex-encoded topics; `topics[0]` is the event signature hash.
    pub topics: Vec<String>,
    /// Hex-encoded ABI data of the non-indexed fields.
    pub data: String,
    /// Hex quantity of the containing block.
    pub block_number: String,
    /// Hex quantity of the log's position in the block.
    #[serde(default)]
    pub log_index: Option<String>,
    /// Set when the log was dropped by a chain reorganization.
    #[serde(default)]
    pub removed: bool,
}

/// Source of chain head numbers and contract logs.
///
/// Implemented by [`RpcClient`] in production and by in-memory fakes in
/// tests.
pub trait LogSource: Send + Sync {
    /// Returns the latest block number.
    fn latest_block(&self) -> impl Future<Output = Result<u64, RelayError>> + Send;

    /// Returns the relayed event's logs in `from..=to`, in chain order.
    fn logs(
        &self,
        from: u64,
        to: u64,
    ) -> impl Future<Output = Result<Vec<RawLog>, RelayError>> + Send;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogFilter<'a> {
    address: &'a str,
    topics: [&'static str; 1],
    from_block: String,
    to_block: String,
}

/// JSON-RPC client bound to one network and one contract.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    network: Network,
    contract_address: String,
    next_id: AtomicU64,
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL embeds the API key.
        f.debug_struct("RpcClient")
            .field("network", &self.network)
            .field("contract_address", &self.contract_address)
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Creates a client for `network` using the Alchemy `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Upstream`] if the HTTP client cannot be built.
    pub fn new(
        network: Network,
        api_key: &str,
        contract_address: impl Into<String>,
    ) -> Result<Self, RelayError> {
        Self::with_url(network.rpc_url(api_key), network, contract_address)
    }

    /// Creates a client against an explicit endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Upstream`] if the HTTP client cannot be built.
    pub fn with_url(
        url: impl Into<String>,
        network: Network,
        contract_address: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            network,
            contract_address: contract_address.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Returns the network this client talks to.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, RelayError>
    where
        P: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        into_result(response)
    }
}

fn into_result<T>(response: RpcResponse<T>) -> Result<T, RelayError> {
    if let Some(err) = response.error {
        return Err(RelayError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    response
        .result
        .ok_or_else(|| RelayError::Decode("rpc response has neither result nor error".to_string()))
}

impl LogSource for RpcClient {
    async fn latest_block(&self) -> Result<u64, RelayError> {
        let head: String = self.call("eth_blockNumber", [(); 0]).await?;
        parse_quantity(&head)
    }

    async fn logs(&self, from: u64, to: u64) -> Result<Vec<RawLog>, RelayError> {
        let filter = LogFilter {
            address: &self.contract_address,
            topics: [PATHZ_CHOOSED_TOPIC],
            from_block: format!("{from:#x}"),
            to_block: format!("{to:#x}"),
        };
        self.call("eth_getLogs", [filter]).await
    }
}
