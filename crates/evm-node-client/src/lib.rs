//! evm-node-client: Thin query layer over chain JSON-RPC and the bridge API
//!
//! Provides the collaborator calls the bridge workflow depends on: token
//! balances, allowances, receipt polling for confirmation waits, deposit
//! history, and per-transaction fee lookups. All queries are exposed behind
//! the [`ChainReader`] trait so callers can substitute fakes.

pub mod deposits;
pub mod queries;

use async_trait::async_trait;
use thiserror::Error;

use pontoon_core::{Address, ChainId, ContractAddress, TokenDescriptor, TxHash, TxOutcome};

pub use deposits::DepositRecord;
pub use queries::Receipt;

/// Node connection and query errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {message}")]
    Rpc { message: String },

    #[error("Bridge API error: {message}")]
    Api { message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Transaction {hash} not confirmed within {secs}s")]
    ConfirmationTimeout { hash: String, secs: u64 },
}

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Query configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Base URL of the bridge REST API (allowance queries)
    pub bridge_api_url: String,
    /// Base URL of the deposit history API
    pub history_api_url: String,
    /// Receipt polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Give up waiting for a confirmation after this many seconds
    pub confirmation_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bridge_api_url: "https://api.pontoon.network".to_string(),
            history_api_url: "https://bridge-rpc.pontoon.network".to_string(),
            poll_interval_ms: 5_000,
            confirmation_timeout_secs: 600,
        }
    }
}

/// Read-side chain queries the workflow and local signer depend on
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Balance of `address` in `token`, formatted at the token's decimals
    async fn token_balance(&self, token: &TokenDescriptor, address: &Address) -> Result<String>;

    /// Current allowance of `spender` over `owner`'s tokens, as a raw
    /// base-units decimal string
    async fn allowance(
        &self,
        token: &ContractAddress,
        owner: &Address,
        spender: &ContractAddress,
        chain_id: ChainId,
    ) -> Result<String>;

    /// Poll until the transaction is included in a block
    async fn wait_for_confirmation(&self, rpc_url: &str, hash: &TxHash) -> Result<TxOutcome>;
}

/// HTTP-backed chain query client
#[derive(Clone)]
pub struct EvmNodeClient {
    http: reqwest::Client,
    config: NodeConfig,
}

impl EvmNodeClient {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl ChainReader for EvmNodeClient {
    async fn token_balance(&self, token: &TokenDescriptor, address: &Address) -> Result<String> {
        queries::token_balance(self, token, address).await
    }

    async fn allowance(
        &self,
        token: &ContractAddress,
        owner: &Address,
        spender: &ContractAddress,
        chain_id: ChainId,
    ) -> Result<String> {
        queries::allowance(self, token, owner, spender, chain_id).await
    }

    async fn wait_for_confirmation(&self, rpc_url: &str, hash: &TxHash) -> Result<TxOutcome> {
        queries::wait_for_confirmation(self, rpc_url, hash).await
    }
}
