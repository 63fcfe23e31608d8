//! The locally-injected wallet provider contract
//!
//! Implementations wrap whatever in-process signing capability is
//! available; the session and signer only see this trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use pontoon_core::{Address, BridgeCall, ContractAddress, TxHash};

/// Errors surfaced by a local provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No wallet provider available")]
    Unavailable,

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Provider error: {message}")]
    Other { message: String },
}

/// Provider lifecycle notifications
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// The active account set changed; empty means locked or revoked
    AccountsChanged(Vec<Address>),
    /// The provider dropped the connection
    Disconnected,
}

/// Approval amount requested from the provider.
///
/// The injected wallet approves unlimited spend; the remote wallet approves
/// the exact amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAmount {
    Exact(u128),
    Unlimited,
}

/// A directly-available, in-process signing capability
#[async_trait]
pub trait LocalProvider: Send + Sync {
    /// Prompt the user for account access
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Currently-authorized accounts, without user interaction
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Submit a token approval; returns the pending transaction hash
    async fn send_approval(
        &self,
        token: &ContractAddress,
        spender: &ContractAddress,
        amount: ApprovalAmount,
    ) -> Result<TxHash, ProviderError>;

    /// Submit a bridge call; returns the pending transaction hash
    async fn send_bridge(
        &self,
        bridge: &ContractAddress,
        call: &BridgeCall,
    ) -> Result<TxHash, ProviderError>;

    /// Subscribe to account-change and disconnect notifications
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
