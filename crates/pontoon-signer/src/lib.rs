//! Pontoon signer abstraction
//!
//! Two interchangeable signing backends behind one capability set, so the
//! bridge workflow never branches on where signatures come from:
//!
//! - [`LocalSigner`]: an injected in-process provider. Submissions return a
//!   pending hash; confirmation is a separate wait.
//! - [`RemoteSigner`]: the sandboxed wallet behind the message channel. Its
//!   replies are already confirmed on-chain; waiting again would hang.
//!
//! Both converge to the same terminal result shape ([`TxOutcome`]); the
//! asymmetry surfaces only through [`BridgeSubmission`], which tells the
//! caller whether a confirmation wait is still owed.

pub mod error;
pub mod local;
pub mod provider;
pub mod remote;

use pontoon_core::{Address, BridgeCall, ContractAddress, SignerVariant, TokenDescriptor, TxHash, TxOutcome};

pub use error::SignerError;
pub use local::LocalSigner;
pub use provider::{ApprovalAmount, LocalProvider, ProviderError, ProviderEvent};
pub use remote::RemoteSigner;

/// Result of a bridge submission
#[derive(Debug, Clone)]
pub enum BridgeSubmission {
    /// Submitted; the caller must wait for confirmation
    Pending(TxHash),
    /// Already confirmed on-chain by the remote wallet
    Confirmed(TxOutcome),
}

/// The active signing backend
pub enum Signer {
    Local(LocalSigner),
    Remote(RemoteSigner),
}

impl Signer {
    pub fn address(&self) -> &Address {
        match self {
            Self::Local(signer) => signer.address(),
            Self::Remote(signer) => signer.address(),
        }
    }

    pub fn variant(&self) -> SignerVariant {
        match self {
            Self::Local(_) => SignerVariant::Local,
            Self::Remote(_) => SignerVariant::Remote,
        }
    }

    /// Grant the bridge contract spending rights over `token`.
    ///
    /// Returns only once the approval is confirmed on-chain, whichever
    /// backend carried it.
    pub async fn approve(
        &self,
        token: &TokenDescriptor,
        spender: &ContractAddress,
        amount: u128,
    ) -> Result<TxOutcome, SignerError> {
        match self {
            Self::Local(signer) => signer.approve(token, spender, amount).await,
            Self::Remote(signer) => signer.approve(token, spender, amount).await,
        }
    }

    /// Submit the bridge call.
    pub async fn submit_bridge(
        &self,
        token: &TokenDescriptor,
        bridge: &ContractAddress,
        call: &BridgeCall,
    ) -> Result<BridgeSubmission, SignerError> {
        match self {
            Self::Local(signer) => signer.submit_bridge(token, bridge, call).await,
            Self::Remote(signer) => signer.submit_bridge(token, bridge, call).await,
        }
    }
}
