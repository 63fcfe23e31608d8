//! Signer backed by a locally-injected provider
//!
//! Two-phase semantics: submissions return a pending hash, and the caller
//! (or this signer, for approvals) waits for on-chain confirmation
//! separately.

use std::sync::Arc;

use evm_node_client::ChainReader;
use pontoon_core::{Address, BridgeCall, ContractAddress, TokenDescriptor, TxOutcome};

use crate::error::SignerError;
use crate::provider::{ApprovalAmount, LocalProvider};
use crate::BridgeSubmission;

pub struct LocalSigner {
    address: Address,
    provider: Arc<dyn LocalProvider>,
    chain: Arc<dyn ChainReader>,
}

impl LocalSigner {
    pub fn new(address: Address, provider: Arc<dyn LocalProvider>, chain: Arc<dyn ChainReader>) -> Self {
        Self {
            address,
            provider,
            chain,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Submit an approval and wait for its on-chain confirmation.
    pub async fn approve(
        &self,
        token: &TokenDescriptor,
        spender: &ContractAddress,
        _amount: u128,
    ) -> Result<TxOutcome, SignerError> {
        let contract = token.contract.as_ref().ok_or(SignerError::ApprovalFailed {
            message: format!("{} is a native asset and needs no approval", token.symbol),
        })?;

        let hash = self
            .provider
            .send_approval(contract, spender, ApprovalAmount::Unlimited)
            .await
            .map_err(|e| SignerError::ApprovalFailed {
                message: e.to_string(),
            })?;
        tracing::info!(token = %token.symbol, hash = %hash, "approval submitted, waiting for confirmation");

        self.chain
            .wait_for_confirmation(&token.rpc_url, &hash)
            .await
            .map_err(|e| SignerError::ApprovalFailed {
                message: e.to_string(),
            })
    }

    /// Submit the bridge call; confirmation is the caller's to wait for.
    pub async fn submit_bridge(
        &self,
        token: &TokenDescriptor,
        bridge: &ContractAddress,
        call: &BridgeCall,
    ) -> Result<BridgeSubmission, SignerError> {
        let hash = self
            .provider
            .send_bridge(bridge, call)
            .await
            .map_err(|e| SignerError::BridgeSubmissionFailed {
                message: e.to_string(),
            })?;
        tracing::info!(token = %token.symbol, hash = %hash, "bridge call submitted");

        Ok(BridgeSubmission::Pending(hash))
    }
}
