//! Signer backed by the remote wallet behind the channel
//!
//! One-phase semantics: the remote counterpart has already confirmed the
//! transaction on-chain by the time it replies, so results come back as
//! settled outcomes and the caller must not wait again.

use std::sync::Arc;

use serde_json::{json, Value};

use pontoon_core::{constants, Address, BridgeCall, ContractAddress, TokenDescriptor, TxHash, TxOutcome};
use wallet_channel::{SignPayload, WalletBridgeChannel};

use crate::error::SignerError;
use crate::BridgeSubmission;

pub struct RemoteSigner {
    address: Address,
    channel: Arc<WalletBridgeChannel>,
}

impl RemoteSigner {
    pub fn new(address: Address, channel: Arc<WalletBridgeChannel>) -> Self {
        Self { address, channel }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// One round trip; the reply carries the confirmed approval.
    pub async fn approve(
        &self,
        token: &TokenDescriptor,
        spender: &ContractAddress,
        amount: u128,
    ) -> Result<TxOutcome, SignerError> {
        let contract = token.contract.as_ref().ok_or(SignerError::ApprovalFailed {
            message: format!("{} is a native asset and needs no approval", token.symbol),
        })?;

        let details = approval_details(&self.address, token, contract, spender, amount);
        let payload = self
            .channel
            .request_sign(details)
            .await
            .map_err(|e| SignerError::ApprovalFailed {
                message: e.to_string(),
            })?;

        settled_outcome(payload)
    }

    /// One round trip; the reply carries the confirmed bridge transaction.
    pub async fn submit_bridge(
        &self,
        token: &TokenDescriptor,
        bridge: &ContractAddress,
        call: &BridgeCall,
    ) -> Result<BridgeSubmission, SignerError> {
        let details = bridge_details(&self.address, token, bridge, call);
        let payload = self
            .channel
            .request_sign(details)
            .await
            .map_err(|e| SignerError::BridgeSubmissionFailed {
                message: e.to_string(),
            })?;

        Ok(BridgeSubmission::Confirmed(settled_outcome(payload)?))
    }
}

fn settled_outcome(payload: SignPayload) -> Result<TxOutcome, SignerError> {
    let hash = payload.tx_hash.ok_or(SignerError::MissingTxHash)?;
    Ok(TxOutcome {
        hash: TxHash::new(hash),
        block_number: payload.block_number,
    })
}

fn approval_details(
    owner: &Address,
    token: &TokenDescriptor,
    contract: &ContractAddress,
    spender: &ContractAddress,
    amount: u128,
) -> Value {
    json!({
        "txType": "approval",
        "ownerAddr": owner.as_str(),
        "actionType": "bridge",
        "isNFT": false,
        "blockchain": token.chain_name,
        "standard": "ERC20",
        "tokenContract": contract.as_str(),
        "spenderContract": spender.as_str(),
        "amount": amount.to_string(),
    })
}

fn bridge_details(
    owner: &Address,
    token: &TokenDescriptor,
    bridge: &ContractAddress,
    call: &BridgeCall,
) -> Value {
    let token_arg = call
        .token
        .as_ref()
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| constants::ZERO_ADDRESS.to_string());

    json!({
        "txType": "bridge",
        "chainName": token.chain_name,
        "standard": "ERC20",
        "contractAddress": bridge.as_str(),
        "ownerAddr": owner.as_str(),
        "args": [
            call.dest_network,
            call.recipient.as_str(),
            call.amount.to_string(),
            token_arg,
            call.force_update,
            call.calldata,
        ],
        "value": "0",
    })
}
