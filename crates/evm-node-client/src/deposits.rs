//! Deposit history queries against the bridge API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use pontoon_core::Address;

use crate::{EvmNodeClient, NodeError, Result};

/// One bridge deposit as reported by the history API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Bridge network id of the origin chain
    pub orig_net: u32,
    /// Bridge network id of the destination chain
    pub dest_net: u32,
    /// Token contract on the origin chain (zero address for native)
    pub orig_addr: String,
    /// Amount in base units, as a decimal string
    pub amount: String,
    /// Whether the destination side can claim the deposit
    pub ready_for_claim: bool,
    /// Deposit transaction hash on the origin chain
    pub tx_hash: String,
    /// Claim transaction hash on the destination chain, once claimed
    #[serde(default)]
    pub claim_tx_hash: Option<String>,
    /// Bridge-wide deposit index
    pub global_index: String,
    /// Block the deposit was included in
    pub block_num: u64,
}

impl DepositRecord {
    /// A deposit still waiting for its destination-side claim
    pub fn is_pending(&self) -> bool {
        !self.ready_for_claim
    }
}

/// Fetch a page of deposits for `address`, newest first
pub async fn get_deposits(
    client: &EvmNodeClient,
    address: &Address,
    limit: u64,
    offset: u64,
) -> Result<Vec<DepositRecord>> {
    let url = format!(
        "{}/bridges/{}?limit={}&offset={}",
        client.config().history_api_url,
        address.as_str(),
        limit,
        offset
    );

    let body: Value = client.http().get(&url).send().await?.json().await?;

    let deposits = body
        .get("deposits")
        .cloned()
        .ok_or_else(|| NodeError::Parse("history response has no deposits field".to_string()))?;

    serde_json::from_value(deposits).map_err(|e| NodeError::Parse(e.to_string()))
}

/// Keep only deposits still waiting for their claim
pub fn pending_only(deposits: &[DepositRecord]) -> Vec<&DepositRecord> {
    deposits.iter().filter(|d| d.is_pending()).collect()
}
