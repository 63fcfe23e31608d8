//! Balance, allowance and receipt queries

use serde_json::{json, Value};
use std::time::{Duration, Instant};

use pontoon_core::units::format_units;
use pontoon_core::{Address, ChainId, ContractAddress, TokenDescriptor, TxHash, TxOutcome};

use crate::{EvmNodeClient, NodeError, Result};

/// `balanceOf(address)` function selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// A mined transaction receipt, reduced to the fields we read
#[derive(Debug, Clone)]
pub struct Receipt {
    pub block_number: u64,
    pub gas_used: u128,
    pub effective_gas_price: u128,
}

/// Issue a JSON-RPC call and unwrap the `result` field
pub(crate) async fn rpc(
    client: &EvmNodeClient,
    rpc_url: &str,
    method: &str,
    params: Value,
) -> Result<Value> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response: Value = client
        .http()
        .post(rpc_url)
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown RPC error")
            .to_string();
        return Err(NodeError::Rpc { message });
    }

    response
        .get("result")
        .cloned()
        .ok_or_else(|| NodeError::Parse("RPC response has no result field".to_string()))
}

/// Balance of `address` in `token`, formatted at the token's decimals.
///
/// Native assets use `eth_getBalance`; contract tokens an `eth_call` to
/// `balanceOf`.
pub async fn token_balance(
    client: &EvmNodeClient,
    token: &TokenDescriptor,
    address: &Address,
) -> Result<String> {
    let raw = match &token.contract {
        None => rpc(
            client,
            &token.rpc_url,
            "eth_getBalance",
            json!([address.as_str(), "latest"]),
        )
        .await?,
        Some(contract) => {
            let data = encode_call(BALANCE_OF_SELECTOR, &[address.as_str()])?;
            rpc(
                client,
                &token.rpc_url,
                "eth_call",
                json!([{"to": contract.as_str(), "data": data}, "latest"]),
            )
            .await?
        }
    };

    let base = parse_hex_quantity(&raw)?;
    Ok(format_units(base, token.decimals))
}

/// Allowance of `spender` over `owner`'s tokens, via the bridge REST API.
///
/// Returns the raw base-units decimal string.
pub async fn allowance(
    client: &EvmNodeClient,
    token: &ContractAddress,
    owner: &Address,
    spender: &ContractAddress,
    chain_id: ChainId,
) -> Result<String> {
    let url = format!("{}/token/allowance", client.config().bridge_api_url);
    let chain = chain_id.to_string();
    let response = client
        .http()
        .get(&url)
        .query(&[
            ("token", token.as_str()),
            ("owner", owner.as_str()),
            ("spender", spender.as_str()),
            ("chainId", chain.as_str()),
        ])
        .send()
        .await?;

    let body: Value = response.json().await?;
    if let Some(error) = body.get("error").and_then(|e| e.as_str()) {
        return Err(NodeError::Api {
            message: error.to_string(),
        });
    }

    match body.get("data") {
        Some(Value::String(raw)) => Ok(raw.clone()),
        Some(Value::Number(raw)) => Ok(raw.to_string()),
        _ => Err(NodeError::Parse(
            "allowance response has no data field".to_string(),
        )),
    }
}

/// Fetch the receipt of a mined transaction, `None` while pending
pub async fn transaction_receipt(
    client: &EvmNodeClient,
    rpc_url: &str,
    hash: &TxHash,
) -> Result<Option<Receipt>> {
    let result = rpc(
        client,
        rpc_url,
        "eth_getTransactionReceipt",
        json!([hash.as_str()]),
    )
    .await?;

    if result.is_null() {
        return Ok(None);
    }

    let block_number = match result.get("blockNumber") {
        Some(Value::String(s)) => hex_to_u128(s)? as u64,
        // Receipt exists but is not yet in a block.
        _ => return Ok(None),
    };
    let gas_used = result
        .get("gasUsed")
        .and_then(|v| v.as_str())
        .map(hex_to_u128)
        .transpose()?
        .unwrap_or(0);
    let effective_gas_price = result
        .get("effectiveGasPrice")
        .and_then(|v| v.as_str())
        .map(hex_to_u128)
        .transpose()?
        .unwrap_or(0);

    Ok(Some(Receipt {
        block_number,
        gas_used,
        effective_gas_price,
    }))
}

/// Poll for a transaction's inclusion until the configured timeout
pub async fn wait_for_confirmation(
    client: &EvmNodeClient,
    rpc_url: &str,
    hash: &TxHash,
) -> Result<TxOutcome> {
    let started = Instant::now();
    let timeout = Duration::from_secs(client.config().confirmation_timeout_secs);
    let interval = Duration::from_millis(client.config().poll_interval_ms);

    loop {
        match transaction_receipt(client, rpc_url, hash).await {
            Ok(Some(receipt)) => {
                tracing::info!(hash = %hash, block = receipt.block_number, "transaction confirmed");
                return Ok(TxOutcome {
                    hash: hash.clone(),
                    block_number: Some(receipt.block_number),
                });
            }
            Ok(None) => {}
            // Transient node errors do not abort the wait.
            Err(e) => tracing::warn!(hash = %hash, "receipt poll failed: {}", e),
        }

        if started.elapsed() > timeout {
            return Err(NodeError::ConfirmationTimeout {
                hash: hash.to_string(),
                secs: client.config().confirmation_timeout_secs,
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// Total fee paid by a mined transaction (gasUsed × effectiveGasPrice),
/// formatted in native units. Used for history detail display.
pub async fn transaction_fee(
    client: &EvmNodeClient,
    rpc_url: &str,
    hash: &TxHash,
) -> Result<Option<String>> {
    let receipt = transaction_receipt(client, rpc_url, hash).await?;
    Ok(receipt.map(|r| {
        let fee = r.gas_used.saturating_mul(r.effective_gas_price);
        format_units(fee, pontoon_core::constants::NATIVE_DECIMALS)
    }))
}

/// Encode a contract call: selector plus 32-byte-padded address arguments
pub(crate) fn encode_call(selector: &str, address_args: &[&str]) -> Result<String> {
    let mut data = format!("0x{}", selector);
    for arg in address_args {
        let stripped = arg.strip_prefix("0x").unwrap_or(arg);
        if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NodeError::Parse(format!("invalid address argument: {}", arg)));
        }
        data.push_str(&"0".repeat(24));
        data.push_str(&stripped.to_lowercase());
    }
    Ok(data)
}

fn parse_hex_quantity(value: &Value) -> Result<u128> {
    match value.as_str() {
        Some(s) => hex_to_u128(s),
        None => Err(NodeError::Parse(format!(
            "expected hex quantity, got {}",
            value
        ))),
    }
}

fn hex_to_u128(input: &str) -> Result<u128> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    if stripped.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(stripped, 16)
        .map_err(|e| NodeError::Parse(format!("invalid hex quantity {}: {}", input, e)))
}
