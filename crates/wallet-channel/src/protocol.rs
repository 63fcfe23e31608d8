//! Wire message types for the wallet frame protocol
//!
//! Every message is a structured payload with a `type` field and an
//! optional `payload`. Responses carry no correlation id from old wallet
//! builds; newer ones echo the `requestId` we attach to each request, and
//! the channel drops terminal messages whose echoed id does not match the
//! exchange in flight.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Outbound
pub const REQUEST_CONNECT: &str = "REQUEST_CONNECT";
pub const REQUEST_SIGN: &str = "REQUEST_SIGN";

// Inbound noise, never settles an exchange
pub const IFRAME_READY: &str = "IFRAME_READY";
pub const RESET_COMPLETE: &str = "RESET_COMPLETE";

// Inbound soft-close
pub const CLOSE_IFRAME: &str = "CLOSE_IFRAME";

// Inbound terminals
pub const RESPONSE_CONNECT: &str = "RESPONSE_CONNECT";
pub const RESPONSE_SIGN: &str = "RESPONSE_SIGN";

/// The remote wallet reports a missing wallet this way; it is not terminal.
pub const ERROR_TYPE_NO_WALLET: &str = "noWallet";

/// Terminal payload of a connect exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectPayload {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Terminal payload of a sign exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignPayload {
    #[serde(default, alias = "hash")]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Classified inbound message
#[derive(Debug)]
pub(crate) enum Inbound {
    Noise(&'static str),
    CloseFrame,
    Connect { payload: ConnectPayload, raw: Value },
    Sign { payload: SignPayload, raw: Value },
    Unknown(String),
}

/// Classify a raw inbound message. `None` for structurally-untyped data
/// (not an object, or no usable `type` field).
pub(crate) fn parse_inbound(data: &Value) -> Option<Inbound> {
    let kind = data.get("type")?.as_str()?;
    if kind.is_empty() {
        return None;
    }
    let payload = data.get("payload").cloned().unwrap_or(Value::Null);

    let inbound = match kind {
        IFRAME_READY => Inbound::Noise(IFRAME_READY),
        RESET_COMPLETE => Inbound::Noise(RESET_COMPLETE),
        CLOSE_IFRAME => Inbound::CloseFrame,
        RESPONSE_CONNECT => match deserialize_payload(&payload) {
            Some(parsed) => Inbound::Connect {
                payload: parsed,
                raw: payload,
            },
            None => Inbound::Unknown(kind.to_string()),
        },
        RESPONSE_SIGN => match deserialize_payload(&payload) {
            Some(parsed) => Inbound::Sign {
                payload: parsed,
                raw: payload,
            },
            None => Inbound::Unknown(kind.to_string()),
        },
        other => Inbound::Unknown(other.to_string()),
    };
    Some(inbound)
}

fn deserialize_payload<T: serde::de::DeserializeOwned + Default>(payload: &Value) -> Option<T> {
    if payload.is_null() {
        return Some(T::default());
    }
    serde_json::from_value(payload.clone()).ok()
}

pub(crate) fn connect_request(request_id: &str) -> Value {
    json!({
        "type": REQUEST_CONNECT,
        "payload": { "requestId": request_id },
    })
}

pub(crate) fn sign_request(request_id: &str, tx_details: &Value) -> Value {
    json!({
        "type": REQUEST_SIGN,
        "payload": {
            "requestId": request_id,
            "txDetails": tx_details,
            "signOnly": false,
        },
    })
}

/// Generate a request id: millisecond timestamp plus a random suffix
pub(crate) fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let random: u32 = rand::random();
    format!("{:x}{:08x}", timestamp, random)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untyped_messages_are_dropped() {
        assert!(parse_inbound(&json!("just a string")).is_none());
        assert!(parse_inbound(&json!({"payload": {"a": 1}})).is_none());
        assert!(parse_inbound(&json!({"type": ""})).is_none());
        assert!(parse_inbound(&json!({"type": 42})).is_none());
    }

    #[test]
    fn test_noise_classification() {
        assert!(matches!(
            parse_inbound(&json!({"type": "IFRAME_READY"})),
            Some(Inbound::Noise(IFRAME_READY))
        ));
        assert!(matches!(
            parse_inbound(&json!({"type": "RESET_COMPLETE"})),
            Some(Inbound::Noise(RESET_COMPLETE))
        ));
        assert!(matches!(
            parse_inbound(&json!({"type": "CLOSE_IFRAME"})),
            Some(Inbound::CloseFrame)
        ));
        assert!(matches!(
            parse_inbound(&json!({"type": "SOMETHING_ELSE"})),
            Some(Inbound::Unknown(_))
        ));
    }

    #[test]
    fn test_sign_payload_hash_alias() {
        let with_tx_hash = parse_inbound(&json!({
            "type": "RESPONSE_SIGN",
            "payload": {"txHash": "0xabc", "blockNumber": 12}
        }));
        let Some(Inbound::Sign { payload, .. }) = with_tx_hash else {
            panic!("expected sign payload");
        };
        assert_eq!(payload.tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(payload.block_number, Some(12));

        let with_hash = parse_inbound(&json!({
            "type": "RESPONSE_SIGN",
            "payload": {"hash": "0xdef"}
        }));
        let Some(Inbound::Sign { payload, .. }) = with_hash else {
            panic!("expected sign payload");
        };
        assert_eq!(payload.tx_hash.as_deref(), Some("0xdef"));
    }

    #[test]
    fn test_terminal_without_payload_parses_empty() {
        let parsed = parse_inbound(&json!({"type": "RESPONSE_CONNECT"}));
        let Some(Inbound::Connect { payload, .. }) = parsed else {
            panic!("expected connect payload");
        };
        assert!(payload.address.is_none());
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_sign_request_shape() {
        let details = json!({"txType": "bridge"});
        let msg = sign_request("req1", &details);
        assert_eq!(msg["type"], "REQUEST_SIGN");
        assert_eq!(msg["payload"]["signOnly"], false);
        assert_eq!(msg["payload"]["requestId"], "req1");
        assert_eq!(msg["payload"]["txDetails"]["txType"], "bridge");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }
}
