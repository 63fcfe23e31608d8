//! Single-slot request/response channel over the wallet frame
//!
//! One logical exchange at a time: a typed request goes out, the frame
//! surface is shown, and inbound messages are filtered until the exchange's
//! terminal type settles it. Rules applied to every inbound message:
//!
//! 1. Messages whose origin is not the configured wallet origin are dropped.
//! 2. Untyped messages and the noise types (`IFRAME_READY`,
//!    `RESET_COMPLETE`) never settle an exchange.
//! 3. `CLOSE_IFRAME` hides the surface. During a sign exchange the
//!    underlying transaction continues in the background, so the exchange
//!    stays pending; during a connect exchange there is nothing to
//!    continue, so it settles as cancelled.
//! 4. `RESPONSE_CONNECT` / `RESPONSE_SIGN` settle their exchange: success
//!    without an error field, failure with one. The exception is the
//!    `noWallet` soft-failure on connect, which keeps the surface open so
//!    the user can install a wallet and retry within the same exchange.
//! 5. The per-exchange subscription is dropped before the result is
//!    returned, so a late settlement can never leak into a later exchange.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;

use crate::error::ChannelError;
use crate::frame::{FrameEvent, WalletFrame};
use crate::protocol::{
    self, ConnectPayload, Inbound, SignPayload, ERROR_TYPE_NO_WALLET,
};

/// Request/response channel over the embedded wallet frame
pub struct WalletBridgeChannel {
    frame: WalletFrame,
    slot: Mutex<()>,
}

impl WalletBridgeChannel {
    pub fn new(frame: WalletFrame) -> Self {
        Self {
            frame,
            slot: Mutex::new(()),
        }
    }

    pub fn frame(&self) -> &WalletFrame {
        &self.frame
    }

    /// Ask the remote wallet for its account address.
    pub async fn request_connect(&self) -> Result<ConnectPayload, ChannelError> {
        let _slot = self.slot.try_lock().map_err(|_| ChannelError::Busy)?;
        let request_id = protocol::generate_request_id();

        let mut events = self.frame.subscribe();
        self.frame.send(protocol::connect_request(&request_id))?;
        self.frame.show();
        tracing::info!(%request_id, "connect exchange started");

        let result = loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "inbound event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => break Err(ChannelError::NotReady),
            };
            let Some(inbound) = self.screen(event) else {
                continue;
            };

            match inbound {
                Inbound::Noise(kind) => tracing::debug!(kind, "noise during connect exchange"),
                Inbound::CloseFrame => {
                    // Connect has no on-chain side effect to continue.
                    break Err(ChannelError::Cancelled);
                }
                Inbound::Connect { payload, raw } => {
                    if payload.error_type.as_deref() == Some(ERROR_TYPE_NO_WALLET) {
                        tracing::warn!("no wallet on the remote side, keeping the frame open");
                        continue;
                    }
                    if is_stale(payload.request_id.as_deref(), &request_id) {
                        continue;
                    }
                    if payload.error.is_some() {
                        break Err(ChannelError::Remote { payload: raw });
                    }
                    break Ok(payload);
                }
                Inbound::Sign { .. } => {
                    tracing::debug!("unsolicited sign response during connect exchange")
                }
                Inbound::Unknown(kind) => tracing::debug!(%kind, "unknown message type"),
            }
        };

        // Settlement: stop listening before anyone can observe the result.
        drop(events);
        self.frame.hide();
        tracing::info!(%request_id, ok = result.is_ok(), "connect exchange settled");
        result
    }

    /// Ask the remote wallet to sign and submit a transaction.
    ///
    /// The wallet has already confirmed the transaction on-chain by the
    /// time it replies; this call returns the confirmed payload.
    pub async fn request_sign(
        &self,
        tx_details: serde_json::Value,
    ) -> Result<SignPayload, ChannelError> {
        let _slot = self.slot.try_lock().map_err(|_| ChannelError::Busy)?;
        let request_id = protocol::generate_request_id();

        let mut events = self.frame.subscribe();
        self.frame.send(protocol::sign_request(&request_id, &tx_details))?;
        self.frame.show();
        tracing::info!(%request_id, "sign exchange started");

        let result = loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "inbound event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => break Err(ChannelError::NotReady),
            };
            let Some(inbound) = self.screen(event) else {
                continue;
            };

            match inbound {
                Inbound::Noise(kind) => tracing::debug!(kind, "noise during sign exchange"),
                Inbound::CloseFrame => {
                    // The wallet hid its UI; the transaction continues in
                    // the background. The exchange stays pending.
                    self.frame.hide();
                }
                Inbound::Sign { payload, raw } => {
                    if is_stale(payload.request_id.as_deref(), &request_id) {
                        continue;
                    }
                    if payload.error.is_some() {
                        break Err(ChannelError::Remote { payload: raw });
                    }
                    break Ok(payload);
                }
                Inbound::Connect { .. } => {
                    tracing::debug!("unsolicited connect response during sign exchange")
                }
                Inbound::Unknown(kind) => tracing::debug!(%kind, "unknown message type"),
            }
        };

        drop(events);
        self.frame.hide();
        tracing::info!(%request_id, ok = result.is_ok(), "sign exchange settled");
        result
    }

    /// Origin filter and structural parse. `None` drops the event.
    fn screen(&self, event: FrameEvent) -> Option<Inbound> {
        if event.origin != self.frame.wallet_origin() {
            tracing::warn!(origin = %event.origin, "dropped message from untrusted origin");
            return None;
        }
        match protocol::parse_inbound(&event.data) {
            Some(inbound) => Some(inbound),
            None => {
                tracing::debug!("dropped untyped message");
                None
            }
        }
    }
}

/// A terminal that echoes a different exchange's id is a stale settlement.
fn is_stale(echoed: Option<&str>, current: &str) -> bool {
    match echoed {
        Some(id) if id != current => {
            tracing::debug!(echoed = id, current, "dropped stale terminal message");
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameConfig, FrameHost, FrameWindow};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const WALLET_ORIGIN: &str = "https://wallet.test";

    fn setup() -> (Arc<WalletBridgeChannel>, FrameWindow) {
        let host = FrameHost::new();
        let frame = host.mount(FrameConfig {
            wallet_origin: WALLET_ORIGIN.to_string(),
            wallet_url: format!("{}/connector/wallet", WALLET_ORIGIN),
        });
        let window = host.take_window().unwrap();
        window.notify_loaded();
        (Arc::new(WalletBridgeChannel::new(frame)), window)
    }

    async fn settle_window() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    fn sign_response(hash: &str, block: u64) -> serde_json::Value {
        json!({
            "type": "RESPONSE_SIGN",
            "payload": {"txHash": hash, "blockNumber": block}
        })
    }

    #[tokio::test]
    async fn test_noise_leaves_sign_exchange_pending() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;

        window.post(WALLET_ORIGIN, json!({"type": "IFRAME_READY"}));
        window.post(WALLET_ORIGIN, json!({"type": "RESET_COMPLETE"}));
        window.post(WALLET_ORIGIN, json!({"no": "type"}));
        window.post(WALLET_ORIGIN, json!({"type": "SOME_FUTURE_TYPE"}));
        settle_window().await;
        assert!(!task.is_finished());

        window.post(WALLET_ORIGIN, sign_response("0xabc", 7));
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.tx_hash.as_deref(), Some("0xabc"));
        assert_eq!(payload.block_number, Some(7));
    }

    #[tokio::test]
    async fn test_untrusted_origin_is_inert() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;

        // A perfect terminal message from the wrong origin must not settle.
        window.post("https://evil.test", sign_response("0xbad", 1));
        window.post("https://evil.test", json!({"type": "CLOSE_IFRAME"}));
        settle_window().await;
        assert!(!task.is_finished());
        assert!(channel.frame().is_visible());

        window.post(WALLET_ORIGIN, sign_response("0xabc", 2));
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.tx_hash.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn test_soft_close_hides_without_settling_sign() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;
        assert!(channel.frame().is_visible());

        window.post(WALLET_ORIGIN, json!({"type": "CLOSE_IFRAME"}));
        settle_window().await;
        assert!(!channel.frame().is_visible());
        assert!(!task.is_finished());

        // The transaction kept running remotely; its terminal still settles.
        window.post(WALLET_ORIGIN, sign_response("0xabc", 42));
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.block_number, Some(42));
    }

    #[tokio::test]
    async fn test_soft_close_during_connect_cancels() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_connect().await }
        });
        settle_window().await;

        window.post(WALLET_ORIGIN, json!({"type": "CLOSE_IFRAME"}));
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, ChannelError::Cancelled));
        assert!(!channel.frame().is_visible());
    }

    #[tokio::test]
    async fn test_no_wallet_soft_failure_keeps_connect_pending() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_connect().await }
        });
        settle_window().await;

        window.post(
            WALLET_ORIGIN,
            json!({"type": "RESPONSE_CONNECT", "payload": {"errorType": "noWallet"}}),
        );
        settle_window().await;
        assert!(!task.is_finished());
        // The surface stays open so the user can resolve the precondition.
        assert!(channel.frame().is_visible());

        window.post(
            WALLET_ORIGIN,
            json!({"type": "RESPONSE_CONNECT", "payload": {"address": "0xabcdef"}}),
        );
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.address.as_deref(), Some("0xabcdef"));
        assert!(!channel.frame().is_visible());
    }

    #[tokio::test]
    async fn test_remote_error_settles_with_payload() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "approval"})).await }
        });
        settle_window().await;

        window.post(
            WALLET_ORIGIN,
            json!({"type": "RESPONSE_SIGN", "payload": {"error": "user rejected"}}),
        );
        let err = task.await.unwrap().unwrap_err();
        let ChannelError::Remote { payload } = err else {
            panic!("expected remote error");
        };
        assert_eq!(payload["error"], "user rejected");
    }

    #[tokio::test]
    async fn test_second_exchange_while_pending_is_rejected() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;

        let err = channel.request_connect().await.unwrap_err();
        assert!(matches!(err, ChannelError::Busy));

        window.post(WALLET_ORIGIN, sign_response("0xabc", 1));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_not_ready_before_frame_load() {
        let host = FrameHost::new();
        let frame = host.mount(FrameConfig {
            wallet_origin: WALLET_ORIGIN.to_string(),
            wallet_url: format!("{}/connector/wallet", WALLET_ORIGIN),
        });
        let _window = host.take_window().unwrap();
        let channel = WalletBridgeChannel::new(frame);

        let err = channel.request_connect().await.unwrap_err();
        assert!(matches!(err, ChannelError::NotReady));
    }

    #[tokio::test]
    async fn test_stale_request_id_is_dropped() {
        let (channel, mut window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });

        let outbound = window.recv().await.unwrap();
        let current_id = outbound["payload"]["requestId"].as_str().unwrap().to_string();

        window.post(
            WALLET_ORIGIN,
            json!({
                "type": "RESPONSE_SIGN",
                "payload": {"txHash": "0xstale", "requestId": "deadbeef00000000"}
            }),
        );
        settle_window().await;
        assert!(!task.is_finished());

        window.post(
            WALLET_ORIGIN,
            json!({
                "type": "RESPONSE_SIGN",
                "payload": {"txHash": "0xabc", "requestId": current_id}
            }),
        );
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.tx_hash.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn test_settled_exchange_does_not_leak_into_next() {
        let (channel, window) = setup();
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;
        window.post(WALLET_ORIGIN, sign_response("0xfirst", 1));
        task.await.unwrap().unwrap();

        // A duplicate terminal for the settled exchange arrives late...
        window.post(WALLET_ORIGIN, sign_response("0xduplicate", 1));

        // ...and the next exchange still sees only its own terminal.
        let task = tokio::spawn({
            let channel = channel.clone();
            async move { channel.request_sign(json!({"txType": "bridge"})).await }
        });
        settle_window().await;
        assert!(!task.is_finished());
        window.post(WALLET_ORIGIN, sign_response("0xsecond", 2));
        let payload = task.await.unwrap().unwrap();
        assert_eq!(payload.tx_hash.as_deref(), Some("0xsecond"));
    }
}
