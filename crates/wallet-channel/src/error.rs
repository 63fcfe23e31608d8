//! Error types for wallet channel exchanges

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The frame is unmounted or its content has not finished loading
    #[error("Wallet frame is not ready")]
    NotReady,

    /// Another exchange is already in flight on this channel
    #[error("A wallet exchange is already in flight")]
    Busy,

    /// The user dismissed the wallet surface before connecting
    #[error("User cancelled the request")]
    Cancelled,

    /// The remote wallet settled the exchange with an error payload
    #[error("Remote wallet error: {payload}")]
    Remote { payload: serde_json::Value },
}
