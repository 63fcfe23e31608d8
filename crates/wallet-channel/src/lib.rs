//! Wallet Channel
//!
//! Message-passing plumbing for the embedded remote wallet:
//! - Frame transport: lifecycle and visibility of the embedded wallet
//!   surface, raw outbound posting and an inbound `(origin, data)` stream.
//! - Request/response channel: one logical exchange at a time over the
//!   transport, with origin filtering, noise tolerance and soft-close
//!   handling.
//!
//! The channel imposes no timeout: legitimate remote confirmations may take
//! arbitrarily long, so callers needing one must layer it externally.

pub mod channel;
pub mod error;
pub mod frame;
pub mod protocol;

pub use channel::WalletBridgeChannel;
pub use error::ChannelError;
pub use frame::{FrameConfig, FrameEvent, FrameHost, FrameWindow, WalletFrame};
pub use protocol::{ConnectPayload, SignPayload};
