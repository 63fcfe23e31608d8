//! Error types for signer operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// Approval could not be submitted or confirmed
    #[error("Approval failed: {message}")]
    ApprovalFailed { message: String },

    /// Bridge call could not be submitted
    #[error("Bridge submission failed: {message}")]
    BridgeSubmissionFailed { message: String },

    /// The remote wallet settled without a transaction identifier
    #[error("Remote wallet did not return a transaction hash")]
    MissingTxHash,
}
