//! Core type definitions for Pontoon

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

/// Account address (0x-prefixed, 20 bytes hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shorten for display: `0x1234...abcdef`
    pub fn shortened(&self) -> String {
        shorten_address(&self.0, 6)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token contract address (0x-prefixed, 20 bytes hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(pub String);

impl ContractAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (0x-prefixed, 32 bytes hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain identifier (EIP-155 numeric id)
pub type ChainId = u64;

/// Which signing backend a wallet identity is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerVariant {
    None,
    Local,
    Remote,
}

impl SignerVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for SignerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is connected and how.
///
/// Fields are private so the address-iff-connected invariant cannot be
/// broken from outside: the address is `Some` exactly when the variant is
/// not [`SignerVariant::None`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletIdentity {
    address: Option<Address>,
    variant: SignerVariant,
}

impl WalletIdentity {
    /// The disconnected identity
    pub fn none() -> Self {
        Self {
            address: None,
            variant: SignerVariant::None,
        }
    }

    /// Identity backed by a locally-injected provider
    pub fn local(address: Address) -> Self {
        Self {
            address: Some(address),
            variant: SignerVariant::Local,
        }
    }

    /// Identity backed by the remote wallet
    pub fn remote(address: Address) -> Self {
        Self {
            address: Some(address),
            variant: SignerVariant::Remote,
        }
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn variant(&self) -> SignerVariant {
        self.variant
    }

    /// Derived, never stored independently
    pub fn connected(&self) -> bool {
        self.variant != SignerVariant::None
    }
}

impl Default for WalletIdentity {
    fn default() -> Self {
        Self::none()
    }
}

/// Externally-observed result of a settled transaction.
///
/// Produced either by waiting for confirmation locally, or received
/// pre-confirmed from the remote wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub hash: TxHash,
    pub block_number: Option<u64>,
}

/// Arguments of a bridge submission, shared by both signer backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCall {
    /// Bridge-level network id of the destination chain
    pub dest_network: u32,
    /// Recipient on the destination chain
    pub recipient: Address,
    /// Amount in the token's base units
    pub amount: u128,
    /// `None` bridges the native asset
    pub token: Option<ContractAddress>,
    /// Ask the bridge to refresh its global exit root with this deposit
    pub force_update: bool,
    /// Extra calldata forwarded to the destination, hex-encoded
    pub calldata: String,
}

/// Validate an account address: 0x prefix, 40 hex characters.
///
/// Format check only, no checksum verification.
pub fn validate_address(address: &str) -> Result<(), Error> {
    if !address.starts_with("0x") {
        return Err(Error::InvalidAddress {
            reason: "address must start with '0x'".to_string(),
        });
    }
    if address.len() != 42 {
        return Err(Error::InvalidAddress {
            reason: format!("address must be 42 characters, got {}", address.len()),
        });
    }
    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress {
            reason: "address contains non-hex characters".to_string(),
        });
    }
    Ok(())
}

/// Shorten a hex string for display, keeping `chars` from each end
pub fn shorten_address(address: &str, chars: usize) -> String {
    if address.len() > 2 * chars {
        format!(
            "{}...{}",
            &address[..chars],
            &address[address.len() - chars..]
        )
    } else {
        address.to_string()
    }
}

/// Constants
pub mod constants {
    /// The zero address, marking the native asset in bridge calls
    pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

    /// Decimals of the native asset on both chains
    pub const NATIVE_DECIMALS: u32 = 18;

    /// Calldata placeholder for plain asset bridges
    pub const EMPTY_CALLDATA: &str = "0x";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_invariant() {
        let none = WalletIdentity::none();
        assert!(!none.connected());
        assert!(none.address().is_none());

        let local = WalletIdentity::local(Address::new("0xabc"));
        assert!(local.connected());
        assert_eq!(local.variant(), SignerVariant::Local);
        assert!(local.address().is_some());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x742d35Cc6634C0532925a3b844Bc9e7595f2bD08").is_ok());
        assert!(validate_address("742d35Cc6634C0532925a3b844Bc9e7595f2bD08").is_err());
        assert!(validate_address("0x742d35").is_err());
        assert!(validate_address("0x742d35Cc6634C0532925a3b844Bc9e7595f2bDzz").is_err());
    }

    #[test]
    fn test_shorten_address() {
        let addr = "0x742d35Cc6634C0532925a3b844Bc9e7595f2bD08";
        assert_eq!(shorten_address(addr, 6), "0x742d...f2bD08");
        assert_eq!(shorten_address("0xab", 6), "0xab");
    }

    #[test]
    fn test_variant_serialization() {
        let json = serde_json::to_string(&SignerVariant::Remote).unwrap();
        assert_eq!(json, "\"remote\"");
        let parsed: SignerVariant = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(parsed, SignerVariant::Local);
    }
}
