//! Configuration types for Pontoon

use serde::{Deserialize, Serialize};

use crate::registry::{TokenDescriptor, TokenRegistry};
use crate::types::{ChainId, ContractAddress};

/// One side of the bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProfile {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: String,
    pub explorer_base: String,
    /// Network id the bridge contract uses for this chain
    pub bridge_network_id: u32,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Origin the embedded wallet frame is served from; every inbound
    /// channel message must match it exactly
    pub wallet_origin: String,

    /// URL loaded into the wallet frame
    pub wallet_url: String,

    /// Bridge contract (the approval spender) on the L1 side
    pub bridge_address: ContractAddress,

    /// Wrapped native token contract on the L1 side
    pub l1_token_contract: ContractAddress,

    /// Base URL of the bridge REST API (allowance queries)
    pub bridge_api_url: String,

    /// Base URL of the deposit history API
    pub history_api_url: String,

    pub l1: ChainProfile,
    pub l2: ChainProfile,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            wallet_origin: "https://wallet.pontoon.network".to_string(),
            wallet_url: "https://wallet.pontoon.network/connector/wallet".to_string(),
            bridge_address: ContractAddress::new("0x3d5a7e1f0f9b0c6f4c2f4b8a9d6e5c4b3a291807"),
            l1_token_contract: ContractAddress::new("0x9c7b1e2d3f4a5b6c7d8e9f0a1b2c3d4e5f607182"),
            bridge_api_url: "https://api.pontoon.network".to_string(),
            history_api_url: "https://bridge-rpc.pontoon.network".to_string(),
            l1: ChainProfile {
                name: "Ethereum (sepolia)".to_string(),
                chain_id: 11155111,
                rpc_url: "https://rpc.sepolia.org".to_string(),
                explorer_base: "https://sepolia.etherscan.io".to_string(),
                bridge_network_id: 0,
            },
            l2: ChainProfile {
                name: "Pontoon (beta)".to_string(),
                chain_id: 440044,
                rpc_url: "https://rpc.pontoon.network".to_string(),
                explorer_base: "https://explorer.pontoon.network".to_string(),
                bridge_network_id: 1,
            },
        }
    }
}

impl BridgeConfig {
    /// Map an EIP-155 chain id to the bridge contract's network id
    pub fn bridge_network_id(&self, chain_id: ChainId) -> Option<u32> {
        if chain_id == self.l1.chain_id {
            Some(self.l1.bridge_network_id)
        } else if chain_id == self.l2.chain_id {
            Some(self.l2.bridge_network_id)
        } else {
            None
        }
    }

    /// The default bridgeable pair: wrapped native on L1, native on L2.
    pub fn token_registry(&self) -> TokenRegistry {
        let tokens = vec![
            TokenDescriptor {
                symbol: "ponETH".to_string(),
                contract: Some(self.l1_token_contract.clone()),
                decimals: 18,
                chain_id: self.l1.chain_id,
                chain_name: self.l1.name.clone(),
                rpc_url: self.l1.rpc_url.clone(),
                counter_symbol: "PON".to_string(),
            },
            TokenDescriptor {
                symbol: "PON".to_string(),
                contract: None,
                decimals: 18,
                chain_id: self.l2.chain_id,
                chain_name: self.l2.name.clone(),
                rpc_url: self.l2.rpc_url.clone(),
                counter_symbol: "ponETH".to_string(),
            },
        ];

        // The built-in pair always satisfies the counterpart invariant.
        TokenRegistry::new(tokens).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.l1.chain_id, 11155111);
        assert_eq!(config.l1.bridge_network_id, 0);
        assert_eq!(config.l2.bridge_network_id, 1);
    }

    #[test]
    fn test_bridge_network_id() {
        let config = BridgeConfig::default();
        assert_eq!(config.bridge_network_id(11155111), Some(0));
        assert_eq!(config.bridge_network_id(440044), Some(1));
        assert_eq!(config.bridge_network_id(1), None);
    }

    #[test]
    fn test_default_registry_pair() {
        let config = BridgeConfig::default();
        let registry = config.token_registry();
        let pon = registry.get("PON").unwrap();
        assert!(pon.is_native());
        assert_eq!(registry.counterpart_of(pon).unwrap().symbol, "ponETH");
    }

    #[test]
    fn test_config_serialization() {
        let config = BridgeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.wallet_origin, config.wallet_origin);
        assert_eq!(parsed.l2.chain_id, config.l2.chain_id);
    }
}
