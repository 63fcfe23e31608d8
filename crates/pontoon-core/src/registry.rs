//! Bridgeable token registry
//!
//! Every token maps to exactly one counterpart on the other chain, and the
//! counterpart relation is symmetric. Construction fails otherwise.

use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;
use crate::types::{ChainId, ContractAddress};

/// A bridgeable token and its cross-chain mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub symbol: String,
    /// `None` marks the chain's native asset
    pub contract: Option<ContractAddress>,
    pub decimals: u32,
    pub chain_id: ChainId,
    pub chain_name: String,
    pub rpc_url: String,
    /// Symbol of the asset this token maps to on the other chain
    pub counter_symbol: String,
}

impl TokenDescriptor {
    /// Whether this is the chain's native asset (no allowance concept applies)
    pub fn is_native(&self) -> bool {
        self.contract.is_none()
    }
}

/// Registry of all bridgeable tokens
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Vec<TokenDescriptor>,
}

impl TokenRegistry {
    /// Build a registry, validating the counterpart invariant.
    pub fn new(tokens: Vec<TokenDescriptor>) -> Result<Self, RegistryError> {
        for (i, token) in tokens.iter().enumerate() {
            if tokens[..i].iter().any(|t| t.symbol == token.symbol) {
                return Err(RegistryError::DuplicateSymbol {
                    symbol: token.symbol.clone(),
                });
            }

            let counter = tokens
                .iter()
                .find(|t| t.symbol == token.counter_symbol)
                .ok_or_else(|| RegistryError::UnknownCounterpart {
                    symbol: token.symbol.clone(),
                    counter: token.counter_symbol.clone(),
                })?;

            if counter.counter_symbol != token.symbol {
                return Err(RegistryError::AsymmetricPair {
                    a: token.symbol.clone(),
                    b: counter.symbol.clone(),
                });
            }
        }

        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    pub fn get(&self, symbol: &str) -> Result<&TokenDescriptor, RegistryError> {
        self.tokens
            .iter()
            .find(|t| t.symbol == symbol)
            .ok_or_else(|| RegistryError::UnknownToken {
                symbol: symbol.to_string(),
            })
    }

    /// The asset a token maps to on the other chain
    pub fn counterpart_of(&self, token: &TokenDescriptor) -> Result<&TokenDescriptor, RegistryError> {
        self.get(&token.counter_symbol)
    }
}
