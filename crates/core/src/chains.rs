//! Networks that generated contracts are deployed to and verified on

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Decimal places of the native currency on the bundled networks
pub const CHAIN_DECIMAL_UNIT: u8 = 18;

/// Configuration for an EVM network known to hardhat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Human-readable chain name
    pub name: String,
    /// Network key passed to `hardhat --network`
    pub symbol: String,
    pub rpc_url: String,
    pub explorer_url: String,
    pub decimals: u8,
}

impl ChainConfig {
    /// Check the preset is usable for verification
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(Error::validation(format!("Missing symbol for chain '{}'", self.name)));
        }
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            return Err(Error::validation(format!(
                "Invalid RPC URL for chain '{}': '{}'",
                self.symbol, self.rpc_url
            )));
        }
        Ok(())
    }
}

/// Bundled presets keyed by symbol
pub fn default_chains() -> BTreeMap<String, ChainConfig> {
    let mut chains = BTreeMap::new();

    chains.insert("JFIN".to_string(), ChainConfig {
        chain_id: 3501,
        name: "JFIN Mainnet".to_string(),
        symbol: "JFIN".to_string(),
        rpc_url: "https://rpc.jfinchain.com".to_string(),
        explorer_url: "https://exp.jfinchain.com/".to_string(),
        decimals: CHAIN_DECIMAL_UNIT,
    });

    chains.insert("JFINT".to_string(), ChainConfig {
        chain_id: 3502,
        name: "JFIN Testnet".to_string(),
        symbol: "JFINT".to_string(),
        rpc_url: "https://rpc.testnet.jfinchain.com".to_string(),
        explorer_url: "https://exp.testnet.jfinchain.com".to_string(),
        decimals: CHAIN_DECIMAL_UNIT,
    });

    chains
}

/// Chain registry for resolving verification networks
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainConfig>,
}

impl ChainRegistry {
    /// Create a registry with the bundled presets
    pub fn new() -> Self {
        Self::with_chains(default_chains())
    }

    /// Create a registry from configured chains
    pub fn with_chains(chains: BTreeMap<String, ChainConfig>) -> Self {
        let chains = chains
            .into_values()
            .map(|chain| (chain.symbol.to_uppercase(), chain))
            .collect();
        Self { chains }
    }

    /// Look up a chain by symbol, case-insensitively
    pub fn get(&self, symbol: &str) -> Option<&ChainConfig> {
        self.chains.get(&symbol.to_uppercase())
    }

    /// Look up a chain by its numeric id
    pub fn get_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.values().find(|chain| chain.chain_id == chain_id)
    }

    /// Resolve a chain name or fail with a validation error
    pub fn resolve(&self, symbol: &str) -> Result<&ChainConfig> {
        self.get(symbol).ok_or_else(|| {
            Error::validation(format!(
                "Unknown chain '{}'. Supported chains: {}",
                symbol,
                self.symbols().join(", ")
            ))
        })
    }

    /// List all chain symbols
    pub fn symbols(&self) -> Vec<&str> {
        self.chains.keys().map(|s| s.as_str()).collect()
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        self.chains.values()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_registry_presets() {
        let registry = ChainRegistry::new();
        assert_eq!(registry.symbols(), vec!["JFIN", "JFINT"]);
        assert_eq!(registry.get("jfin").unwrap().chain_id, 3501);
        assert_eq!(registry.get_by_id(3502).unwrap().symbol, "JFINT");
        assert!(registry.chains().all(|chain| chain.validate().is_ok()));
    }

    #[test]
    fn test_resolve_unknown_chain() {
        let registry = ChainRegistry::new();
        let err = registry.resolve("goerli").unwrap_err();
        assert!(err.to_string().contains("JFIN, JFINT"));
    }

    #[test]
    fn test_invalid_rpc_url() {
        let chain = ChainConfig {
            rpc_url: "ws://localhost".to_string(),
            ..default_chains()["JFIN"].clone()
        };
        assert!(chain.validate().is_err());
    }
}
