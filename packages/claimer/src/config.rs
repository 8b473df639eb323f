//! Claimer configuration

use std::env;

use cashbridge_rs::address_codec::MAINNET_PREFIX;
use cashbridge_rs::redact::Redacted;
use cashbridge_rs::{BridgeContract, CategoryRegistry, OutputCosts, TransactionBuilder};
use eyre::{eyre, Result, WrapErr};

/// Bridge settings needed to build claim and exit transactions
#[derive(Debug, Clone)]
pub struct Config {
    /// Reserve token category (display-order hex)
    pub reserve_category: String,
    /// Claim NFT category (display-order hex)
    pub claim_category: String,
    /// Compiled bridge covenant bytecode (hex)
    pub bridge_redeem_script: String,
    /// CashAddr prefix for addresses given without one
    pub cashaddr_prefix: String,
    pub costs: OutputCosts,
}

fn parse_sats(name: &str, value: Option<String>, default: u64) -> Result<u64> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid {}", name)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `load` passes the process environment
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = OutputCosts::default();
        Ok(Self {
            reserve_category: get("RESERVE_CATEGORY").ok_or_else(|| eyre!("RESERVE_CATEGORY required"))?,
            claim_category: get("CLAIM_CATEGORY").ok_or_else(|| eyre!("CLAIM_CATEGORY required"))?,
            bridge_redeem_script: get("BRIDGE_REDEEM_SCRIPT")
                .ok_or_else(|| eyre!("BRIDGE_REDEEM_SCRIPT required"))?,
            cashaddr_prefix: get("CASHADDR_PREFIX").unwrap_or_else(|| MAINNET_PREFIX.to_string()),
            costs: OutputCosts {
                dust_output_cost: parse_sats(
                    "DUST_OUTPUT_COST",
                    get("DUST_OUTPUT_COST"),
                    defaults.dust_output_cost,
                )?,
                primary_output_cost: parse_sats(
                    "PRIMARY_OUTPUT_COST",
                    get("PRIMARY_OUTPUT_COST"),
                    defaults.primary_output_cost,
                )?,
            },
        })
    }

    /// Transaction builder for the configured bridge
    pub fn builder(&self) -> Result<TransactionBuilder> {
        let registry = CategoryRegistry::from_hex(&self.reserve_category, &self.claim_category)
            .wrap_err("Invalid category configuration")?;
        let contract = BridgeContract::from_hex(&self.bridge_redeem_script)
            .wrap_err("Invalid BRIDGE_REDEEM_SCRIPT")?;
        Ok(TransactionBuilder::new(registry, contract, self.costs))
    }
}

/// Authorizer key for `authorize-exit`; the other commands never read it
pub fn load_authorizer_key() -> Result<Redacted<String>> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded .env from {:?}", path);
    }
    env::var("AUTHORIZER_PRIVATE_KEY")
        .map(Redacted)
        .map_err(|_| eyre!("AUTHORIZER_PRIVATE_KEY required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const RESERVE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa01";
    const CLAIM: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc02";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> HashMap<String, String> {
        vars(&[
            ("RESERVE_CATEGORY", RESERVE),
            ("CLAIM_CATEGORY", CLAIM),
            ("BRIDGE_REDEEM_SCRIPT", "517551"),
        ])
    }

    #[test]
    fn test_defaults() {
        let env = required();
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.cashaddr_prefix, "bitcoincash");
        assert_eq!(config.costs, OutputCosts::default());
        assert!(config.builder().is_ok());
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = required();
        env.remove("CLAIM_CATEGORY");
        let err = Config::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("CLAIM_CATEGORY required"));
    }

    #[test]
    fn test_cost_overrides_and_bad_values() {
        let mut env = required();
        env.insert("DUST_OUTPUT_COST".into(), "800".into());
        env.insert("PRIMARY_OUTPUT_COST".into(), "600".into());
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.costs.dust_output_cost, 800);
        assert_eq!(config.costs.primary_output_cost, 600);

        env.insert("DUST_OUTPUT_COST".into(), "lots".into());
        assert!(Config::from_lookup(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_identical_categories_rejected() {
        let mut env = required();
        env.insert("CLAIM_CATEGORY".into(), RESERVE.into());
        let config = Config::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert!(config.builder().is_err());
    }
}
