//! Subcommand handlers
//!
//! Each handler returns a serializable value; `main` prints it as JSON on
//! stdout so envelopes can be piped straight into a wallet.

use cashbridge_rs::hash::parse_bytes32;
use cashbridge_rs::redact::Redacted;
use cashbridge_rs::{
    bytes32_to_hex, commitment, compute_exit_id, BridgeAction, BridgeFlow, CashAddress, ChainId,
    Commitment, EvmAddress, ExitAuthorization, ExitAuthorizer, ExitDestination, Outpoint,
    SigningEnvelope,
};
use eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::snapshot::Snapshot;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub action: BridgeAction,
    pub envelope: SigningEnvelope,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitIdOutput {
    pub data: String,
    pub exit_id: String,
}

fn parse_address(config: &Config, address: &str) -> Result<CashAddress> {
    CashAddress::decode_with_prefix(address, &config.cashaddr_prefix)
        .wrap_err_with(|| format!("Invalid address {}", address))
}

/// Claim envelope for one of `address`'s claim NFTs
pub async fn build_claim(
    config: &Config,
    snapshot: Snapshot,
    address: &str,
    claim: Option<&str>,
) -> Result<BuildOutput> {
    let user = parse_address(config, address)?;
    let claim = claim
        .map(Outpoint::parse)
        .transpose()
        .wrap_err("Invalid --claim outpoint")?;

    // Offline: no signer, the envelope is the output
    let flow = BridgeFlow::new(snapshot, (), config.builder()?);
    let prepared = flow.prepare_claim(&user, claim).await?;
    info!(address = %user, "Claim envelope built");

    Ok(BuildOutput {
        action: prepared.unsigned.action,
        envelope: prepared.envelope,
    })
}

/// Exit envelope depositing `address`'s reserve tokens
pub async fn build_exit(
    config: &Config,
    snapshot: Snapshot,
    address: &str,
    dest_chain: u32,
    dest_account: &str,
) -> Result<BuildOutput> {
    let user = parse_address(config, address)?;
    let destination = ExitDestination {
        chain: ChainId::from_u32(dest_chain),
        account: EvmAddress::from_hex(dest_account).wrap_err("Invalid --dest-account")?,
    };

    let flow = BridgeFlow::new(snapshot, (), config.builder()?);
    let prepared = flow.prepare_exit(&user, destination).await?;
    info!(address = %user, chain = %destination.chain, "Exit envelope built");

    Ok(BuildOutput {
        action: prepared.unsigned.action,
        envelope: prepared.envelope,
    })
}

pub fn decode_commitment(commitment_hex: &str) -> Result<Commitment> {
    let bytes = hex::decode(commitment_hex.trim().trim_start_matches("0x"))
        .wrap_err("Commitment is not hex")?;
    let (amount, min_age) = commitment::decode(&bytes)?;
    Ok(Commitment::new(amount, min_age))
}

pub fn exit_id(data: &str) -> ExitIdOutput {
    ExitIdOutput {
        data: data.to_string(),
        exit_id: bytes32_to_hex(&compute_exit_id(data)),
    }
}

pub fn authorize_exit(
    key: &Redacted<String>,
    exit_id_hex: &str,
    amount: u128,
    caller: &str,
) -> Result<ExitAuthorization> {
    let exit_id = parse_bytes32(exit_id_hex).map_err(|e| eyre!("Invalid --exit-id: {}", e))?;
    let authorizer = ExitAuthorizer::from_private_key(key.expose())?;
    Ok(authorizer.authorize(&exit_id, amount, caller)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_commitment() {
        let decoded = decode_commitment("dc050000000000006400000000000000").unwrap();
        assert_eq!(decoded, Commitment::new(1500, 100));
        assert!(decode_commitment("dc05").is_err());
        assert!(decode_commitment("zz").is_err());
    }

    #[test]
    fn test_exit_id_output() {
        let out = exit_id("tx123");
        assert!(out.exit_id.starts_with("0x889eb6fc"));
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["data"], "tx123");
        assert!(json["exitId"].is_string());
    }

    #[test]
    fn test_authorize_exit() {
        let key = Redacted(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        );
        let id = exit_id("tx123").exit_id;
        let auth = authorize_exit(&key, &id, 1000, "terra1user").unwrap();
        assert_eq!(auth.authorizer, "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        assert!(authorize_exit(&key, "0x1234", 1000, "terra1user").is_err());
    }
}
