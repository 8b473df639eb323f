//! Envelope building from snapshot files
//!
//! Drives the same handlers the CLI uses, with a snapshot written to a temp
//! file so the load path is covered too.

use cashbridge_rs::testing::{
    BridgeFixture, CLAIM_CATEGORY_HEX, REDEEM_SCRIPT_HEX, RESERVE_CATEGORY_HEX,
};
use cashbridge_rs::{decode_transaction, BridgeAction, Outpoint, OutputCosts, Utxo};
use claimer::commands;
use claimer::config::Config;
use claimer::snapshot::Snapshot;
use serde_json::json;

fn config() -> Config {
    Config {
        reserve_category: RESERVE_CATEGORY_HEX.to_string(),
        claim_category: CLAIM_CATEGORY_HEX.to_string(),
        bridge_redeem_script: REDEEM_SCRIPT_HEX.to_string(),
        cashaddr_prefix: "bitcoincash".to_string(),
        costs: OutputCosts::default(),
    }
}

fn age_table(entries: &[(Outpoint, u64)]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(outpoint, age)| (outpoint.to_string(), json!(age)))
        .collect();
    serde_json::Value::Object(map)
}

fn write_snapshot(name: &str, utxos: &[Utxo], ages: serde_json::Value) -> Snapshot {
    let path = std::env::temp_dir().join(format!("cashbridge-{}-{}.json", name, std::process::id()));
    let body = json!({ "utxos": utxos, "ages": ages });
    std::fs::write(&path, serde_json::to_string(&body).unwrap()).unwrap();
    let snapshot = Snapshot::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    snapshot
}

#[tokio::test]
async fn test_build_claim_from_snapshot() {
    let mut fixture = BridgeFixture::new();
    let reserve = fixture.reserve_utxo(10_000);
    let claim = fixture.claim_utxo(1_500, 100);
    let funding = fixture.funding_utxo(5_000);
    let ages = age_table(&[(claim.outpoint(), 120)]);
    let snapshot = write_snapshot("claim", &[reserve, claim.clone(), funding], ages);

    let address = fixture.user.encode().unwrap();
    let out = commands::build_claim(&config(), snapshot, &address, None)
        .await
        .unwrap();

    assert_eq!(out.action, BridgeAction::Claim);
    assert_eq!(out.envelope.remote_indexes(), vec![1, 2]);
    assert_eq!(out.envelope.source_outputs[0].outpoint, claim.outpoint());

    let tx = decode_transaction(&out.envelope.transaction).unwrap();
    assert_eq!(tx.outputs[1].token.as_ref().unwrap().amount, 1_500);

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["action"], "Claim");
    assert_eq!(json["envelope"]["userPrompt"], "Claim");
}

#[tokio::test]
async fn test_build_claim_immature_in_snapshot() {
    let mut fixture = BridgeFixture::new();
    let reserve = fixture.reserve_utxo(10_000);
    let claim = fixture.claim_utxo(1_500, 100);
    let funding = fixture.funding_utxo(5_000);
    let ages = age_table(&[(claim.outpoint(), 99)]);
    let snapshot = write_snapshot("immature", &[reserve, claim, funding], ages);

    let address = fixture.user.encode().unwrap();
    let err = commands::build_claim(&config(), snapshot, &address, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not mature"));
}

#[tokio::test]
async fn test_build_exit_from_snapshot() {
    let mut fixture = BridgeFixture::new();
    let reserve = fixture.reserve_utxo(10_000);
    let deposit = fixture.deposit_utxo(250);
    let funding = fixture.funding_utxo(3_000);
    let snapshot = write_snapshot("exit", &[reserve, deposit, funding], json!({}));

    let address = fixture.user.encode().unwrap();
    let out = commands::build_exit(
        &config(),
        snapshot,
        &address,
        56,
        "0x4242424242424242424242424242424242424242",
    )
    .await
    .unwrap();

    assert_eq!(out.action, BridgeAction::Exit);
    let tx = decode_transaction(&out.envelope.transaction).unwrap();
    assert_eq!(tx.outputs[0].token.as_ref().unwrap().amount, 10_250);
    assert_eq!(tx.outputs[1].value, 0);
}

#[tokio::test]
async fn test_build_exit_rejects_bad_destination() {
    let fixture = BridgeFixture::new();
    let address = fixture.user.encode().unwrap();
    assert!(
        commands::build_exit(&config(), Snapshot::default(), &address, 56, "0x1234")
            .await
            .is_err()
    );
}
