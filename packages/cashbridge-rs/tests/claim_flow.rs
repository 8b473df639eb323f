//! End-to-end claim and exit flows against in-memory collaborators

use cashbridge_rs::covenant::parse_exit_data;
use cashbridge_rs::testing::{BridgeFixture, MockChain, ScriptedSigner, SignerBehavior};
use cashbridge_rs::{
    decode_transaction, BridgeError, BridgeFlow, ChainId, EvmAddress, ExitDestination, TxId,
};

async fn seeded_chain(fixture: &mut BridgeFixture, claim_age: u64) -> MockChain {
    let chain = MockChain::new();
    chain.add_utxo(fixture.reserve_utxo(10_000)).await;
    let claim = fixture.claim_utxo(1_500, 100);
    chain.set_age(claim.outpoint(), claim_age).await;
    chain.add_utxo(claim).await;
    chain.add_utxo(fixture.funding_utxo(5_000)).await;
    chain
}

#[tokio::test]
async fn test_claim_flow_broadcasts_verified_transaction() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 150).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Sign), fixture.builder());

    let prepared = flow.prepare_claim(&fixture.user, None).await.unwrap();
    assert_eq!(prepared.envelope.user_prompt, "Claim");
    assert_eq!(prepared.envelope.remote_indexes(), vec![1, 2]);
    assert!(!prepared.envelope.broadcast);

    let outputs = prepared.unsigned.transaction.outputs.clone();
    assert_eq!(outputs[0].token.as_ref().unwrap().amount, 8_500);
    assert_eq!(outputs[1].token.as_ref().unwrap().amount, 1_500);
    assert_eq!(outputs[1].locking_bytecode, fixture.user_locking_bytecode());
    assert_eq!(outputs[2].value, 3_000);

    let txid = flow.complete(prepared).await.unwrap();
    let broadcasts = flow.chain().broadcasts().await;
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(txid, TxId(cashbridge_rs::hash::hash256(&broadcasts[0])));

    let sent = decode_transaction(&broadcasts[0]).unwrap();
    assert_eq!(sent.outputs, outputs);
    assert!(!sent.inputs[1].unlocking_bytecode.is_empty());
}

#[tokio::test]
async fn test_immature_claim_is_rejected_before_signing() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 50).await;
    let signer = ScriptedSigner::new(SignerBehavior::Sign);
    let flow = BridgeFlow::new(chain, signer, fixture.builder());

    let err = flow.prepare_claim(&fixture.user, None).await.unwrap_err();
    assert_eq!(err, BridgeError::Immature { min_age: 100, age: 50 });
    assert!(flow.chain().broadcasts().await.is_empty());
}

#[tokio::test]
async fn test_claim_skips_young_nft_for_matured_one() {
    let mut fixture = BridgeFixture::new();
    let chain = MockChain::new();
    chain.add_utxo(fixture.reserve_utxo(10_000)).await;
    // The young claim sorts first
    let young = fixture.claim_utxo(1_500, 100);
    let old = fixture.claim_utxo(2_000, 100);
    chain.set_age(young.outpoint(), 10).await;
    chain.set_age(old.outpoint(), 500).await;
    chain.add_utxo(young.clone()).await;
    chain.add_utxo(old.clone()).await;
    chain.add_utxo(fixture.funding_utxo(5_000)).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Sign), fixture.builder());

    let prepared = flow.prepare_claim(&fixture.user, None).await.unwrap();
    let tx = &prepared.unsigned.transaction;
    assert_eq!(tx.inputs[1].outpoint, old.outpoint());
    assert_eq!(tx.outputs[1].token.as_ref().unwrap().amount, 2_000);

    // Naming the young claim still reports its age
    assert_eq!(
        flow.prepare_claim(&fixture.user, Some(young.outpoint()))
            .await
            .unwrap_err(),
        BridgeError::Immature { min_age: 100, age: 10 }
    );
}

#[tokio::test]
async fn test_claim_with_only_young_nfts_reports_first() {
    let mut fixture = BridgeFixture::new();
    let chain = MockChain::new();
    chain.add_utxo(fixture.reserve_utxo(10_000)).await;
    let first = fixture.claim_utxo(1_500, 100);
    let second = fixture.claim_utxo(2_000, 300);
    chain.set_age(first.outpoint(), 10).await;
    chain.set_age(second.outpoint(), 200).await;
    chain.add_utxo(second).await;
    chain.add_utxo(first).await;
    chain.add_utxo(fixture.funding_utxo(5_000)).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Sign), fixture.builder());

    assert_eq!(
        flow.prepare_claim(&fixture.user, None).await.unwrap_err(),
        BridgeError::Immature { min_age: 100, age: 10 }
    );
}

#[tokio::test]
async fn test_unknown_claim_outpoint() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 150).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Sign), fixture.builder());

    let missing = cashbridge_rs::Outpoint::new(TxId([0xee; 32]), 3);
    assert!(matches!(
        flow.prepare_claim(&fixture.user, Some(missing)).await,
        Err(BridgeError::ClaimNotFound(_))
    ));
}

#[tokio::test]
async fn test_cancelled_signing_leaves_nothing_broadcast() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 150).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Cancel), fixture.builder());

    let first = flow.prepare_claim(&fixture.user, None).await.unwrap();
    let encoded = first.unsigned.encoded.clone();
    assert_eq!(flow.complete(first).await, Err(BridgeError::SigningCancelled));
    assert!(flow.chain().broadcasts().await.is_empty());

    // Preparing again from the same snapshot gives the same transaction
    let retry = flow.prepare_claim(&fixture.user, None).await.unwrap();
    assert_eq!(retry.unsigned.encoded, encoded);
}

#[tokio::test]
async fn test_rejected_signing_surfaces_collaborator_error() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 150).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Reject), fixture.builder());

    let prepared = flow.prepare_claim(&fixture.user, None).await.unwrap();
    assert!(matches!(
        flow.complete(prepared).await,
        Err(BridgeError::Collaborator(_))
    ));
}

#[tokio::test]
async fn test_tampered_signature_is_not_broadcast() {
    let mut fixture = BridgeFixture::new();
    let chain = seeded_chain(&mut fixture, 150).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Tamper), fixture.builder());

    let prepared = flow.prepare_claim(&fixture.user, None).await.unwrap();
    assert!(matches!(
        flow.complete(prepared).await,
        Err(BridgeError::SignatureMismatch(_))
    ));
    assert!(flow.chain().broadcasts().await.is_empty());
}

#[tokio::test]
async fn test_exit_flow_returns_tokens_to_reserve() {
    let mut fixture = BridgeFixture::new();
    let chain = MockChain::new();
    chain.add_utxo(fixture.reserve_utxo(10_000)).await;
    chain.add_utxo(fixture.deposit_utxo(700)).await;
    chain.add_utxo(fixture.funding_utxo(2_000)).await;
    let signer = ScriptedSigner::new(SignerBehavior::Sign);
    let flow = BridgeFlow::new(chain, signer, fixture.builder());

    let destination = ExitDestination {
        chain: ChainId::from_u32(56),
        account: EvmAddress([0x42; 20]),
    };
    let prepared = flow.prepare_exit(&fixture.user, destination).await.unwrap();
    assert_eq!(prepared.envelope.user_prompt, "Exit");

    let outputs = &prepared.unsigned.transaction.outputs;
    assert_eq!(outputs[0].token.as_ref().unwrap().amount, 10_700);
    assert_eq!(parse_exit_data(&outputs[1].locking_bytecode), Some(destination));
    assert_eq!(outputs[1].value, 0);
    // funding + deposit sats - dust cost
    assert_eq!(outputs[2].value, 2_000);

    flow.complete(prepared).await.unwrap();
    assert_eq!(flow.chain().broadcasts().await.len(), 1);
}

#[tokio::test]
async fn test_exit_without_deposit_tokens() {
    let mut fixture = BridgeFixture::new();
    let chain = MockChain::new();
    chain.add_utxo(fixture.reserve_utxo(10_000)).await;
    chain.add_utxo(fixture.funding_utxo(2_000)).await;
    let flow = BridgeFlow::new(chain, ScriptedSigner::new(SignerBehavior::Sign), fixture.builder());

    let destination = ExitDestination {
        chain: ChainId::from_u32(1),
        account: EvmAddress([0x01; 20]),
    };
    assert!(matches!(
        flow.prepare_exit(&fixture.user, destination).await,
        Err(BridgeError::CategoryMismatch { .. })
    ));
}
