//! Scenario fixtures
//!
//! Deterministic categories, contract and user address so tests on both the
//! library and the CLI can describe a chain state in a few lines.

use crate::address_codec::{AddressKind, CashAddress, MAINNET_PREFIX};
use crate::builder::{OutputCosts, TransactionBuilder};
use crate::category::CategoryRegistry;
use crate::commitment::Commitment;
use crate::covenant::BridgeContract;
use crate::types::{Capability, TokenCategory, TokenData, TxId, Utxo};

/// Display hex of the fixture reserve category
pub const RESERVE_CATEGORY_HEX: &str =
    "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa01";

/// Display hex of the fixture claim category
pub const CLAIM_CATEGORY_HEX: &str =
    "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc02";

/// Stand-in covenant bytecode (`OP_1 OP_DROP OP_1`)
pub const REDEEM_SCRIPT_HEX: &str = "517551";

#[derive(Debug, Clone)]
pub struct BridgeFixture {
    pub registry: CategoryRegistry,
    pub contract: BridgeContract,
    pub user: CashAddress,
    next_txid: u8,
}

impl Default for BridgeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeFixture {
    pub fn new() -> Self {
        let reserve = TokenCategory::from_hex(RESERVE_CATEGORY_HEX).expect("fixture category");
        let claim = TokenCategory::from_hex(CLAIM_CATEGORY_HEX).expect("fixture category");
        Self {
            registry: CategoryRegistry::new(reserve, claim),
            contract: BridgeContract::from_hex(REDEEM_SCRIPT_HEX).expect("fixture script"),
            user: CashAddress::new(MAINNET_PREFIX, AddressKind::P2pkh, false, vec![0x11; 20])
                .expect("fixture address"),
            next_txid: 1,
        }
    }

    pub fn builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.registry, self.contract.clone(), OutputCosts::default())
    }

    pub fn user_locking_bytecode(&self) -> Vec<u8> {
        self.user.locking_bytecode().expect("fixture address is P2PKH")
    }

    fn txid(&mut self) -> TxId {
        let txid = TxId([self.next_txid; 32]);
        self.next_txid = self.next_txid.wrapping_add(1);
        txid
    }

    /// Live reserve output at the bridge contract
    pub fn reserve_utxo(&mut self, amount: u64) -> Utxo {
        Utxo {
            txid: self.txid(),
            vout: 0,
            satoshis: 1000,
            locking_bytecode: self.contract.locking_bytecode(),
            token: Some(TokenData::fungible(self.registry.reserve_category(), amount)),
        }
    }

    /// Immutable claim NFT owned by the fixture user
    pub fn claim_utxo(&mut self, amount: u64, min_age: u64) -> Utxo {
        Utxo {
            txid: self.txid(),
            vout: 0,
            satoshis: 1000,
            locking_bytecode: self.user_locking_bytecode(),
            token: Some(TokenData::nft(
                self.registry.claim_category(),
                Capability::Immutable,
                Commitment::new(amount, min_age).to_bytes().to_vec(),
            )),
        }
    }

    /// Reserve-category tokens held by the fixture user
    pub fn deposit_utxo(&mut self, amount: u64) -> Utxo {
        Utxo {
            txid: self.txid(),
            vout: 0,
            satoshis: 1000,
            locking_bytecode: self.user_locking_bytecode(),
            token: Some(TokenData::fungible(self.registry.reserve_category(), amount)),
        }
    }

    /// Plain satoshis held by the fixture user
    pub fn funding_utxo(&mut self, satoshis: u64) -> Utxo {
        Utxo {
            txid: self.txid(),
            vout: 0,
            satoshis,
            locking_bytecode: self.user_locking_bytecode(),
            token: None,
        }
    }
}
