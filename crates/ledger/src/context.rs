//! The ledger collections, owned explicitly and passed by handle.

use std::collections::{HashMap, HashSet};

use tally_codecs::TokenAmount;
use tally_txfmt::PropertyId;

/// Per-address, per-property balance buckets.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Tally {
    /// Freely spendable.
    pub available: TokenAmount,
    /// Locked under open orders or channel commitments.
    pub reserved: TokenAmount,
}

/// Registry entry for an issued property.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct PropertyInfo {
    pub ticker: String,
    pub admin: String,
    pub managed: bool,
    pub nft: bool,
    pub whitelist_ids: Vec<u64>,
}

/// Registry entry for a whitelist.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct WhitelistInfo {
    pub admin: String,
    pub name: String,
    pub url: String,
    pub attested: HashSet<String>,
}

/// Registry entry for a price oracle.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct OracleInfo {
    pub ticker: String,
    pub url: String,
    pub admin: String,
    pub backup: String,
    pub lag: u64,
    pub closed: bool,
}

/// Registry entry for a futures contract series.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ContractSeriesInfo {
    pub admin: String,
    pub native: bool,
    pub oracle_id: u64,
    pub collateral_property_id: u64,
    pub expiry_period: u64,
}

/// Registry entry for a payment channel, keyed by channel address.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ChannelInfo {
    pub participant_a: String,
    pub participant_b: Option<String>,
}

/// Every ledger collection in one owned struct.
///
/// Validation holds a shared reference and never writes; state transitions
/// go through [`LedgerContext::apply`] or the explicit mutators, typically
/// from the indexer after a record validates.
#[derive(Clone, Debug, Default)]
pub struct LedgerContext {
    tallies: HashMap<(String, PropertyId), Tally>,
    properties: HashMap<u64, PropertyInfo>,
    whitelists: HashMap<u64, WhitelistInfo>,
    oracles: HashMap<u64, OracleInfo>,
    contracts: HashMap<u64, ContractSeriesInfo>,
    channels: HashMap<String, ChannelInfo>,
    activations: HashMap<u64, u64>,
    activation_admin: Option<String>,
    next_property_id: u64,
    next_whitelist_id: u64,
    next_oracle_id: u64,
    next_contract_id: u64,
}

impl LedgerContext {
    pub fn new() -> Self {
        Self {
            next_property_id: 1,
            next_whitelist_id: 1,
            next_oracle_id: 1,
            next_contract_id: 1,
            ..Default::default()
        }
    }

    /// Restricts protocol activation messages to one admin address.
    pub fn with_activation_admin(mut self, admin: impl Into<String>) -> Self {
        self.activation_admin = Some(admin.into());
        self
    }

    pub fn activation_admin(&self) -> Option<&str> {
        self.activation_admin.as_deref()
    }

    pub fn tally(&self, address: &str, property: PropertyId) -> Tally {
        self.tallies
            .get(&(address.to_owned(), property))
            .copied()
            .unwrap_or_default()
    }

    pub fn available(&self, address: &str, property: PropertyId) -> TokenAmount {
        self.tally(address, property).available
    }

    /// Adds to an address's available balance. Saturates at the type limit
    /// rather than wrapping.
    pub fn credit(&mut self, address: &str, property: PropertyId, amount: TokenAmount) {
        let slot = self
            .tallies
            .entry((address.to_owned(), property))
            .or_default();
        slot.available = slot.available.checked_add(amount).unwrap_or(slot.available);
    }

    /// Removes from an address's available balance. Returns false (and
    /// leaves the tally untouched) when the balance does not cover it.
    pub fn debit(&mut self, address: &str, property: PropertyId, amount: TokenAmount) -> bool {
        match self.tallies.get_mut(&(address.to_owned(), property)) {
            Some(slot) => match slot.available.checked_sub(amount) {
                Some(rest) => {
                    slot.available = rest;
                    true
                }
                None => false,
            },
            None => amount.is_zero(),
        }
    }

    /// Moves available balance into the reserved bucket, e.g. for a channel
    /// commitment or a resting order.
    pub fn reserve(&mut self, address: &str, property: PropertyId, amount: TokenAmount) -> bool {
        match self.tallies.get_mut(&(address.to_owned(), property)) {
            Some(slot) => match slot.available.checked_sub(amount) {
                Some(rest) => {
                    slot.available = rest;
                    slot.reserved = slot.reserved.checked_add(amount).unwrap_or(slot.reserved);
                    true
                }
                None => false,
            },
            None => amount.is_zero(),
        }
    }

    pub fn property(&self, id: u64) -> Option<&PropertyInfo> {
        self.properties.get(&id)
    }

    /// Registers a property under the next linear id and returns that id.
    pub fn register_property(&mut self, info: PropertyInfo) -> u64 {
        let id = self.next_property_id;
        self.next_property_id += 1;
        self.properties.insert(id, info);
        id
    }

    pub fn whitelist(&self, id: u64) -> Option<&WhitelistInfo> {
        self.whitelists.get(&id)
    }

    pub fn register_whitelist(&mut self, info: WhitelistInfo) -> u64 {
        let id = self.next_whitelist_id;
        self.next_whitelist_id += 1;
        self.whitelists.insert(id, info);
        id
    }

    pub fn whitelist_mut(&mut self, id: u64) -> Option<&mut WhitelistInfo> {
        self.whitelists.get_mut(&id)
    }

    pub fn oracle(&self, id: u64) -> Option<&OracleInfo> {
        self.oracles.get(&id)
    }

    pub fn register_oracle(&mut self, info: OracleInfo) -> u64 {
        let id = self.next_oracle_id;
        self.next_oracle_id += 1;
        self.oracles.insert(id, info);
        id
    }

    pub fn oracle_mut(&mut self, id: u64) -> Option<&mut OracleInfo> {
        self.oracles.get_mut(&id)
    }

    pub fn contract_series(&self, id: u64) -> Option<&ContractSeriesInfo> {
        self.contracts.get(&id)
    }

    pub fn register_contract_series(&mut self, id: u64, info: ContractSeriesInfo) {
        self.contracts.insert(id, info);
        self.next_contract_id = self.next_contract_id.max(id + 1);
    }

    /// Registers a contract series under the next free id and returns it.
    pub fn register_next_contract_series(&mut self, info: ContractSeriesInfo) -> u64 {
        let id = self.next_contract_id;
        self.register_contract_series(id, info);
        id
    }

    pub fn channel(&self, address: &str) -> Option<&ChannelInfo> {
        self.channels.get(address)
    }

    pub fn register_channel(&mut self, address: impl Into<String>, info: ChannelInfo) {
        self.channels.insert(address.into(), info);
    }

    /// Records a feature activation height.
    pub fn activate_feature(&mut self, feature_id: u64, activation_block: u64) {
        self.activations.insert(feature_id, activation_block);
    }

    pub fn feature_active(&self, feature_id: u64, height: u64) -> bool {
        self.activations
            .get(&feature_id)
            .is_some_and(|&at| height >= at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_and_debit() {
        let mut ctx = LedgerContext::new();
        let p = PropertyId::Linear(1);
        ctx.credit("alice", p, TokenAmount::from_whole(10));
        assert_eq!(ctx.available("alice", p), TokenAmount::from_whole(10));
        assert!(ctx.debit("alice", p, TokenAmount::from_whole(4)));
        assert_eq!(ctx.available("alice", p), TokenAmount::from_whole(6));
        assert!(!ctx.debit("alice", p, TokenAmount::from_whole(7)));
        assert_eq!(ctx.available("alice", p), TokenAmount::from_whole(6));
    }

    #[test]
    fn debit_of_unknown_tally_only_allows_zero() {
        let mut ctx = LedgerContext::new();
        let p = PropertyId::Linear(9);
        assert!(ctx.debit("nobody", p, TokenAmount::ZERO));
        assert!(!ctx.debit("nobody", p, TokenAmount::from_whole(1)));
    }

    #[test]
    fn reserve_moves_between_buckets() {
        let mut ctx = LedgerContext::new();
        let p = PropertyId::Linear(1);
        ctx.credit("alice", p, TokenAmount::from_whole(10));
        assert!(ctx.reserve("alice", p, TokenAmount::from_whole(3)));
        let t = ctx.tally("alice", p);
        assert_eq!(t.available, TokenAmount::from_whole(7));
        assert_eq!(t.reserved, TokenAmount::from_whole(3));
    }

    #[test]
    fn registries_hand_out_sequential_ids() {
        let mut ctx = LedgerContext::new();
        let a = ctx.register_property(PropertyInfo {
            ticker: "AAA".to_owned(),
            admin: "alice".to_owned(),
            managed: false,
            nft: false,
            whitelist_ids: vec![],
        });
        let b = ctx.register_property(PropertyInfo {
            ticker: "BBB".to_owned(),
            admin: "bob".to_owned(),
            managed: true,
            nft: false,
            whitelist_ids: vec![],
        });
        assert_eq!((a, b), (1, 2));
        assert_eq!(ctx.property(1).unwrap().ticker, "AAA");
        assert!(ctx.property(3).is_none());
    }

    #[test]
    fn feature_gate() {
        let mut ctx = LedgerContext::new();
        assert!(!ctx.feature_active(7, 1_000_000));
        ctx.activate_feature(7, 500);
        assert!(!ctx.feature_active(7, 499));
        assert!(ctx.feature_active(7, 500));
    }
}
