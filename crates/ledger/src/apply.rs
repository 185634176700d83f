//! State transitions for validated records.
//!
//! Application is deliberately separate from validation: the validator only
//! annotates, and the indexer calls [`LedgerContext::apply`] afterwards for
//! records that passed. Types whose effects live outside these collections
//! (orderbook resting state, settlement engine, rollup verification) are
//! no-ops here.

use tally_txfmt::{AddressRef, ReferenceOutput, SendPayload, TxPayload, TxRecord};
use tracing::*;

use crate::context::{
    ChannelInfo, ContractSeriesInfo, LedgerContext, OracleInfo, PropertyInfo, WhitelistInfo,
};

impl LedgerContext {
    /// Applies one record's effect on the ledger collections. Records that
    /// failed validation are ignored.
    pub fn apply(&mut self, record: &TxRecord) {
        if !record.valid {
            return;
        }
        let sender = record.sender.clone();
        match &record.params {
            TxPayload::ActivateProtocol {
                feature_id,
                activation_block,
                ..
            } => {
                self.activate_feature(*feature_id, *activation_block);
                info!(feature = feature_id, at = activation_block, "feature activation recorded");
            }
            TxPayload::IssueToken {
                amount,
                ticker,
                whitelist_ids,
                managed,
                nft,
            } => {
                let id = self.register_property(PropertyInfo {
                    ticker: ticker.clone(),
                    admin: sender.clone(),
                    managed: *managed,
                    nft: *nft,
                    whitelist_ids: whitelist_ids.clone(),
                });
                // Fixed-supply issuance credits the issuer up front; managed
                // supply enters through grants.
                if !managed {
                    self.credit(&sender, tally_txfmt::PropertyId::Linear(id), *amount);
                }
                info!(property = id, ticker = %ticker, "property issued");
            }
            TxPayload::Send(send) => self.apply_send(&sender, send),
            TxPayload::CommitToChannel {
                property_id,
                amount,
                channel_address,
            } => {
                if let Some(channel) = resolve_address(channel_address, &record.reference) {
                    if self.reserve(&sender, *property_id, *amount) && self.channel(&channel).is_none()
                    {
                        self.register_channel(
                            channel,
                            ChannelInfo {
                                participant_a: sender,
                                participant_b: None,
                            },
                        );
                    }
                }
            }
            TxPayload::CreateWhitelist { name, url, .. } => {
                self.register_whitelist(WhitelistInfo {
                    admin: sender,
                    name: name.clone(),
                    url: url.clone(),
                    attested: Default::default(),
                });
            }
            TxPayload::IssueAttestation {
                target_address,
                whitelist_id,
                ..
            } => {
                if let (Some(w), Some(target)) = (
                    self.whitelist_mut(*whitelist_id),
                    resolve_address(target_address, &record.reference),
                ) {
                    w.attested.insert(target);
                }
            }
            TxPayload::RevokeAttestation {
                target_address,
                whitelist_id,
            } => {
                if let (Some(w), Some(target)) = (
                    self.whitelist_mut(*whitelist_id),
                    resolve_address(target_address, &record.reference),
                ) {
                    w.attested.remove(&target);
                }
            }
            TxPayload::GrantManagedToken {
                property_id,
                amount,
                to_address,
            } => {
                if let Some(to) = resolve_address(to_address, &record.reference) {
                    self.credit(&to, *property_id, *amount);
                }
            }
            TxPayload::RedeemManagedToken {
                property_id,
                amount,
            } => {
                self.debit(&sender, *property_id, *amount);
            }
            TxPayload::CreateOracle {
                ticker,
                url,
                backup_address,
                lag,
                ..
            } => {
                let backup = resolve_address(backup_address, &record.reference).unwrap_or_default();
                self.register_oracle(OracleInfo {
                    ticker: ticker.clone(),
                    url: url.clone(),
                    admin: sender,
                    backup,
                    lag: *lag,
                    closed: false,
                });
            }
            TxPayload::CloseOracle { oracle_id } => {
                if let Some(o) = self.oracle_mut(*oracle_id) {
                    o.closed = true;
                }
            }
            TxPayload::CreateContractSeries {
                native,
                underlying_oracle_id,
                collateral_property_id,
                expiry_period,
                ..
            } => {
                let id = self.register_next_contract_series(ContractSeriesInfo {
                    admin: sender,
                    native: *native,
                    oracle_id: *underlying_oracle_id,
                    collateral_property_id: *collateral_property_id,
                    expiry_period: *expiry_period,
                });
                info!(contract = id, "contract series registered");
            }
            // Orderbook, settlement, and rollup effects are out of these
            // collections' scope.
            _ => {}
        }
    }

    fn apply_send(&mut self, sender: &str, send: &SendPayload) {
        match send {
            SendPayload::Single {
                address,
                property_id,
                amount,
            } => {
                if let AddressRef::Direct(to) = address {
                    if self.debit(sender, *property_id, *amount) {
                        self.credit(to, *property_id, *amount);
                    }
                }
            }
            SendPayload::Batch {
                address,
                property_ids,
                amounts,
            } => {
                if let AddressRef::Direct(to) = address {
                    for (id, amount) in property_ids.iter().zip(amounts) {
                        if self.debit(sender, *id, *amount) {
                            self.credit(to, *id, *amount);
                        }
                    }
                }
            }
        }
    }
}

/// Resolves an address slot: direct strings pass through, indexed slots look
/// up the matching reference output's address.
fn resolve_address(addr: &AddressRef, reference: &[ReferenceOutput]) -> Option<String> {
    match addr {
        AddressRef::Direct(s) => Some(s.clone()),
        AddressRef::Indexed(n) => reference
            .iter()
            .find(|r| r.vout == *n)
            .and_then(|r| r.address.clone()),
    }
}
