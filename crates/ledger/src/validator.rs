//! Per-type validation rules over a shared ledger context.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tally_codecs::TokenAmount;
use tally_txfmt::{
    PropertyId, ReferenceOutput, SendPayload, TxContext, TxPayload, TxType, TxValidator, Verdict,
};
use tracing::*;

use crate::context::LedgerContext;

/// The ledger's implementation of the dispatcher's validation seam.
///
/// Holds the context behind a read-write lock but only ever takes the read
/// side: validation annotates, application mutates, and the two never run
/// under the same lock acquisition.
#[derive(Debug)]
pub struct LedgerValidator {
    ctx: Arc<RwLock<LedgerContext>>,
}

impl LedgerValidator {
    pub fn new(ctx: Arc<RwLock<LedgerContext>>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> Arc<RwLock<LedgerContext>> {
        self.ctx.clone()
    }
}

#[async_trait]
impl TxValidator for LedgerValidator {
    async fn validate(
        &self,
        tcx: &TxContext,
        ty: TxType,
        params: &TxPayload,
        reference: &[ReferenceOutput],
    ) -> Verdict {
        let ctx = self.ctx.read();
        let verdict = check(&ctx, tcx, params, reference);
        if !verdict.valid {
            debug!(txid = %tcx.txid, %ty, reason = ?verdict.reason, "transaction rejected");
        }
        verdict
    }
}

/// The native chain coin occupies property id 0 and always exists.
const NATIVE_PROPERTY: u64 = 0;

fn property_exists(ctx: &LedgerContext, id: &PropertyId) -> bool {
    match id {
        PropertyId::Linear(NATIVE_PROPERTY) => true,
        PropertyId::Linear(n) => ctx.property(*n).is_some(),
        PropertyId::Synthetic {
            collateral,
            contract,
        } => match (collateral, contract) {
            (Some(c), Some(k)) => ctx.property(*c).is_some() && ctx.contract_series(*k).is_some(),
            _ => false,
        },
    }
}

fn covers(ctx: &LedgerContext, sender: &str, id: &PropertyId, amount: &TokenAmount) -> bool {
    ctx.available(sender, *id) >= *amount
}

fn check(
    ctx: &LedgerContext,
    tcx: &TxContext,
    params: &TxPayload,
    _reference: &[ReferenceOutput],
) -> Verdict {
    let sender = tcx.sender.as_str();
    let height = tcx.block_height;
    match params {
        TxPayload::ActivateProtocol {
            activation_block, ..
        } => {
            if ctx.activation_admin().is_some_and(|a| a != sender) {
                return Verdict::rejected("Not activation admin");
            }
            if *activation_block < height {
                return Verdict::rejected("Activation block in the past");
            }
            Verdict::ok()
        }
        TxPayload::IssueToken {
            amount,
            ticker,
            managed,
            ..
        } => {
            if ticker.is_empty() {
                return Verdict::rejected("Empty ticker");
            }
            if amount.is_zero() && !managed {
                return Verdict::rejected("Zero issuance");
            }
            Verdict::ok()
        }
        TxPayload::Send(send) => check_send(ctx, sender, send),
        TxPayload::TradeTokenForUtxo {
            property_id,
            amount,
            sats_expected,
            ..
        } => {
            if !property_exists(ctx, property_id) {
                return Verdict::rejected("Unknown property");
            }
            if *sats_expected == 0 {
                return Verdict::rejected("Zero sale price");
            }
            if !covers(ctx, sender, property_id, amount) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::CommitToChannel {
            property_id,
            amount,
            ..
        } => {
            if !property_exists(ctx, property_id) {
                return Verdict::rejected("Unknown property");
            }
            if !covers(ctx, sender, property_id, amount) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::TradeTokenForToken {
            offered_property_id,
            offered_amount,
            desired_property_id,
            desired_amount,
            ..
        } => {
            if !property_exists(ctx, offered_property_id)
                || !property_exists(ctx, desired_property_id)
            {
                return Verdict::rejected("Unknown property");
            }
            if offered_amount.is_zero() || desired_amount.is_zero() {
                return Verdict::rejected("Zero amount");
            }
            if !covers(ctx, sender, offered_property_id, offered_amount) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::CancelOrder {
            cancel_all,
            txid_to_cancel,
            ..
        } => {
            if !cancel_all && txid_to_cancel.is_empty() {
                return Verdict::rejected("Nothing to cancel");
            }
            Verdict::ok()
        }
        TxPayload::CreateWhitelist { name, .. } => {
            if name.is_empty() {
                return Verdict::rejected("Empty name");
            }
            Verdict::ok()
        }
        TxPayload::UpdateAdmin {
            whitelist,
            oracle,
            token,
            id,
            ..
        } => {
            let admin = if *whitelist {
                ctx.whitelist(*id).map(|w| w.admin.clone())
            } else if *oracle {
                ctx.oracle(*id).map(|o| o.admin.clone())
            } else if *token {
                ctx.property(*id).map(|p| p.admin.clone())
            } else {
                return Verdict::rejected("No registry selected");
            };
            match admin {
                Some(a) if a == sender => Verdict::ok(),
                Some(_) => Verdict::rejected("Not current admin"),
                None => Verdict::rejected("Unknown registry entry"),
            }
        }
        TxPayload::IssueAttestation { whitelist_id, .. }
        | TxPayload::RevokeAttestation { whitelist_id, .. } => {
            match ctx.whitelist(*whitelist_id) {
                Some(w) if w.admin == sender => Verdict::ok(),
                Some(_) => Verdict::rejected("Not whitelist admin"),
                None => Verdict::rejected("Unknown whitelist"),
            }
        }
        TxPayload::GrantManagedToken {
            property_id,
            amount,
            ..
        } => match linear_property(ctx, property_id) {
            Some((_, info)) => {
                if !info.managed {
                    return Verdict::rejected("Not a managed property");
                }
                if info.admin != sender {
                    return Verdict::rejected("Not property issuer");
                }
                if amount.is_zero() {
                    return Verdict::rejected("Zero amount");
                }
                Verdict::ok()
            }
            None => Verdict::rejected("Unknown property"),
        },
        TxPayload::RedeemManagedToken {
            property_id,
            amount,
        } => match linear_property(ctx, property_id) {
            Some((_, info)) => {
                if !info.managed {
                    return Verdict::rejected("Not a managed property");
                }
                if !covers(ctx, sender, property_id, amount) {
                    return Verdict::rejected("Insufficient balance");
                }
                Verdict::ok()
            }
            None => Verdict::rejected("Unknown property"),
        },
        TxPayload::CreateOracle { ticker, .. } => {
            if ticker.is_empty() {
                return Verdict::rejected("Empty ticker");
            }
            Verdict::ok()
        }
        TxPayload::PublishOracleData { oracle_id, .. } => match ctx.oracle(*oracle_id) {
            Some(o) if o.closed => Verdict::rejected("Oracle closed"),
            Some(o) if o.admin != sender => Verdict::rejected("Not oracle admin"),
            Some(_) => Verdict::ok(),
            None => Verdict::rejected("Unknown oracle"),
        },
        TxPayload::CloseOracle { oracle_id } => match ctx.oracle(*oracle_id) {
            Some(o) if o.admin != sender && o.backup != sender => {
                Verdict::rejected("Not oracle admin")
            }
            Some(_) => Verdict::ok(),
            None => Verdict::rejected("Unknown oracle"),
        },
        TxPayload::CreateContractSeries {
            native,
            underlying_oracle_id,
            collateral_property_id,
            ..
        } => {
            if !native && ctx.oracle(*underlying_oracle_id).is_none() {
                return Verdict::rejected("Unknown oracle");
            }
            if *collateral_property_id != NATIVE_PROPERTY
                && ctx.property(*collateral_property_id).is_none()
            {
                return Verdict::rejected("Unknown collateral property");
            }
            Verdict::ok()
        }
        TxPayload::ExerciseDerivative { contract_id, .. }
        | TxPayload::TradeContractOnchain { contract_id, .. }
        | TxPayload::SettleChannelPnl { contract_id, .. } => {
            if ctx.contract_series(*contract_id).is_none() {
                return Verdict::rejected("Unknown contract");
            }
            Verdict::ok()
        }
        TxPayload::TradeContractChannel {
            contract_id,
            expiry_block,
            ..
        } => {
            if ctx.contract_series(*contract_id).is_none() {
                return Verdict::rejected("Unknown contract");
            }
            if *expiry_block <= height {
                return Verdict::rejected("Expired commitment");
            }
            Verdict::ok()
        }
        TxPayload::TradeTokensChannel {
            offered_property_id,
            desired_property_id,
            expiry_block,
            ..
        } => {
            if !property_exists(ctx, offered_property_id)
                || !property_exists(ctx, desired_property_id)
            {
                return Verdict::rejected("Unknown property");
            }
            if *expiry_block <= height {
                return Verdict::rejected("Expired commitment");
            }
            Verdict::ok()
        }
        TxPayload::Withdrawal { property_id, .. } | TxPayload::Transfer { property_id, .. } => {
            if !property_exists(ctx, property_id) {
                return Verdict::rejected("Unknown property");
            }
            Verdict::ok()
        }
        TxPayload::MintSynthetic {
            collateral_property_id,
            contract_id,
            amount,
        } => {
            if ctx.property(*collateral_property_id).is_none() {
                return Verdict::rejected("Unknown collateral property");
            }
            if ctx.contract_series(*contract_id).is_none() {
                return Verdict::rejected("Unknown contract");
            }
            if !covers(
                ctx,
                sender,
                &PropertyId::Linear(*collateral_property_id),
                amount,
            ) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::RedeemSynthetic {
            synthetic_id,
            amount,
        } => {
            if !synthetic_id.is_synthetic() || !property_exists(ctx, synthetic_id) {
                return Verdict::rejected("Not a synthetic property");
            }
            if !covers(ctx, sender, synthetic_id, amount) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::PayToTokens {
            target_property_id,
            used_property_id,
            amount,
        } => {
            if !property_exists(ctx, target_property_id)
                || !property_exists(ctx, used_property_id)
            {
                return Verdict::rejected("Unknown property");
            }
            if !covers(ctx, sender, used_property_id, amount) {
                return Verdict::rejected("Insufficient balance");
            }
            Verdict::ok()
        }
        TxPayload::CreateOptionSeries {
            contract_series_id, ..
        } => {
            if ctx.contract_series(*contract_series_id).is_none() {
                return Verdict::rejected("Unknown contract");
            }
            Verdict::ok()
        }
        TxPayload::TradeBaiUrbun {
            down_payment_property_id,
            sale_property_id,
            expiry_block,
            ..
        } => {
            if !property_exists(ctx, down_payment_property_id)
                || !property_exists(ctx, sale_property_id)
            {
                return Verdict::rejected("Unknown property");
            }
            if *expiry_block <= height {
                return Verdict::rejected("Expired commitment");
            }
            Verdict::ok()
        }
        TxPayload::TradeMurabaha {
            property_id,
            expiry_block,
            ..
        } => {
            if !property_exists(ctx, property_id) {
                return Verdict::rejected("Unknown property");
            }
            if *expiry_block <= height {
                return Verdict::rejected("Expired commitment");
            }
            Verdict::ok()
        }
        TxPayload::IssueInvoice {
            property_id,
            due_date_block,
            ..
        } => {
            if !property_exists(ctx, property_id) {
                return Verdict::rejected("Unknown property");
            }
            if *due_date_block <= height {
                return Verdict::rejected("Due date in the past");
            }
            Verdict::ok()
        }
        TxPayload::BatchMoveZkRollup { proof, .. } => {
            if proof.is_empty() {
                return Verdict::rejected("Missing proof");
            }
            Verdict::ok()
        }
        TxPayload::PublishNewTx {
            ordinal_reveal_json,
        } => {
            if ordinal_reveal_json.is_empty() {
                return Verdict::rejected("Empty reveal");
            }
            Verdict::ok()
        }
        TxPayload::CreateDerivativeOfLrc20 {
            series_id_1,
            series_id_2,
            ..
        } => {
            if ctx.contract_series(*series_id_1).is_none()
                || ctx.contract_series(*series_id_2).is_none()
            {
                return Verdict::rejected("Unknown contract");
            }
            Verdict::ok()
        }
        TxPayload::RegisterOpCtvCovenant { txid, .. } => {
            if txid.len() != 64 || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Verdict::rejected("Malformed txid");
            }
            Verdict::ok()
        }
        TxPayload::MintColoredCoin {
            property_id,
            amount,
            ..
        } => match linear_property(ctx, property_id) {
            Some((_, info)) => {
                if info.admin != sender {
                    return Verdict::rejected("Not property issuer");
                }
                if amount.is_zero() {
                    return Verdict::rejected("Zero amount");
                }
                Verdict::ok()
            }
            None => Verdict::rejected("Unknown property"),
        },
    }
}

fn check_send(ctx: &LedgerContext, sender: &str, send: &SendPayload) -> Verdict {
    match send {
        SendPayload::Single {
            property_id,
            amount,
            ..
        } => check_one_send(ctx, sender, property_id, amount),
        SendPayload::Batch {
            property_ids,
            amounts,
            ..
        } => {
            if property_ids.len() != amounts.len() {
                return Verdict::rejected("Mismatched batch");
            }
            for (id, amount) in property_ids.iter().zip(amounts) {
                let v = check_one_send(ctx, sender, id, amount);
                if !v.valid {
                    return v;
                }
            }
            Verdict::ok()
        }
    }
}

fn check_one_send(
    ctx: &LedgerContext,
    sender: &str,
    id: &PropertyId,
    amount: &TokenAmount,
) -> Verdict {
    if !property_exists(ctx, id) {
        return Verdict::rejected("Unknown property");
    }
    if !covers(ctx, sender, id, amount) {
        return Verdict::rejected("Insufficient balance");
    }
    Verdict::ok()
}

fn linear_property<'c>(
    ctx: &'c LedgerContext,
    id: &PropertyId,
) -> Option<(u64, &'c crate::context::PropertyInfo)> {
    match id {
        PropertyId::Linear(n) => ctx.property(*n).map(|info| (*n, info)),
        PropertyId::Synthetic { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use tally_txfmt::AddressRef;

    use super::*;
    use crate::context::{OracleInfo, PropertyInfo, WhitelistInfo};

    fn tcx(sender: &str) -> TxContext {
        TxContext {
            sender: sender.to_owned(),
            txid: "cd".repeat(32),
            block_height: 1000,
            vouts: vec![],
        }
    }

    fn seeded() -> Arc<RwLock<LedgerContext>> {
        let mut ctx = LedgerContext::new();
        let pid = ctx.register_property(PropertyInfo {
            ticker: "TKN".to_owned(),
            admin: "alice".to_owned(),
            managed: false,
            nft: false,
            whitelist_ids: vec![],
        });
        ctx.credit("alice", PropertyId::Linear(pid), TokenAmount::from_whole(100));
        Arc::new(RwLock::new(ctx))
    }

    async fn verdict_of(ctx: Arc<RwLock<LedgerContext>>, sender: &str, p: TxPayload) -> Verdict {
        let validator = LedgerValidator::new(ctx);
        validator
            .validate(&tcx(sender), TxType::Send, &p, &[])
            .await
    }

    #[tokio::test]
    async fn send_within_balance_passes() {
        let p = TxPayload::Send(SendPayload::Single {
            address: AddressRef::Direct("bob".to_owned()),
            property_id: PropertyId::Linear(1),
            amount: TokenAmount::from_whole(40),
        });
        assert!(verdict_of(seeded(), "alice", p).await.valid);
    }

    #[tokio::test]
    async fn send_over_balance_is_rejected_not_an_error() {
        let p = TxPayload::Send(SendPayload::Single {
            address: AddressRef::Direct("bob".to_owned()),
            property_id: PropertyId::Linear(1),
            amount: TokenAmount::from_whole(101),
        });
        let v = verdict_of(seeded(), "alice", p).await;
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("Insufficient balance"));
    }

    #[tokio::test]
    async fn send_of_unknown_property_is_rejected() {
        let p = TxPayload::Send(SendPayload::Single {
            address: AddressRef::Direct("bob".to_owned()),
            property_id: PropertyId::Linear(99),
            amount: TokenAmount::from_whole(1),
        });
        let v = verdict_of(seeded(), "alice", p).await;
        assert_eq!(v.reason.as_deref(), Some("Unknown property"));
    }

    #[tokio::test]
    async fn batch_send_fails_on_first_bad_leg() {
        let ctx = seeded();
        let p = TxPayload::Send(SendPayload::Batch {
            address: AddressRef::Direct("bob".to_owned()),
            property_ids: vec![PropertyId::Linear(1), PropertyId::Linear(99)],
            amounts: vec![TokenAmount::from_whole(1), TokenAmount::from_whole(1)],
        });
        let v = verdict_of(ctx, "alice", p).await;
        assert_eq!(v.reason.as_deref(), Some("Unknown property"));
    }

    #[tokio::test]
    async fn managed_grant_requires_issuer() {
        let ctx = Arc::new(RwLock::new(LedgerContext::new()));
        let pid = ctx.write().register_property(PropertyInfo {
            ticker: "MGD".to_owned(),
            admin: "alice".to_owned(),
            managed: true,
            nft: false,
            whitelist_ids: vec![],
        });
        let p = TxPayload::GrantManagedToken {
            property_id: PropertyId::Linear(pid),
            amount: TokenAmount::from_whole(5),
            to_address: AddressRef::Direct("carol".to_owned()),
        };
        let v = verdict_of(ctx.clone(), "mallory", p.clone()).await;
        assert_eq!(v.reason.as_deref(), Some("Not property issuer"));
        assert!(verdict_of(ctx, "alice", p).await.valid);
    }

    #[tokio::test]
    async fn oracle_publish_requires_admin() {
        let ctx = Arc::new(RwLock::new(LedgerContext::new()));
        let oid = ctx.write().register_oracle(OracleInfo {
            ticker: "LTC/USD".to_owned(),
            url: String::new(),
            admin: "oracle-op".to_owned(),
            backup: "oracle-backup".to_owned(),
            lag: 0,
            closed: false,
        });
        let p = TxPayload::PublishOracleData {
            oracle_id: oid,
            price: TokenAmount::from_whole(80),
            high: TokenAmount::from_whole(82),
            low: TokenAmount::from_whole(79),
            close: TokenAmount::from_whole(81),
        };
        let v = verdict_of(ctx.clone(), "mallory", p.clone()).await;
        assert_eq!(v.reason.as_deref(), Some("Not oracle admin"));
        assert!(verdict_of(ctx, "oracle-op", p).await.valid);
    }

    #[tokio::test]
    async fn attestation_requires_whitelist_admin() {
        let ctx = Arc::new(RwLock::new(LedgerContext::new()));
        let wid = ctx.write().register_whitelist(WhitelistInfo {
            admin: "kyc-desk".to_owned(),
            name: "kyc".to_owned(),
            url: String::new(),
            attested: Default::default(),
        });
        let p = TxPayload::IssueAttestation {
            target_address: AddressRef::Direct("bob".to_owned()),
            whitelist_id: wid,
            metadata: String::new(),
        };
        let v = verdict_of(ctx.clone(), "bob", p.clone()).await;
        assert_eq!(v.reason.as_deref(), Some("Not whitelist admin"));
        assert!(verdict_of(ctx, "kyc-desk", p).await.valid);
    }

    #[tokio::test]
    async fn activation_gate_honors_configured_admin() {
        let ctx = Arc::new(RwLock::new(
            LedgerContext::new().with_activation_admin("foundation"),
        ));
        let p = TxPayload::ActivateProtocol {
            feature_id: 7,
            activation_block: 2000,
            min_client_version: 1,
        };
        let v = verdict_of(ctx.clone(), "mallory", p.clone()).await;
        assert_eq!(v.reason.as_deref(), Some("Not activation admin"));
        assert!(verdict_of(ctx, "foundation", p).await.valid);
    }

    #[tokio::test]
    async fn redeem_synthetic_demands_synthetic_id() {
        let p = TxPayload::RedeemSynthetic {
            synthetic_id: PropertyId::Linear(1),
            amount: TokenAmount::from_whole(1),
        };
        let v = verdict_of(seeded(), "alice", p).await;
        assert_eq!(v.reason.as_deref(), Some("Not a synthetic property"));
    }
}
