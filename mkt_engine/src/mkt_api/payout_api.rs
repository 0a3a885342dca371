use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Actor, Payout, PayoutStatus, Role},
    events::{EventProducers, Party, PayoutEvent, PayoutEventKind},
    mkt_api::{
        access::vendor_for_actor,
        order_objects::{non_empty, required},
        payout_objects::{PayoutDecision, PayoutRequest},
    },
    traits::{Balance, CatalogManagement, MarketplaceError, NewPayout, PayoutManagement},
};

/// Batches a vendor's settled, unpaid payments into payouts and walks them through admin approval.
#[derive(Clone)]
pub struct PayoutApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B> PayoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PayoutApi<B>
where B: PayoutManagement + CatalogManagement
{
    /// Requests a payout of everything the vendor has earned in the period and not been paid for yet.
    /// Fails with `NoFunds` when there is nothing to pay out.
    pub async fn request(&self, actor: &Actor, request: PayoutRequest) -> Result<Payout, MarketplaceError> {
        if actor.role != Role::Vendor {
            return Err(MarketplaceError::forbidden("Only vendors can request payouts"));
        }
        let vendor = vendor_for_actor(&self.db, actor).await?;
        if !vendor.can_trade() {
            return Err(MarketplaceError::forbidden("Vendor account is not active"));
        }
        let period_start = request.period_start.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let period_end = request.period_end.unwrap_or_else(Utc::now);
        if period_start > period_end {
            return Err(MarketplaceError::validation("The payout period ends before it starts"));
        }
        let payout = NewPayout {
            vendor_id: vendor.id,
            method: request.method,
            period_start,
            period_end,
            notes: non_empty(request.notes),
        };
        let payout = self.db.request_payout(payout).await?;
        info!(
            "🏦️ Payout #{} requested by vendor #{}: {} over {} payments",
            payout.id, vendor.id, payout.amount, payout.transaction_count
        );
        self.publish(payout.clone(), PayoutEventKind::Requested).await;
        Ok(payout)
    }

    /// Approves (pending -> processing) or rejects (-> cancelled) a payout. Rejecting releases the linked payments
    /// so they can be claimed by a later payout.
    pub async fn process(
        &self,
        actor: &Actor,
        id: i64,
        decision: PayoutDecision,
        notes: Option<String>,
    ) -> Result<Payout, MarketplaceError> {
        require_admin(actor)?;
        let notes = non_empty(notes);
        let (result, kind) = match decision {
            PayoutDecision::Approve => (self.db.approve_payout(id, actor.id, notes).await?, PayoutEventKind::Approved),
            PayoutDecision::Reject => (self.db.reject_payout(id, actor.id, notes).await?, PayoutEventKind::Rejected),
        };
        let payout = match result {
            Some(p) => p,
            None => return Err(self.state_error(id, "processed").await),
        };
        info!("🏦️ Payout #{id} is now {} ({actor})", payout.status);
        self.publish(payout.clone(), kind).await;
        Ok(payout)
    }

    /// Marks an approved payout as paid out, recording the transfer reference.
    pub async fn complete(
        &self,
        actor: &Actor,
        id: i64,
        reference: Option<String>,
    ) -> Result<Payout, MarketplaceError> {
        require_admin(actor)?;
        let reference = required(reference, "transfer reference")?;
        let payout = match self.db.complete_payout(id, actor.id, &reference).await? {
            Some(p) => p,
            None => return Err(self.state_error(id, "completed").await),
        };
        info!("🏦️ Payout #{id} completed. Reference {reference}");
        self.publish(payout.clone(), PayoutEventKind::Completed).await;
        Ok(payout)
    }

    /// Vendors see their own payouts. Admins see all of them, optionally filtered by status.
    pub async fn list(&self, actor: &Actor, status: Option<PayoutStatus>) -> Result<Vec<Payout>, MarketplaceError> {
        match actor.role {
            Role::Vendor => {
                let vendor = vendor_for_actor(&self.db, actor).await?;
                let payouts = self.db.payouts_for_vendor(vendor.id).await?;
                Ok(payouts.into_iter().filter(|p| status.map(|s| p.status == s).unwrap_or(true)).collect())
            },
            Role::Admin | Role::SuperAdmin => self.db.search_payouts(status).await,
            Role::Customer => Err(MarketplaceError::forbidden("Customers have no payouts")),
        }
    }

    pub async fn payouts_for_vendor(&self, vendor_id: i64) -> Result<Vec<Payout>, MarketplaceError> {
        self.db.payouts_for_vendor(vendor_id).await
    }

    pub async fn fetch_payout(&self, actor: &Actor, id: i64) -> Result<Payout, MarketplaceError> {
        let payout =
            self.db.fetch_payout(id).await?.ok_or_else(|| MarketplaceError::not_found(format!("Payout #{id}")))?;
        match actor.role {
            Role::Admin | Role::SuperAdmin => Ok(payout),
            Role::Vendor => {
                let vendor = vendor_for_actor(&self.db, actor).await?;
                if vendor.id == payout.vendor_id {
                    Ok(payout)
                } else {
                    Err(MarketplaceError::forbidden("You do not have access to this payout"))
                }
            },
            Role::Customer => Err(MarketplaceError::forbidden("You do not have access to this payout")),
        }
    }

    /// What the vendor could request a payout for right now.
    pub async fn available_balance(&self, actor: &Actor) -> Result<Balance, MarketplaceError> {
        let vendor = vendor_for_actor(&self.db, actor).await?;
        self.db.available_balance(vendor.id).await
    }

    async fn state_error(&self, id: i64, action: &str) -> MarketplaceError {
        match self.db.fetch_payout(id).await {
            Ok(Some(p)) => {
                MarketplaceError::InvalidState(format!("Payout #{id} is {} and cannot be {action}", p.status))
            },
            Ok(None) => MarketplaceError::not_found(format!("Payout #{id}")),
            Err(e) => e,
        }
    }

    async fn publish(&self, payout: Payout, kind: PayoutEventKind) {
        let vendor = match self.db.fetch_vendor(payout.vendor_id).await {
            Ok(v) => v.as_ref().map(Party::from),
            Err(e) => {
                warn!("📬️ Could not load vendor #{} for a payout event. {e}", payout.vendor_id);
                None
            },
        };
        self.producers.publish_payout_event(PayoutEvent { payout, kind, vendor }).await;
    }
}

fn require_admin(actor: &Actor) -> Result<(), MarketplaceError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden("Only admins can process payouts"))
    }
}
