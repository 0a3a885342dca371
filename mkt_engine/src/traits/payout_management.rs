use crate::{
    db_types::{Payout, PayoutStatus, Transaction},
    traits::{Balance, MarketplaceError, NewPayout},
};

#[allow(async_fn_in_trait)]
pub trait PayoutManagement {
    /// Creates a payout and claims every eligible payment of the vendor in the period, in one database transaction.
    ///
    /// Claiming is a conditional update on `payout_id IS NULL`, so two concurrent requests can never claim the same
    /// payment. Fails with `NoFunds` (and writes nothing) if nothing was claimed or the claimed total is not positive.
    async fn request_payout(&self, payout: NewPayout) -> Result<Payout, MarketplaceError>;

    async fn fetch_payout(&self, id: i64) -> Result<Option<Payout>, MarketplaceError>;

    async fn payouts_for_vendor(&self, vendor_id: i64) -> Result<Vec<Payout>, MarketplaceError>;

    async fn search_payouts(&self, status: Option<PayoutStatus>) -> Result<Vec<Payout>, MarketplaceError>;

    async fn transactions_for_payout(&self, payout_id: i64) -> Result<Vec<Transaction>, MarketplaceError>;

    /// pending -> processing. `None` if the payout was not pending.
    async fn approve_payout(
        &self,
        id: i64,
        admin_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Payout>, MarketplaceError>;

    /// pending or processing -> cancelled, releasing every linked payment. `None` if the payout was in neither state.
    async fn reject_payout(
        &self,
        id: i64,
        admin_id: i64,
        notes: Option<String>,
    ) -> Result<Option<Payout>, MarketplaceError>;

    /// processing -> completed. `None` if the payout was not processing.
    async fn complete_payout(
        &self,
        id: i64,
        admin_id: i64,
        reference: &str,
    ) -> Result<Option<Payout>, MarketplaceError>;

    /// The total vendor share of payments that are currently eligible for a payout.
    async fn available_balance(&self, vendor_id: i64) -> Result<Balance, MarketplaceError>;
}
