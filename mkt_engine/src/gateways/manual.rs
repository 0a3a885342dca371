use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Actor, OrderNumber, PaymentMethod, PaymentProof, Role, Transaction},
    gateways::callback::GatewayCallback,
    mkt_api::{
        ledger_api::LedgerApi,
        ledger_objects::SettlementResult,
        order_objects::{non_empty, required},
    },
    traits::{CatalogManagement, LedgerManagement, MarketplaceError, OrderManagement},
};

/// A customer's manual payment submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPaymentRequest {
    pub order_number: OrderNumber,
    pub reference: Option<String>,
    #[serde(default)]
    pub proof_file_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Bank transfers and other off-platform payments. The customer submits a proof, and an admin settles or fails the
/// payment by hand. There is no gateway callback.
pub struct ManualAdapter<B> {
    ledger: LedgerApi<B>,
}

impl<B> ManualAdapter<B> {
    pub fn new(ledger: LedgerApi<B>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &LedgerApi<B> {
        &self.ledger
    }
}

impl<B> ManualAdapter<B>
where B: CatalogManagement + OrderManagement + LedgerManagement
{
    /// Records the proof and opens a `processing` payment that waits for an admin.
    pub async fn submit(&self, actor: &Actor, request: ManualPaymentRequest) -> Result<Transaction, MarketplaceError> {
        if actor.role != Role::Customer {
            return Err(MarketplaceError::forbidden("Only customers can submit payments"));
        }
        let proof = PaymentProof {
            reference: required(request.reference, "payment reference")?,
            proof_file_id: non_empty(request.proof_file_id),
            notes: non_empty(request.notes),
        };
        let (order, transaction) =
            self.ledger.initiate(actor, &request.order_number, PaymentMethod::Manual, Some(proof)).await?;
        info!(
            "🔌️ Manual payment {} submitted for order [{}]. Awaiting verification.",
            transaction.transaction_number, order.order_number
        );
        Ok(transaction)
    }

    /// An admin's verdict on a manual payment.
    pub async fn verify(
        &self,
        actor: &Actor,
        transaction_id: i64,
        approved: bool,
        notes: Option<String>,
    ) -> Result<SettlementResult, MarketplaceError> {
        if !actor.role.is_admin() {
            return Err(MarketplaceError::forbidden("Only admins can verify manual payments"));
        }
        let transaction = self.ledger.fetch_transaction(actor, transaction_id).await?;
        if transaction.payment_method != PaymentMethod::Manual {
            return Err(MarketplaceError::InvalidState(format!(
                "Transaction {} is not a manual payment",
                transaction.transaction_number
            )));
        }
        let notes = non_empty(notes);
        let callback = GatewayCallback::Manual { transaction_id, approved, admin_id: actor.id, notes };
        let settlement = callback
            .into_settlement()?
            .ok_or_else(|| MarketplaceError::invalid_state("The decision carried no verdict"))?;
        let result = self.ledger.settle(settlement).await?;
        info!(
            "🔌️ Manual payment {} {} by {actor}",
            transaction.transaction_number,
            if approved { "approved" } else { "rejected" }
        );
        Ok(result)
    }
}
