//! Ownership checks shared by the public APIs.
use log::*;

use crate::{
    db_types::{Actor, Order, Role, Vendor},
    events::{Contacts, Party},
    traits::{CatalogManagement, MarketplaceError},
};

/// The vendor profile behind a vendor actor. Missing profiles are `Forbidden`, not `NotFound`: the caller is
/// authenticated as a vendor but has nothing to act on.
pub async fn vendor_for_actor<B: CatalogManagement>(db: &B, actor: &Actor) -> Result<Vendor, MarketplaceError> {
    db.fetch_vendor_by_user(actor.id)
        .await?
        .ok_or_else(|| MarketplaceError::forbidden(format!("User {} has no vendor profile", actor.id)))
}

/// Checks that `actor` may see or act on `order`.
///
/// Customers must own the order, vendors must own the vendor profile the order was placed with and admins may act on
/// anything. When `require_trading` is set, the vendor must also be approved and active.
pub async fn authorize_order<B: CatalogManagement>(
    db: &B,
    actor: &Actor,
    order: &Order,
    require_trading: bool,
) -> Result<(), MarketplaceError> {
    match actor.role {
        Role::Customer if order.customer_id == actor.id => Ok(()),
        Role::Customer => Err(MarketplaceError::forbidden("You do not have access to this order")),
        Role::Vendor => {
            let vendor = vendor_for_actor(db, actor).await?;
            if vendor.id != order.vendor_id {
                return Err(MarketplaceError::forbidden("You do not have access to this order"));
            }
            if require_trading && !vendor.can_trade() {
                return Err(MarketplaceError::forbidden("Vendor account is not active"));
            }
            Ok(())
        },
        Role::Admin | Role::SuperAdmin => Ok(()),
    }
}

/// Loads the names and email addresses of both sides of an order. Lookup failures only cost us a notification, so
/// they are logged and the party is left out.
pub async fn load_contacts<B: CatalogManagement>(db: &B, customer_id: i64, vendor_id: i64) -> Contacts {
    let customer = match db.fetch_user(customer_id).await {
        Ok(user) => user.as_ref().map(Party::from),
        Err(e) => {
            warn!("📬️ Could not load customer #{customer_id} for a notification. {e}");
            None
        },
    };
    let vendor = match db.fetch_vendor(vendor_id).await {
        Ok(vendor) => vendor.as_ref().map(Party::from),
        Err(e) => {
            warn!("📬️ Could not load vendor #{vendor_id} for a notification. {e}");
            None
        },
    };
    Contacts { customer, vendor }
}
