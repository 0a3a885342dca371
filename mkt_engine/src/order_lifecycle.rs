//! The order state machine.
//!
//! | action      | who                | legal from                          |
//! |-------------|--------------------|-------------------------------------|
//! | accept      | vendor             | pending                             |
//! | reject      | vendor             | pending                             |
//! | start       | vendor             | accepted                            |
//! | complete    | vendor             | in_progress                         |
//! | cancel      | customer, vendor   | pending, accepted                   |
//! | cancel      | admin              | any state that is not terminal      |
//! | reschedule  | customer, vendor   | pending, accepted                   |
//! | applyCoupon | customer           | pending                             |
//!
//! Completed, cancelled and rejected orders are terminal.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OrderStatusType, Role},
    traits::MarketplaceError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Accept,
    Reject,
    Start,
    Complete,
    Cancel,
    Reschedule,
    ApplyCoupon,
}

impl OrderAction {
    pub fn all() -> [OrderAction; 7] {
        use OrderAction::*;
        [Accept, Reject, Start, Complete, Cancel, Reschedule, ApplyCoupon]
    }
}

impl Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderAction::Accept => "accept",
            OrderAction::Reject => "reject",
            OrderAction::Start => "start",
            OrderAction::Complete => "complete",
            OrderAction::Cancel => "cancel",
            OrderAction::Reschedule => "reschedule",
            OrderAction::ApplyCoupon => "apply a coupon to",
        };
        write!(f, "{s}")
    }
}

/// Can a party with `role` perform `action` at all, regardless of order status?
pub fn role_may(role: Role, action: OrderAction) -> bool {
    use OrderAction::*;
    match action {
        Accept | Reject | Start | Complete => role == Role::Vendor,
        Cancel => true,
        Reschedule => matches!(role, Role::Customer | Role::Vendor),
        ApplyCoupon => role == Role::Customer,
    }
}

/// The statuses from which `role` may perform `action`.
pub fn legal_from(role: Role, action: OrderAction) -> &'static [OrderStatusType] {
    use OrderStatusType::*;
    match action {
        OrderAction::Accept | OrderAction::Reject | OrderAction::ApplyCoupon => &[Pending],
        OrderAction::Start => &[Accepted],
        OrderAction::Complete => &[InProgress],
        OrderAction::Reschedule => &[Pending, Accepted],
        OrderAction::Cancel if role.is_admin() => &[Pending, Accepted, InProgress],
        OrderAction::Cancel => &[Pending, Accepted],
    }
}

/// Checks a transition against the table. Role violations are `Forbidden`; status violations are `InvalidState`.
pub fn check_transition(role: Role, action: OrderAction, current: OrderStatusType) -> Result<(), MarketplaceError> {
    if !role_may(role, action) {
        return Err(MarketplaceError::Forbidden(format!("Users with the {role} role may not {action} an order")));
    }
    if !legal_from(role, action).contains(&current) {
        return Err(MarketplaceError::InvalidState(format!("Cannot {action} an order that is {current}")));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderStatusType::*;

    const ALL_STATUSES: [OrderStatusType; 6] = [Pending, Accepted, Rejected, InProgress, Completed, Cancelled];

    #[test]
    fn vendor_happy_path() {
        assert!(check_transition(Role::Vendor, OrderAction::Accept, Pending).is_ok());
        assert!(check_transition(Role::Vendor, OrderAction::Start, Accepted).is_ok());
        assert!(check_transition(Role::Vendor, OrderAction::Complete, InProgress).is_ok());
    }

    #[test]
    fn vendor_cannot_cancel_in_progress() {
        let err = check_transition(Role::Vendor, OrderAction::Cancel, InProgress).unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidState(_)));
    }

    #[test]
    fn admin_cancel() {
        assert!(check_transition(Role::Admin, OrderAction::Cancel, InProgress).is_ok());
        assert!(check_transition(Role::SuperAdmin, OrderAction::Cancel, Accepted).is_ok());
        for s in [Completed, Cancelled, Rejected] {
            assert!(matches!(
                check_transition(Role::Admin, OrderAction::Cancel, s),
                Err(MarketplaceError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn wrong_role_is_forbidden() {
        assert!(matches!(
            check_transition(Role::Customer, OrderAction::Accept, Pending),
            Err(MarketplaceError::Forbidden(_))
        ));
        assert!(matches!(
            check_transition(Role::Vendor, OrderAction::ApplyCoupon, Pending),
            Err(MarketplaceError::Forbidden(_))
        ));
        assert!(matches!(
            check_transition(Role::Admin, OrderAction::Reschedule, Pending),
            Err(MarketplaceError::Forbidden(_))
        ));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for role in [Role::Customer, Role::Vendor, Role::Admin, Role::SuperAdmin] {
            for action in OrderAction::all() {
                for status in ALL_STATUSES.iter().filter(|s| s.is_terminal()) {
                    assert!(check_transition(role, action, *status).is_err(), "{role} {action} {status}");
                }
            }
        }
    }

    #[test]
    fn every_illegal_pair_is_invalid_state() {
        for action in OrderAction::all() {
            for role in [Role::Customer, Role::Vendor, Role::Admin] {
                if !role_may(role, action) {
                    continue;
                }
                for status in ALL_STATUSES {
                    let result = check_transition(role, action, status);
                    if legal_from(role, action).contains(&status) {
                        assert!(result.is_ok());
                    } else {
                        assert!(matches!(result, Err(MarketplaceError::InvalidState(_))), "{role} {action} {status}");
                    }
                }
            }
        }
    }
}
