use std::future::Future;

use chrono::Utc;
use log::warn;
use rand::{distributions::Alphanumeric, Rng};

use crate::traits::MarketplaceError;

/// How many times a freshly generated identifier is retried when it collides with an existing one.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

fn random_suffix(len: usize) -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(len).map(|c| char::from(c).to_ascii_uppercase()).collect()
}

/// A human-readable order number, e.g. `ORD-20240601-7QX2KD`.
pub fn new_order_number() -> String {
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), random_suffix(6))
}

/// A ledger transaction number, e.g. `TXN-20240601-Q4Z8M2WB`. Independent of any gateway identifier.
pub fn new_transaction_number() -> String {
    format!("TXN-{}-{}", Utc::now().format("%Y%m%d"), random_suffix(8))
}

/// Runs `insert` with a freshly generated number, retrying with a new number when the insert reports a `Conflict`.
pub async fn with_fresh_number<T, F, Fut>(generate: fn() -> String, mut insert: F) -> Result<T, MarketplaceError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, MarketplaceError>>,
{
    let mut last_err = MarketplaceError::Conflict("Could not generate a unique number".into());
    for _ in 0..MAX_NUMBER_ATTEMPTS {
        match insert(generate()).await {
            Err(e) if e.is_conflict() => {
                warn!("Generated number collided with an existing record. Retrying. {e}");
                last_err = e;
            },
            result => return result,
        }
    }
    Err(last_err)
}
