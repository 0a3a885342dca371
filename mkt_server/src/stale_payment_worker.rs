use chrono::Duration;
use log::*;
use mkt_engine::{db_types::Transaction, LedgerApi, SqliteDatabase};
use tokio::task::JoinHandle;

const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Starts the stale payment worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Card and redirect payments that have been waiting on the gateway for longer than `max_age` are failed. A gateway
/// confirmation that arrives afterwards still settles them.
pub fn start_stale_payment_worker(ledger: LedgerApi<SqliteDatabase>, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(SWEEP_INTERVAL);
        info!("🕰️ Stale payment worker started. Payments time out after {} minutes", max_age.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running stale payment sweep");
            match ledger.expire_stale_transactions(max_age).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} stale payments expired", expired.len());
                    debug!("🕰️ Expired payments: {}", transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running stale payment sweep: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|t| format!("[{}] {} order #{}", t.id, t.transaction_number, t.order_id))
        .collect::<Vec<String>>()
        .join(", ")
}
