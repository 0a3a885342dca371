use chrono::Utc;
use mkt_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Payout, PayoutStatus, Transaction},
    traits::{Balance, MarketplaceError, NewPayout},
};

const ELIGIBLE: &str = "status = 'completed' AND transaction_type = 'payment' AND payout_id IS NULL";

pub async fn insert_payout(payout: &NewPayout, conn: &mut SqliteConnection) -> Result<Payout, MarketplaceError> {
    let payout = sqlx::query_as(
        r#"
            INSERT INTO payouts (vendor_id, method, period_start, period_end, admin_notes, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(payout.vendor_id)
    .bind(payout.method)
    .bind(payout.period_start)
    .bind(payout.period_end)
    .bind(&payout.notes)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(payout)
}

/// Links every eligible payment of the vendor completed inside the payout's period. Each row is only claimed if its
/// `payout_id` is still unset, so concurrent payouts cannot both claim it. Returns the number of linked payments.
pub async fn claim_eligible_transactions(payout: &Payout, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let sql = format!(
        r#"
            UPDATE transactions SET payout_id = $1, updated_at = $2
            WHERE vendor_id = $3 AND {ELIGIBLE} AND completed_at >= $4 AND completed_at <= $5
        "#
    );
    let result = sqlx::query(&sql)
        .bind(payout.id)
        .bind(Utc::now())
        .bind(payout.vendor_id)
        .bind(payout.period_start)
        .bind(payout.period_end)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn linked_total(payout_id: i64, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let (transaction_count, amount): (i64, Money) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(vendor_amount), 0) FROM transactions WHERE payout_id = $1",
    )
    .bind(payout_id)
    .fetch_one(conn)
    .await?;
    Ok(Balance { transaction_count, amount })
}

pub async fn set_totals(
    payout_id: i64,
    totals: Balance,
    conn: &mut SqliteConnection,
) -> Result<Payout, MarketplaceError> {
    let payout = sqlx::query_as("UPDATE payouts SET amount = $1, transaction_count = $2 WHERE id = $3 RETURNING *")
        .bind(totals.amount)
        .bind(totals.transaction_count)
        .bind(payout_id)
        .fetch_one(conn)
        .await?;
    Ok(payout)
}

pub async fn fetch_payout(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn payouts_for_vendor(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE vendor_id = $1 ORDER BY id DESC").bind(vendor_id).fetch_all(conn).await
}

pub async fn search_payouts(
    status: Option<PayoutStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payout>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payouts WHERE ($1 IS NULL OR status = $1) ORDER BY id DESC")
        .bind(status)
        .fetch_all(conn)
        .await
}

pub async fn transactions_for_payout(
    payout_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE payout_id = $1 ORDER BY id").bind(payout_id).fetch_all(conn).await
}

/// Compare-and-set on the payout status. Returns `None` if the payout was in none of the `from` states.
pub async fn update_status(
    id: i64,
    from: &[PayoutStatus],
    to: PayoutStatus,
    admin_id: i64,
    notes: Option<String>,
    reference: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payout>, sqlx::Error> {
    let now = Utc::now();
    let from = from.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ");
    let completed_at = if to == PayoutStatus::Completed { Some(now) } else { None };
    let sql = format!(
        r#"
            UPDATE payouts SET
                status = $1,
                processed_by = $2,
                processed_at = COALESCE(processed_at, $3),
                admin_notes = COALESCE($4, admin_notes),
                gateway_reference = COALESCE($5, gateway_reference),
                completed_at = COALESCE($6, completed_at)
            WHERE id = $7 AND status IN ({from})
            RETURNING *;
        "#
    );
    sqlx::query_as(&sql)
        .bind(to)
        .bind(admin_id)
        .bind(now)
        .bind(notes)
        .bind(reference)
        .bind(completed_at)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Releases the payments linked to a payout so they become eligible again.
pub async fn release_transactions(payout_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE transactions SET payout_id = NULL, updated_at = $1 WHERE payout_id = $2")
        .bind(Utc::now())
        .bind(payout_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn available_balance(vendor_id: i64, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(vendor_amount), 0) FROM transactions WHERE vendor_id = $1 AND {ELIGIBLE}"
    );
    let (transaction_count, amount): (i64, Money) = sqlx::query_as(&sql).bind(vendor_id).fetch_one(conn).await?;
    Ok(Balance { transaction_count, amount })
}
