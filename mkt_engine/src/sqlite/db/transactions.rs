use chrono::{DateTime, Utc};
use log::trace;
use mkt_common::Money;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewTransaction, PaymentMethod, Transaction, TransactionStatus},
    traits::{MarketplaceError, SettlementDetails, StatusStats, TransactionQueryFilter, TransactionStats},
};

const IN_FLIGHT: &str = "status IN ('pending', 'processing')";

pub async fn insert_transaction(
    tx: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceError> {
    let now = Utc::now();
    let transaction: Transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                transaction_number,
                order_id,
                customer_id,
                vendor_id,
                transaction_type,
                payment_method,
                amount,
                commission_rate,
                commission_amount,
                vendor_amount,
                currency,
                status,
                gateway_reference,
                gateway_validation_id,
                payment_proof,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, 'payment', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING *;
        "#,
    )
    .bind(tx.transaction_number)
    .bind(tx.order_id)
    .bind(tx.customer_id)
    .bind(tx.vendor_id)
    .bind(tx.payment_method)
    .bind(tx.amount)
    .bind(tx.commission_rate)
    .bind(tx.commission_amount)
    .bind(tx.vendor_amount)
    .bind(tx.currency)
    .bind(tx.status)
    .bind(tx.gateway_reference)
    .bind(tx.gateway_validation_id)
    .bind(tx.payment_proof.map(Json))
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("💳️ Transaction {} inserted with id {}", transaction.transaction_number, transaction.id);
    Ok(transaction)
}

/// Inserts the ledger entry that records money returned from `parent`. The entry is completed on creation.
pub async fn insert_refund_entry(
    parent: &Transaction,
    number: &str,
    amount: Money,
    commission: Money,
    reason: &str,
    refunded_by: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Transaction, MarketplaceError> {
    let now = Utc::now();
    let entry = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                transaction_number,
                order_id,
                customer_id,
                vendor_id,
                transaction_type,
                payment_method,
                amount,
                commission_rate,
                commission_amount,
                vendor_amount,
                currency,
                status,
                gateway_reference,
                refund_reason,
                refunded_by,
                parent_id,
                completed_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, 'refund', $5, $6, $7, $8, $9, $10, 'completed', $11, $12, $13, $14, $15, $15, $15)
            RETURNING *;
        "#,
    )
    .bind(number)
    .bind(parent.order_id)
    .bind(parent.customer_id)
    .bind(parent.vendor_id)
    .bind(parent.payment_method)
    .bind(amount)
    .bind(parent.commission_rate)
    .bind(commission)
    .bind(amount - commission)
    .bind(&parent.currency)
    .bind(&parent.gateway_reference)
    .bind(reason)
    .bind(refunded_by)
    .bind(parent.id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_transaction(id: i64, conn: &mut SqliteConnection) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_transaction_by_number(
    number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE transaction_number = $1").bind(number).fetch_optional(conn).await
}

/// Looks up the payment entry carrying the gateway's own identifier.
pub async fn fetch_transaction_by_gateway_reference(
    method: PaymentMethod,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT * FROM transactions
            WHERE payment_method = $1 AND gateway_reference = $2 AND transaction_type = 'payment'
            ORDER BY id DESC LIMIT 1
        "#,
    )
    .bind(method)
    .bind(reference)
    .fetch_optional(conn)
    .await
}

pub async fn transactions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn in_flight_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let sql = format!(
        "SELECT * FROM transactions WHERE order_id = $1 AND transaction_type = 'payment' AND {IN_FLIGHT} ORDER BY id \
         DESC LIMIT 1"
    );
    sqlx::query_as(&sql).bind(order_id).fetch_optional(conn).await
}

pub async fn set_gateway_reference(
    id: i64,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("UPDATE transactions SET gateway_reference = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(reference)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Marks the payment completed if it is in flight, or if it was only failed locally (`expired`).
/// Returns `None` if the guard did not match, i.e. someone else already settled or failed it.
pub async fn settle(
    id: i64,
    details: SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let now = Utc::now();
    let sql = format!(
        r#"
            UPDATE transactions SET
                status = 'completed',
                expired = 0,
                failure_reason = NULL,
                gateway_validation_id = COALESCE($1, gateway_validation_id),
                gateway_transaction_id = COALESCE($2, gateway_transaction_id),
                gateway_response = COALESCE($3, gateway_response),
                verified_by = COALESCE($4, verified_by),
                admin_notes = COALESCE($5, admin_notes),
                completed_at = $6,
                updated_at = $6
            WHERE id = $7
              AND transaction_type = 'payment'
              AND ({IN_FLIGHT} OR (status = 'failed' AND expired = 1))
            RETURNING *;
        "#
    );
    sqlx::query_as(&sql)
        .bind(details.validation_id)
        .bind(details.gateway_transaction_id)
        .bind(details.gateway_response.map(Json))
        .bind(details.verified_by)
        .bind(details.admin_notes)
        .bind(now)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Marks an in-flight payment failed. Returns `None` if it was no longer in flight.
pub async fn fail(
    id: i64,
    reason: &str,
    expired: bool,
    details: SettlementDetails,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let sql = format!(
        r#"
            UPDATE transactions SET
                status = 'failed',
                expired = $1,
                failure_reason = $2,
                gateway_validation_id = COALESCE($3, gateway_validation_id),
                gateway_response = COALESCE($4, gateway_response),
                verified_by = COALESCE($5, verified_by),
                admin_notes = COALESCE($6, admin_notes),
                updated_at = $7
            WHERE id = $8 AND {IN_FLIGHT}
            RETURNING *;
        "#
    );
    sqlx::query_as(&sql)
        .bind(expired)
        .bind(reason)
        .bind(details.validation_id)
        .bind(details.gateway_response.map(Json))
        .bind(details.verified_by)
        .bind(details.admin_notes)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Fails every in-flight card or redirect payment created before `cutoff`, flagging the failures as expired.
pub async fn expire_stale(
    cutoff: DateTime<Utc>,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let sql = format!(
        r#"
            UPDATE transactions SET status = 'failed', expired = 1, failure_reason = $1, updated_at = $2
            WHERE {IN_FLIGHT}
              AND transaction_type = 'payment'
              AND payment_method IN ('card', 'redirect')
              AND created_at < $3
            RETURNING *;
        "#
    );
    sqlx::query_as(&sql).bind(reason).bind(Utc::now()).bind(cutoff).fetch_all(conn).await
}

/// Compare-and-set on the refunded amount. Returns `None` if another refund got there first.
pub async fn apply_refund(
    id: i64,
    expected_refund_amount: Money,
    new_refund_amount: Money,
    new_status: TransactionStatus,
    reason: &str,
    refunded_by: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
            UPDATE transactions SET
                refund_amount = $1,
                status = $2,
                refund_reason = $3,
                refunded_by = COALESCE($4, refunded_by),
                refunded_at = $5,
                updated_at = $5
            WHERE id = $6
              AND transaction_type = 'payment'
              AND status IN ('completed', 'partially_refunded')
              AND refund_amount = $7
            RETURNING *;
        "#,
    )
    .bind(new_refund_amount)
    .bind(new_status)
    .bind(reason)
    .bind(refunded_by)
    .bind(now)
    .bind(id)
    .bind(expected_refund_amount)
    .fetch_optional(conn)
    .await
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &TransactionQueryFilter) {
    builder.push(" WHERE transaction_type = 'payment'");
    if let Some(id) = filter.vendor_id {
        builder.push(" AND vendor_id = ").push_bind(id);
    }
    if let Some(method) = filter.payment_method {
        builder.push(" AND payment_method = ").push_bind(method.to_string());
    }
    if let Some(since) = filter.since {
        builder.push(" AND created_at >= ").push_bind(since);
    }
    if let Some(until) = filter.until {
        builder.push(" AND created_at <= ").push_bind(until);
    }
}

pub async fn transaction_stats(
    filter: TransactionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<TransactionStats, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT status, COUNT(*), COALESCE(SUM(amount), 0) FROM transactions");
    push_filters(&mut builder, &filter);
    builder.push(" GROUP BY status ORDER BY status");
    let rows: Vec<(TransactionStatus, i64, Money)> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let by_status =
        rows.into_iter().map(|(status, count, amount)| StatusStats { status, count, amount }).collect::<Vec<_>>();

    let mut builder = QueryBuilder::new(
        "SELECT COALESCE(SUM(amount), 0), COALESCE(SUM(commission_amount), 0), COALESCE(SUM(vendor_amount), 0), \
         COALESCE(SUM(refund_amount), 0) FROM transactions",
    );
    push_filters(&mut builder, &filter);
    builder.push(" AND status IN ('completed', 'refunded', 'partially_refunded')");
    let (gross_volume, commission, vendor_earnings, refunded): (Money, Money, Money, Money) =
        builder.build_query_as().fetch_one(conn).await?;

    let total_count = by_status.iter().map(|s| s.count).sum();
    Ok(TransactionStats { by_status, total_count, gross_volume, commission, vendor_earnings, refunded })
}
