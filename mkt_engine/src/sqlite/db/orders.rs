use chrono::Utc;
use log::{debug, trace};
use mkt_common::Money;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType, PaymentMethod, PaymentStatus},
    traits::{MarketplaceError, OrderChange, OrderQueryFilter, Page, Pagination},
};

/// Inserts a new order. This is not atomic on its own; embed it in a transaction and pass `&mut *tx` if needed.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketplaceError> {
    let now = Utc::now();
    let p = order.pricing;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                vendor_id,
                service_id,
                service_name,
                service_price,
                discount,
                discount_amount,
                subtotal,
                tax,
                platform_fee,
                coupon_discount,
                total_amount,
                currency,
                scheduled_date,
                scheduled_time,
                address,
                customer_notes,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $19)
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.customer_id)
    .bind(order.vendor_id)
    .bind(order.service_id)
    .bind(order.service_name)
    .bind(p.service_price)
    .bind(p.discount)
    .bind(p.discount_amount)
    .bind(p.subtotal)
    .bind(p.tax)
    .bind(p.platform_fee)
    .bind(p.coupon_discount)
    .bind(p.total_amount)
    .bind(order.currency)
    .bind(order.scheduled_date)
    .bind(order.scheduled_time)
    .bind(order.address)
    .bind(order.customer_notes)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("📦️ Order [{}] inserted with id {}", order.order_number, order.id);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(number.as_str()).fetch_optional(conn).await
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &OrderQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(number) = &query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(number.to_string());
    }
    if let Some(id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.vendor_id {
        where_clause.push("vendor_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
}

/// Fetches a page of orders matching the `OrderQueryFilter`, newest first, along with the total match count.
pub async fn search_orders(
    query: OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Page<Order>, sqlx::Error> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM orders");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM orders");
    push_filters(&mut builder, &query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("📦️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(Page::new(orders, pagination, total))
}

/// Applies the change with compare-and-set on `expected`. Returns `None` if the order was not in that status.
pub async fn transition_order(
    id: i64,
    expected: OrderStatusType,
    change: OrderChange,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let target = change.target_status(expected);
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
    builder.push_bind(target.to_string());
    match change {
        OrderChange::Accept { notes } => {
            builder.push(", accepted_at = ").push_bind(now);
            builder.push(", vendor_notes = COALESCE(").push_bind(notes).push(", vendor_notes)");
        },
        OrderChange::Reject { reason } => {
            builder.push(", rejection_reason = ").push_bind(reason);
        },
        OrderChange::Start => {
            builder.push(", started_at = ").push_bind(now);
        },
        OrderChange::Complete { notes } => {
            builder.push(", completed_at = ").push_bind(now);
            builder.push(", vendor_notes = COALESCE(").push_bind(notes).push(", vendor_notes)");
        },
        OrderChange::Cancel { reason, by } => {
            builder.push(", cancellation_reason = ").push_bind(reason);
            builder.push(", cancelled_by = ").push_bind(by.to_string());
            builder.push(", cancelled_at = ").push_bind(now);
        },
        OrderChange::Reschedule { date, time, reason } => {
            // Only the immediately preceding slot is kept
            builder.push(", rescheduled_from_date = scheduled_date, rescheduled_from_time = scheduled_time");
            builder.push(", scheduled_date = ").push_bind(date);
            builder.push(", scheduled_time = ").push_bind(time);
            builder.push(", reschedule_reason = ").push_bind(reason);
        },
    }
    builder.push(", updated_at = ").push_bind(now);
    builder.push(" WHERE id = ").push_bind(id);
    builder.push(" AND status = ").push_bind(expected.to_string());
    builder.push(" RETURNING *");
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    Ok(order)
}

/// Sets the payment status (and method) unconditionally. Only call this inside the transaction that justified it.
pub async fn set_payment_status(
    id: i64,
    status: PaymentStatus,
    method: Option<PaymentMethod>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                payment_status = $1,
                payment_method = COALESCE($2, payment_method),
                updated_at = $3
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(method)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Marks the order's payment as failed, unless it has been paid (or refunded) in the meantime.
pub async fn mark_payment_failed(id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = 'failed', updated_at = $1 WHERE id = $2 AND payment_status = 'pending'",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Sets the coupon on a pending order without a coupon and recomputes the total.
/// Returns `None` if the order is no longer pending or already carries a coupon.
pub async fn apply_coupon(
    id: i64,
    code: &str,
    discount: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE orders SET
                coupon_code = $1,
                coupon_discount = $2,
                total_amount = subtotal + tax + platform_fee - $2,
                updated_at = $3
            WHERE id = $4 AND status = 'pending' AND coupon_code IS NULL
            RETURNING *;
        "#,
    )
    .bind(code)
    .bind(discount)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await
}
