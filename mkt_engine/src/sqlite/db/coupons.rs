use chrono::Utc;
use mkt_common::Money;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Coupon, NewCoupon},
    traits::MarketplaceError,
};

pub async fn insert_coupon(coupon: NewCoupon, conn: &mut SqliteConnection) -> Result<Coupon, MarketplaceError> {
    let coupon = sqlx::query_as(
        r#"
            INSERT INTO coupons (
                code,
                description,
                coupon_type,
                value,
                max_discount,
                min_order_amount,
                applicable_to,
                service_ids,
                category_ids,
                vendor_ids,
                usage_limit,
                per_user_limit,
                start_date,
                end_date,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(coupon.code.to_uppercase())
    .bind(coupon.description)
    .bind(coupon.coupon_type)
    .bind(coupon.value)
    .bind(coupon.max_discount)
    .bind(coupon.min_order_amount)
    .bind(coupon.applicable_to)
    .bind(Json(coupon.service_ids))
    .bind(Json(coupon.category_ids))
    .bind(Json(coupon.vendor_ids))
    .bind(coupon.usage_limit)
    .bind(coupon.per_user_limit)
    .bind(coupon.start_date)
    .bind(coupon.end_date)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(coupon)
}

pub async fn fetch_coupon_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = $1").bind(code.trim().to_uppercase()).fetch_optional(conn).await
}

pub async fn usage_for_user(coupon_id: i64, user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(conn)
        .await
}

/// Increments the usage count only while it is below the usage limit. Returns `false` if the cap was reached.
pub async fn increment_usage(coupon_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE coupons SET usage_count = usage_count + 1
            WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
        "#,
    )
    .bind(coupon_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn record_usage(
    coupon_id: i64,
    user_id: i64,
    order_id: i64,
    discount: Money,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query(
        "INSERT INTO coupon_usages (coupon_id, user_id, order_id, discount, used_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(coupon_id)
    .bind(user_id)
    .bind(order_id)
    .bind(discount)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
