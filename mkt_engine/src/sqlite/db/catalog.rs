use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewService, NewUser, NewVendor, Service, UserProfile, Vendor, VendorStatus},
    traits::MarketplaceError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<UserProfile, MarketplaceError> {
    let user = sqlx::query_as(
        "INSERT INTO users (name, email, phone, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user.name)
    .bind(user.email)
    .bind(user.phone)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_vendor(vendor: NewVendor, conn: &mut SqliteConnection) -> Result<Vendor, MarketplaceError> {
    let now = Utc::now();
    let vendor = sqlx::query_as(
        r#"
            INSERT INTO vendors (user_id, business_name, email, status, commission_rate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(vendor.user_id)
    .bind(vendor.business_name)
    .bind(vendor.email)
    .bind(vendor.status)
    .bind(vendor.commission_rate)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(vendor)
}

pub async fn fetch_vendor(id: i64, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_vendor_by_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM vendors WHERE user_id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn update_vendor_status(
    id: i64,
    status: VendorStatus,
    is_active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Vendor>, sqlx::Error> {
    sqlx::query_as("UPDATE vendors SET status = $1, is_active = $2, updated_at = $3 WHERE id = $4 RETURNING *")
        .bind(status)
        .bind(is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Adjusts the vendor's running earnings. Negative values are used for refunds.
pub async fn adjust_vendor_earnings(
    vendor_id: i64,
    revenue: i64,
    commission: i64,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    let result = sqlx::query(
        r#"
            UPDATE vendors SET
                total_revenue = total_revenue + $1,
                total_commission = total_commission + $2,
                updated_at = $3
            WHERE id = $4
        "#,
    )
    .bind(revenue)
    .bind(commission)
    .bind(Utc::now())
    .bind(vendor_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::not_found(format!("Vendor #{vendor_id}")));
    }
    Ok(())
}

pub async fn increment_completed_orders(vendor_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE vendors SET completed_orders = completed_orders + 1, updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(vendor_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_service(service: NewService, conn: &mut SqliteConnection) -> Result<Service, MarketplaceError> {
    let service = sqlx::query_as(
        r#"
            INSERT INTO services (vendor_id, category_id, name, price, discount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(service.vendor_id)
    .bind(service.category_id)
    .bind(service.name)
    .bind(service.price)
    .bind(service.discount)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(service)
}

pub async fn fetch_service(id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM services WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn set_service_availability(
    id: i64,
    is_active: bool,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Service>, sqlx::Error> {
    sqlx::query_as("UPDATE services SET is_active = $1, is_available = $2 WHERE id = $3 RETURNING *")
        .bind(is_active)
        .bind(is_available)
        .bind(id)
        .fetch_optional(conn)
        .await
}
