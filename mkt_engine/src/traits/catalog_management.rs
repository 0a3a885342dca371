use crate::{
    db_types::{NewService, NewUser, NewVendor, Service, UserProfile, Vendor, VendorStatus},
    traits::MarketplaceError,
};

/// Users, vendors and services. The order flow only reads these; writes exist for admin tooling and tests.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn create_user(&self, user: NewUser) -> Result<UserProfile, MarketplaceError>;

    async fn fetch_user(&self, id: i64) -> Result<Option<UserProfile>, MarketplaceError>;

    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, MarketplaceError>;

    async fn fetch_vendor(&self, id: i64) -> Result<Option<Vendor>, MarketplaceError>;

    /// Fetches the vendor profile owned by the given user account, if any.
    async fn fetch_vendor_by_user(&self, user_id: i64) -> Result<Option<Vendor>, MarketplaceError>;

    async fn update_vendor_status(
        &self,
        vendor_id: i64,
        status: VendorStatus,
        is_active: bool,
    ) -> Result<Vendor, MarketplaceError>;

    async fn create_service(&self, service: NewService) -> Result<Service, MarketplaceError>;

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, MarketplaceError>;

    async fn set_service_availability(
        &self,
        service_id: i64,
        is_active: bool,
        is_available: bool,
    ) -> Result<Service, MarketplaceError>;
}
