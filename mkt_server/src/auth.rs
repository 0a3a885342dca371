//! Identity of the caller.
//!
//! Authentication itself happens upstream of this server. The upstream layer verifies the user's credentials and
//! forwards the request with two headers:
//! * `X-Auth-User-Id` - the numeric user id.
//! * `X-Auth-Role` - one of `customer`, `vendor`, `admin` or `super_admin`.
//!
//! [`crate::middleware::IdentityMiddlewareFactory`] turns these into [`AuthClaims`] in the request extensions, and
//! handlers take `AuthClaims` as an extractor. A request without claims is rejected with 401.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use log::debug;
use mkt_engine::db_types::{Actor, Role};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-Auth-User-Id";
pub const ROLE_HEADER: &str = "X-Auth-Role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    pub id: i64,
    pub role: Role,
}

impl AuthClaims {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }

    /// Reads the claims from the identity headers. Missing or malformed headers give `None`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let id = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim().parse::<i64>().ok()?;
        let role = headers.get(ROLE_HEADER)?.to_str().ok()?.trim().to_lowercase();
        match role.parse::<Role>() {
            Ok(role) => Some(Self { id, role }),
            Err(e) => {
                debug!("💻️ Ignoring identity headers for user {id}. {e}");
                None
            },
        }
    }

    /// True if the caller holds any of `roles`. Super admins pass any admin check.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| *r == self.role || (*r == Role::Admin && self.role == Role::SuperAdmin))
    }
}

impl FromRequest for AuthClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<AuthClaims>().copied().ok_or(ServerError::Unauthenticated))
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn claims_from_headers() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "42"))
            .insert_header((ROLE_HEADER, "Vendor"))
            .to_http_request();
        let claims = AuthClaims::from_headers(req.headers()).unwrap();
        assert_eq!(claims, AuthClaims::new(42, Role::Vendor));
        assert_eq!(claims.actor(), Actor::vendor(42));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "abc"))
            .insert_header((ROLE_HEADER, "vendor"))
            .to_http_request();
        assert!(AuthClaims::from_headers(req.headers()).is_none());

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "7"))
            .insert_header((ROLE_HEADER, "root"))
            .to_http_request();
        assert!(AuthClaims::from_headers(req.headers()).is_none());
    }

    #[test]
    fn role_checks() {
        let admin = AuthClaims::new(1, Role::SuperAdmin);
        assert!(admin.has_any_role(&[Role::Admin]));
        assert!(!admin.has_any_role(&[Role::Vendor]));
        let vendor = AuthClaims::new(2, Role::Vendor);
        assert!(vendor.has_any_role(&[Role::Customer, Role::Vendor]));
        assert!(!vendor.has_any_role(&[Role::Admin]));
    }
}
