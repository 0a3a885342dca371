//! Access control list middleware for the marketplace server.
//! This middleware can be placed on any route or service.
//!
//! It checks the [`AuthClaims`] that [`super::IdentityMiddlewareFactory`] attached to the request against the roles
//! allowed on the route. A caller holding any one of the roles may continue. A request without claims gets a 401;
//! one with the wrong role gets a 403.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::debug;
use mkt_engine::db_types::Role;

use crate::{auth::AuthClaims, errors::ServerError};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let claims = req.extensions().get::<AuthClaims>().copied();
            let Some(claims) = claims else {
                debug!("💻️ No identity on request to {}", req.path());
                return Err(ServerError::Unauthenticated.into());
            };
            if claims.has_any_role(&allowed_roles) {
                service.call(req).await
            } else {
                debug!("💻️ {} may not call {}", claims.actor(), req.path());
                Err(ServerError::InsufficientPermissions(format!("This route is not available to {}s", claims.role))
                    .into())
            }
        })
    }
}
