//! Attaches the caller's identity to the request.
//!
//! The upstream authentication layer forwards the authenticated user in the `X-Auth-User-Id` and `X-Auth-Role`
//! headers. When trust is enabled, this middleware parses them into [`AuthClaims`] and stores them in the request
//! extensions. It never rejects a request itself; that is left to [`super::AclMiddlewareFactory`] and the
//! `AuthClaims` extractor.
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
use log::trace;

use crate::auth::AuthClaims;

pub struct IdentityMiddlewareFactory {
    trust_headers: bool,
}

impl IdentityMiddlewareFactory {
    pub fn new(trust_headers: bool) -> Self {
        Self { trust_headers }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = IdentityMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentityMiddlewareService { trust_headers: self.trust_headers, service: Rc::new(service) })
    }
}

pub struct IdentityMiddlewareService<S> {
    trust_headers: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
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
        if self.trust_headers {
            if let Some(claims) = AuthClaims::from_headers(req.headers()) {
                trace!("💻️ Request to {} from {}", req.path(), claims.actor());
                req.extensions_mut().insert(claims);
            }
        }
        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}
