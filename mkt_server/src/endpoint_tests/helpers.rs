use actix_web::{
    body::to_bytes,
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use log::debug;
use mkt_engine::db_types::Role;

use crate::{
    auth::{ROLE_HEADER, USER_ID_HEADER},
    middleware::IdentityMiddlewareFactory,
    server::{json_config, query_config},
};

/// Adds the identity headers the upstream authentication layer would have set.
pub fn as_user(req: TestRequest, id: i64, role: Role) -> TestRequest {
    req.insert_header((USER_ID_HEADER, id.to_string())).insert_header((ROLE_HEADER, role.to_string()))
}

/// Runs `req` through an app built by `configure` and returns the status and body.
pub async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let (status, _, body) = send_with_headers(req, configure).await;
    (status, body)
}

/// Errors raised by middleware surface as service errors rather than responses, so they are rendered here the same
/// way the server would render them.
pub async fn send_with_headers(
    req: TestRequest,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, HeaderMap, String) {
    let app = App::new()
        .wrap(IdentityMiddlewareFactory::new(true))
        .app_data(json_config())
        .app_data(query_config())
        .configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let headers = res.headers().clone();
            let body = test::read_body(res).await;
            (status, headers, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let headers = res.headers().clone();
            let body = to_bytes(res.into_body()).await.unwrap();
            (status, headers, String::from_utf8_lossy(&body).into_owned())
        },
    }
}
