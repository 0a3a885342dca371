use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use mkt_engine::MarketplaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("No identity was supplied with the request.")]
    Unauthenticated,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
    #[error("{0}")]
    Marketplace(#[from] MarketplaceError),
}

impl ServerError {
    /// The message sent to the client. Backend and gateway details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            Self::Marketplace(MarketplaceError::Database(e)) | Self::BackendError(e) => {
                error!("💻️ Backend error: {e}");
                "An internal error occurred. Please try again later.".to_string()
            },
            Self::Marketplace(MarketplaceError::Gateway(e)) => {
                error!("💻️ Payment gateway error: {e}");
                "The payment gateway could not complete the request. Please try again later.".to_string()
            },
            Self::InitializeError(_) | Self::IOError(_) | Self::ConfigurationError(_) => {
                error!("💻️ {self}");
                "An internal error occurred. Please try again later.".to_string()
            },
            Self::Marketplace(e) => marketplace_message(e),
            _ => self.to_string(),
        }
    }
}

fn marketplace_message(e: &MarketplaceError) -> String {
    match e {
        MarketplaceError::Validation(m)
        | MarketplaceError::Forbidden(m)
        | MarketplaceError::Unavailable(m)
        | MarketplaceError::InvalidState(m)
        | MarketplaceError::Conflict(m)
        | MarketplaceError::NoFunds(m) => m.clone(),
        MarketplaceError::NotFound(what) => format!("{what} not found"),
        other => other.to_string(),
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::Marketplace(e) => match e {
                MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
                MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
                MarketplaceError::Unavailable(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::InvalidState(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::Conflict(_) => StatusCode::CONFLICT,
                MarketplaceError::Gateway(_) => StatusCode::BAD_GATEWAY,
                MarketplaceError::NoFunds(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "error": self.public_message() }).to_string())
    }
}

#[cfg(test)]
mod test {
    use gateway_tools::GatewayApiError;

    use super::*;

    #[test]
    fn status_codes() {
        let code = |e: MarketplaceError| ServerError::from(e).status_code();
        assert_eq!(code(MarketplaceError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(code(MarketplaceError::not_found("Order")), StatusCode::NOT_FOUND);
        assert_eq!(code(MarketplaceError::forbidden("no")), StatusCode::FORBIDDEN);
        assert_eq!(code(MarketplaceError::invalid_state("paid")), StatusCode::BAD_REQUEST);
        assert_eq!(code(MarketplaceError::Conflict("again".into())), StatusCode::CONFLICT);
        assert_eq!(code(MarketplaceError::NoFunds("none".into())), StatusCode::BAD_REQUEST);
        assert_eq!(code(MarketplaceError::Database("locked".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code(GatewayApiError::Rejected("nope".into()).into()), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn backend_details_are_not_leaked() {
        let err = ServerError::from(MarketplaceError::Database("no such table: orders".into()));
        assert!(!err.public_message().contains("orders"));
        let err = ServerError::from(MarketplaceError::Gateway(GatewayApiError::Rejected("store_passwd bad".into())));
        assert!(!err.public_message().contains("store_passwd"));
        let err = ServerError::from(MarketplaceError::not_found("Order ORD-1"));
        assert_eq!(err.public_message(), "Order ORD-1 not found");
    }
}
