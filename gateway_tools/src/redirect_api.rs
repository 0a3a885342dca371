use std::sync::Arc;

use log::*;
use reqwest::Client;

use crate::{
    GatewayApiError,
    RedirectGateway,
    RedirectGatewayConfig,
    RedirectSession,
    RedirectSessionRequest,
    RedirectValidation,
};

const INIT_PATH: &str = "/gwprocess/v4/api.php";
const VALIDATION_PATH: &str = "/validator/api/validationserverAPI.php";

/// Client for the redirect (hosted checkout) gateway.
#[derive(Clone)]
pub struct RedirectGatewayApi {
    config: RedirectGatewayConfig,
    client: Arc<Client>,
}

impl RedirectGatewayApi {
    pub fn new(config: RedirectGatewayConfig) -> Result<Self, GatewayApiError> {
        let client =
            Client::builder().timeout(config.timeout).build().map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }
}

impl RedirectGateway for RedirectGatewayApi {
    async fn init_session(&self, request: RedirectSessionRequest) -> Result<RedirectSession, GatewayApiError> {
        let mut form = request.form_fields();
        form.push(("store_id", self.config.store_id.clone()));
        form.push(("store_passwd", self.config.store_password.reveal().clone()));
        let url = self.url(INIT_PATH);
        trace!("🔌️ Opening redirect gateway session for {}", request.transaction_number);
        let response = self.client.post(url).form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await?;
            return Err(GatewayApiError::QueryError { status, message });
        }
        let session = response.json::<RedirectSession>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
        if session.is_success() {
            info!("🔌️ Redirect gateway session opened for {}", request.transaction_number);
            Ok(session)
        } else {
            let reason = session.failed_reason.unwrap_or_else(|| "no reason given".to_string());
            warn!("🔌️ Redirect gateway refused session for {}: {reason}", request.transaction_number);
            Err(GatewayApiError::Rejected(reason))
        }
    }

    async fn validate(&self, val_id: &str) -> Result<RedirectValidation, GatewayApiError> {
        let url = self.url(VALIDATION_PATH);
        let password = self.config.store_password.reveal().clone();
        let params = [
            ("val_id", val_id.to_string()),
            ("store_id", self.config.store_id.clone()),
            ("store_passwd", password),
            ("format", "json".to_string()),
        ];
        trace!("🔌️ Validating redirect payment {val_id}");
        let response = self.client.get(url).query(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await?;
            return Err(GatewayApiError::QueryError { status, message });
        }
        let validation =
            response.json::<RedirectValidation>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))?;
        debug!("🔌️ Validation for {val_id} returned status {}", validation.status);
        Ok(validation)
    }
}
