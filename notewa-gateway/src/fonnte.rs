//! Fonnte WhatsApp gateway client.

use std::time::Duration;

use async_trait::async_trait;
use notewa_core::{DispatchReceipt, Dispatcher, ReminderError, COUNTRY_CODE};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use tracing::{debug, info};

use crate::reply::interpret;

pub const DEFAULT_BASE_URL: &str = "https://api.fonnte.com/send";

/// Everything the dispatcher needs, handed over at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Pre-shared device token, sent verbatim in `Authorization`.
    pub token: Option<String>,
    pub country_code: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            country_code: COUNTRY_CODE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl GatewayConfig {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

pub struct FonnteGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl FonnteGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ReminderError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReminderError::GatewayRequest(format!("building HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

#[async_trait]
impl Dispatcher for FonnteGateway {
    fn ensure_ready(&self) -> Result<(), ReminderError> {
        self.config.token().map(|_| ()).ok_or(ReminderError::GatewayAuth)
    }

    async fn dispatch(&self, phone: &str, message: &str) -> Result<DispatchReceipt, ReminderError> {
        let token = self.config.token().ok_or(ReminderError::GatewayAuth)?;

        let form = Form::new()
            .text("target", phone.to_string())
            .text("message", message.to_string())
            .text("countryCode", self.config.country_code.clone());

        debug!(url = %self.config.base_url, to = phone, "sending WhatsApp message");
        let resp = self
            .client
            .post(&self.config.base_url)
            .header(AUTHORIZATION, token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReminderError::GatewayRequest(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ReminderError::GatewayRequest(format!("reading response: {e}")))?;

        let receipt = interpret(status.as_u16(), &body)?;
        info!(to = phone, ids = ?receipt.message_ids, "gateway accepted message");
        Ok(receipt)
    }
}
