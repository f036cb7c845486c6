use crate::config::SmsConfig;
use crate::error::{AppError, AppResult};
use crate::utils::mask_phone;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const SMS_RU_ENDPOINT: &str = "https://sms.ru/sms/send";

/// Outbound SMS channel used for verification codes.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> AppResult<()>;
}

pub fn verification_message(code: &str) -> String {
    format!("Your verification code: {code}. Do not share it with anyone.")
}

/// Picks the provider for the configuration. Development always logs instead of sending.
pub fn create_sms_sender(config: &SmsConfig, development: bool) -> AppResult<Arc<dyn SmsSender>> {
    if development {
        log::info!("Development environment: SMS messages are written to the log");
        return Ok(Arc::new(ConsoleSmsSender));
    }
    match config.provider.as_str() {
        "sms_ru" => Ok(Arc::new(SmsRuService::new(config.clone())?)),
        "console" => Ok(Arc::new(ConsoleSmsSender)),
        other => Err(AppError::ConfigError(format!("Unknown SMS provider: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct SmsRuResponse {
    status: String,
    #[serde(default)]
    status_code: Option<i64>,
    #[serde(default)]
    status_text: Option<String>,
}

#[derive(Clone)]
pub struct SmsRuService {
    client: Client,
    config: SmsConfig,
    endpoint: String,
}

impl SmsRuService {
    pub fn new(config: SmsConfig) -> AppResult<Self> {
        Self::with_endpoint(config, SMS_RU_ENDPOINT)
    }

    pub fn with_endpoint(config: SmsConfig, endpoint: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(format!("failed to build SMS HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            endpoint: endpoint.to_string(),
        })
    }

    fn check_response(status: StatusCode, body: &str) -> AppResult<()> {
        if status != StatusCode::OK {
            return Err(AppError::DispatchFailed(format!("SMS.RU HTTP status {status}")));
        }
        let parsed: SmsRuResponse = serde_json::from_str(body)
            .map_err(|e| AppError::DispatchFailed(format!("unexpected SMS.RU response: {e}")))?;
        if parsed.status != "OK" {
            return Err(AppError::DispatchFailed(format!(
                "SMS.RU rejected message: code {:?}, {}",
                parsed.status_code,
                parsed.status_text.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SmsSender for SmsRuService {
    async fn send(&self, phone: &str, message: &str) -> AppResult<()> {
        let params = [
            ("api_id", self.config.api_key.as_str()),
            ("to", phone),
            ("msg", message),
            ("from", self.config.sender.as_str()),
            ("json", "1"),
        ];

        // Timeouts and connection errors count as dispatch failures.
        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::DispatchFailed(format!("SMS.RU request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::DispatchFailed(format!("SMS.RU response unreadable: {e}")))?;

        match Self::check_response(status, &body) {
            Ok(()) => {
                log::info!("SMS sent via SMS.RU: {}", mask_phone(phone));
                Ok(())
            }
            Err(e) => {
                log::error!("SMS.RU dispatch to {} failed: {e}", mask_phone(phone));
                Err(e)
            }
        }
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Clone, Copy, Default)]
pub struct ConsoleSmsSender;

#[async_trait]
impl SmsSender for ConsoleSmsSender {
    async fn send(&self, phone: &str, message: &str) -> AppResult<()> {
        log::info!("SMS (console) to {phone}: {message}");
        Ok(())
    }
}
