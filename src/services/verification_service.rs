use crate::config::VerificationConfig;
use crate::error::{AppError, AppResult};
use crate::external::{SmsSender, verification_message};
use crate::models::VerificationSession;
use crate::services::{RateLimitStatus, RateLimiter};
use crate::store::SharedStore;
use crate::utils::{generate_session_id, generate_verification_code, mask_phone};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// One-time SMS code sessions.
///
/// A session is created per register/login request, lives `code_ttl_secs`,
/// and is consumed by the first correct `verify`. Wrong codes leave it in
/// place; only the send path is rate limited.
#[derive(Clone)]
pub struct VerificationService {
    store: SharedStore,
    rate_limiter: RateLimiter,
    sms: Arc<dyn SmsSender>,
    code_ttl_secs: u64,
}

impl VerificationService {
    pub fn new(
        store: SharedStore,
        rate_limiter: RateLimiter,
        sms: Arc<dyn SmsSender>,
        code_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            sms,
            code_ttl_secs,
        }
    }

    pub fn from_config(
        store: SharedStore,
        sms: Arc<dyn SmsSender>,
        config: &VerificationConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(
            store.clone(),
            config.max_send_attempts,
            config.rate_limit_window_secs,
        );
        Self::new(store, rate_limiter, sms, config.code_ttl_secs)
    }

    pub fn code_ttl_secs(&self) -> u64 {
        self.code_ttl_secs
    }

    fn session_key(session_id: &str) -> String {
        format!("verification_session:{session_id}")
    }

    /// Sends a fresh code to `phone` and returns the session id to verify it against.
    pub async fn start_session(&self, phone: &str) -> AppResult<String> {
        if let RateLimitStatus::Limited { retry_after } = self.rate_limiter.check(phone).await? {
            log::warn!(
                "SMS rate limit exceeded for {}, retry after {retry_after}s",
                mask_phone(phone)
            );
            return Err(AppError::RateLimitExceeded { retry_after });
        }

        let code = generate_verification_code();
        let session_id = generate_session_id();
        let now = Utc::now();
        let session = VerificationSession {
            session_id: session_id.clone(),
            phone: phone.to_string(),
            code,
            created_at: now,
            expires_at: now + Duration::seconds(self.code_ttl_secs as i64),
        };

        let key = Self::session_key(&session_id);
        self.store
            .set_ex(&key, &serde_json::to_string(&session)?, self.code_ttl_secs)
            .await?;

        if let Err(e) = self.sms.send(phone, &verification_message(&session.code)).await {
            if let Err(cleanup) = self.store.delete(&key).await {
                log::error!("Failed to remove verification session {session_id}: {cleanup}");
            }
            return Err(match e {
                AppError::DispatchFailed(_) => e,
                other => AppError::DispatchFailed(other.to_string()),
            });
        }

        let attempts = self.rate_limiter.record(phone).await?;
        log::info!(
            "Verification code sent to {}, session {session_id}, attempt {attempts}",
            mask_phone(phone)
        );

        Ok(session_id)
    }

    /// Consumes the session when `code` matches and returns its phone number.
    pub async fn verify(&self, session_id: &str, code: &str) -> AppResult<String> {
        let key = Self::session_key(session_id);
        let Some(raw) = self.store.get(&key).await? else {
            log::warn!("Verification session not found: {session_id}");
            return Err(AppError::SessionNotFound);
        };
        let session: VerificationSession = serde_json::from_str(&raw)?;

        if session.code != code {
            log::warn!("Invalid verification code for session {session_id}");
            return Err(AppError::InvalidCode);
        }

        // Only the caller whose delete removed the key wins a concurrent verify.
        if !self.store.delete(&key).await? {
            log::warn!("Verification session consumed concurrently: {session_id}");
            return Err(AppError::SessionNotFound);
        }

        log::info!(
            "Verification code accepted for {}, session {session_id}",
            mask_phone(&session.phone)
        );
        Ok(session.phone)
    }
}
