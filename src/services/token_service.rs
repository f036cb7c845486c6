use crate::error::AppResult;
use crate::models::{TokenPair, User};
use crate::services::UserDirectory;
use crate::store::SharedStore;
use crate::utils::{Claims, JwtService, TokenType};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Token lifecycle: issuing pairs, verification, revocation and resolving
/// the user behind an access token.
#[derive(Clone)]
pub struct TokenService {
    jwt: JwtService,
    store: SharedStore,
    users: Arc<dyn UserDirectory>,
}

impl TokenService {
    pub fn new(jwt: JwtService, store: SharedStore, users: Arc<dyn UserDirectory>) -> Self {
        Self { jwt, store, users }
    }

    fn blacklist_key(token: &str) -> String {
        format!("token_blacklist:{token}")
    }

    pub fn issue_pair(&self, subject: &str) -> AppResult<TokenPair> {
        let pair = TokenPair {
            access_token: self.jwt.generate_access_token(subject)?,
            refresh_token: self.jwt.generate_refresh_token(subject)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.get_access_token_expires_in(),
        };
        log::info!("Token pair issued for user {subject}");
        Ok(pair)
    }

    pub fn issue_access_token(&self, subject: &str) -> AppResult<String> {
        self.jwt.generate_access_token(subject)
    }

    pub fn access_token_expires_in(&self) -> i64 {
        self.jwt.get_access_token_expires_in()
    }

    pub fn verify(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        self.jwt.verify_token(token, expected)
    }

    /// Blacklists `token` for the rest of its lifetime. Returns `false` without
    /// storing anything when the token is malformed or already expired.
    pub async fn revoke(&self, token: &str) -> AppResult<bool> {
        let claims = match self.jwt.decode_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("Skipping revocation of unusable token: {e}");
                return Ok(false);
            }
        };

        let Some(remaining) = blacklist_ttl_secs(claims.exp, Utc::now()) else {
            return Ok(false);
        };

        self.store
            .set_ex(&Self::blacklist_key(token), "1", remaining)
            .await?;
        log::info!(
            "Token revoked for user {}, ttl {remaining}s",
            claims.sub
        );
        Ok(true)
    }

    pub async fn is_revoked(&self, token: &str) -> AppResult<bool> {
        self.store.exists(&Self::blacklist_key(token)).await
    }

    /// The active user an access token belongs to. Every authentication
    /// failure (bad token, revoked, unknown or inactive user) yields `None`;
    /// only store/database failures are errors.
    pub async fn resolve_user(&self, token: &str) -> AppResult<Option<User>> {
        let claims = match self.jwt.verify_access_token(token) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("Access token rejected: {e}");
                return Ok(None);
            }
        };

        if self.is_revoked(token).await? {
            log::warn!("Revoked token presented for user {}", claims.sub);
            return Ok(None);
        }

        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            log::warn!("Access token subject is not a user id: {}", claims.sub);
            return Ok(None);
        };

        match self.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(Some(user)),
            _ => {
                log::warn!("User not found or inactive: {user_id}");
                Ok(None)
            }
        }
    }
}

/// Whole seconds left until `exp`, rounded down so a blacklist entry never
/// outlives the token it blocks. `None` once less than a second remains.
fn blacklist_ttl_secs(exp: i64, now: DateTime<Utc>) -> Option<u64> {
    let remaining_ms = exp * 1000 - now.timestamp_millis();
    match remaining_ms / 1000 {
        secs if secs > 0 => Some(secs as u64),
        _ => None,
    }
}
