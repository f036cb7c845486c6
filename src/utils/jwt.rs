use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_expire_minutes: i64, refresh_expire_days: i64) -> Self {
        Self::with_ttls(
            secret,
            Duration::minutes(access_expire_minutes),
            Duration::days(refresh_expire_days),
        )
    }

    pub fn with_ttls(secret: &str, access_token_ttl: Duration, refresh_token_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    pub fn generate_token(&self, subject: &str, token_type: TokenType) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_token_ttl,
            TokenType::Refresh => self.refresh_token_ttl,
        };

        let claims = Claims {
            sub: subject.to_string(),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    pub fn generate_access_token(&self, subject: &str) -> AppResult<String> {
        self.generate_token(subject, TokenType::Access)
    }

    pub fn generate_refresh_token(&self, subject: &str) -> AppResult<String> {
        self.generate_token(subject, TokenType::Refresh)
    }

    /// Checks signature, structure and expiry, regardless of token type.
    pub fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenMalformed,
            })
    }

    pub fn verify_token(&self, token: &str, expected: TokenType) -> AppResult<Claims> {
        let claims = self.decode_token(token)?;

        if claims.token_type != expected {
            return Err(AppError::TokenWrongType {
                expected: expected.as_str(),
            });
        }

        Ok(claims)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        self.verify_token(token, TokenType::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> AppResult<Claims> {
        self.verify_token(token, TokenType::Refresh)
    }

    /// Access token lifetime in seconds.
    pub fn get_access_token_expires_in(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret", 15, 7)
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = service();
        let token = jwt.generate_access_token("user-1").unwrap();
        let claims = jwt.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_refresh_token_lives_days() {
        let jwt = service();
        let token = jwt.generate_refresh_token("user-1").unwrap();
        let claims = jwt.verify_refresh_token(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let jwt = service();
        let token = jwt.generate_access_token("user-1").unwrap();
        assert!(matches!(
            jwt.verify_refresh_token(&token),
            Err(AppError::TokenWrongType { expected: "refresh" })
        ));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let jwt = service();
        let token = jwt.generate_refresh_token("user-1").unwrap();
        assert!(matches!(
            jwt.verify_access_token(&token),
            Err(AppError::TokenWrongType { expected: "access" })
        ));
    }

    #[test]
    fn test_expired_token() {
        let jwt = JwtService::with_ttls("test-secret", Duration::seconds(-30), Duration::days(1));
        let token = jwt.generate_access_token("user-1").unwrap();
        assert!(matches!(jwt.verify_access_token(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_malformed_tokens() {
        let jwt = service();
        assert!(matches!(jwt.decode_token("not-a-token"), Err(AppError::TokenMalformed)));

        let foreign = JwtService::new("other-secret", 15, 7)
            .generate_access_token("user-1")
            .unwrap();
        assert!(matches!(jwt.decode_token(&foreign), Err(AppError::TokenMalformed)));

        let mut tampered = jwt.generate_access_token("user-1").unwrap();
        tampered.push('x');
        assert!(matches!(jwt.decode_token(&tampered), Err(AppError::TokenMalformed)));
    }

    #[test]
    fn test_tokens_are_unique() {
        let jwt = service();
        let a = jwt.generate_access_token("user-1").unwrap();
        let b = jwt.generate_access_token("user-1").unwrap();
        assert_ne!(a, b);
    }
}
