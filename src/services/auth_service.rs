use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{TokenService, UserDirectory, VerificationService};
use crate::utils::*;
use std::sync::Arc;
use uuid::Uuid;

const CODE_SENT_MESSAGE: &str = "SMS with verification code sent";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    verification: VerificationService,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        verification: VerificationService,
        tokens: TokenService,
    ) -> Self {
        Self {
            users,
            verification,
            tokens,
        }
    }

    fn checked_phone(raw: &str) -> AppResult<String> {
        let phone = normalize_phone(raw);
        validate_phone(&phone)?;
        Ok(phone)
    }

    fn session_started(&self, session_id: String) -> SessionStartedResponse {
        SessionStartedResponse {
            message: CODE_SENT_MESSAGE.to_string(),
            session_id,
            expires_in: self.verification.code_ttl_secs(),
        }
    }

    /// Creates an unverified user and sends the first verification code.
    pub async fn register(&self, request: PhoneRegisterRequest) -> AppResult<SessionStartedResponse> {
        let phone = Self::checked_phone(&request.phone)?;
        request.validate()?;

        if self.users.find_by_phone(&phone).await?.is_some() {
            log::warn!("Registration attempt for existing phone {}", mask_phone(&phone));
            return Err(AppError::Conflict {
                code: "USER_ALREADY_EXISTS",
                message: "User with this phone number already exists".to_string(),
            });
        }
        if let Some(email) = &request.email
            && self.users.find_by_email(email).await?.is_some()
        {
            log::warn!("Registration attempt with existing email");
            return Err(AppError::Conflict {
                code: "EMAIL_ALREADY_EXISTS",
                message: "User with this email already exists".to_string(),
            });
        }

        let user = self
            .users
            .create(NewUser {
                phone: phone.clone(),
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                middle_name: request.middle_name,
            })
            .await?;

        let session_id = match self.verification.start_session(&phone).await {
            Ok(session_id) => session_id,
            Err(e) => {
                // no code was sent, so the account could never be verified
                if let Err(rollback) = self.users.delete(user.id).await {
                    log::error!("Failed to roll back user {} after SMS failure: {rollback}", user.id);
                }
                return Err(e);
            }
        };

        log::info!("User registration initiated: {}", user.id);
        Ok(self.session_started(session_id))
    }

    /// Sends a verification code to an existing, active user.
    pub async fn login(&self, request: PhoneLoginRequest) -> AppResult<SessionStartedResponse> {
        let phone = Self::checked_phone(&request.phone)?;

        let user = self.users.find_by_phone(&phone).await?.ok_or_else(|| {
            log::warn!("Login attempt for unknown phone {}", mask_phone(&phone));
            AppError::NotFound {
                code: "USER_NOT_FOUND",
                message: "User with this phone number not found".to_string(),
            }
        })?;

        if !user.is_active {
            log::warn!("Login attempt for inactive user {}", user.id);
            return Err(AppError::InactiveUser);
        }

        let session_id = self.verification.start_session(&phone).await?;
        log::info!("User login initiated: {}", user.id);
        Ok(self.session_started(session_id))
    }

    /// Checks the SMS code and issues a token pair.
    pub async fn verify(&self, request: VerificationRequest) -> AppResult<TokenResponse> {
        if !is_valid_verification_code(&request.verification_code) {
            return Err(AppError::ValidationError(
                "Verification code must be 4 digits".to_string(),
            ));
        }

        let phone = self
            .verification
            .verify(&request.session_id, &request.verification_code)
            .await?;

        let user = self.users.find_by_phone(&phone).await?.ok_or_else(|| {
            AppError::InternalError(format!(
                "user for {} disappeared after verification",
                mask_phone(&phone)
            ))
        })?;
        if !user.is_active {
            return Err(AppError::InactiveUser);
        }

        let user = if user.is_verified {
            user
        } else {
            self.users.mark_verified(user.id).await?
        };

        let tokens = self.tokens.issue_pair(&user.id.to_string())?;
        log::info!("User verified and logged in: {}", user.id);

        Ok(TokenResponse {
            tokens,
            user: UserResponse::from(user),
        })
    }

    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> AppResult<RefreshResponse> {
        let claims = self
            .tokens
            .verify(&request.refresh_token, TokenType::Refresh)?;

        if self.tokens.is_revoked(&request.refresh_token).await? {
            return Err(AppError::AuthError("Refresh token has been revoked".to_string()));
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenMalformed)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;
        if !user.is_active {
            log::warn!("Token refresh for inactive user {user_id}");
            return Err(AppError::InactiveUser);
        }

        let access_token = self.tokens.issue_access_token(&claims.sub)?;
        log::info!("Access token refreshed for user {user_id}");

        Ok(RefreshResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_token_expires_in(),
        })
    }

    /// Revokes the presented access token (and the refresh token, when given).
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> AppResult<()> {
        // a bad refresh token must fail the call before anything is revoked
        if let Some(refresh) = refresh_token {
            self.tokens.verify(refresh, TokenType::Refresh)?;
        }
        self.tokens.revoke(access_token).await?;
        if let Some(refresh) = refresh_token {
            self.tokens.revoke(refresh).await?;
        }
        log::info!("User logged out");
        Ok(())
    }
}
