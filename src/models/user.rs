use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "USER")]
    #[serde(rename = "USER")]
    User,
    #[sea_orm(string_value = "DEVELOPER")]
    #[serde(rename = "DEVELOPER")]
    Developer,
    #[sea_orm(string_value = "ADMIN")]
    #[serde(rename = "ADMIN")]
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::User => write!(f, "USER"),
            UserRole::Developer => write!(f, "DEVELOPER"),
            UserRole::Admin => write!(f, "ADMIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "Last First Middle", the order used on documents.
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref() {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.last_name, self.first_name, middle)
            }
            _ => format!("{} {}", self.last_name, self.first_name),
        }
    }
}

/// Fields needed to create a user; the rest get defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PhoneRegisterRequest {
    #[schema(example = "+79999999999")]
    pub phone: String,
    #[schema(example = "Ivan")]
    pub first_name: String,
    #[schema(example = "Petrov")]
    pub last_name: String,
    #[schema(example = "Sergeevich")]
    pub middle_name: Option<String>,
    #[schema(example = "ivan@example.com")]
    pub email: Option<String>,
}

impl PhoneRegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_name("first_name", &self.first_name, true)?;
        validate_name("last_name", &self.last_name, true)?;
        if let Some(middle) = &self.middle_name {
            validate_name("middle_name", middle, false)?;
        }
        if let Some(email) = &self.email
            && !EMAIL.is_match(email)
        {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str, required: bool) -> AppResult<()> {
    let len = value.chars().count();
    if (required && len == 0) || len > 100 {
        return Err(AppError::ValidationError(format!(
            "{field} must be between {} and 100 characters",
            if required { 1 } else { 0 }
        )));
    }
    Ok(())
}

/// Profile edit; absent fields stay unchanged. The phone number is not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[schema(example = "Ivan")]
    pub first_name: Option<String>,
    #[schema(example = "Petrov")]
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    #[schema(example = "ivan@example.com")]
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(first) = &self.first_name {
            validate_name("first_name", first, true)?;
        }
        if let Some(last) = &self.last_name {
            validate_name("last_name", last, true)?;
        }
        if let Some(middle) = &self.middle_name {
            validate_name("middle_name", middle, false)?;
        }
        if let Some(email) = &self.email
            && !EMAIL.is_match(email)
        {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.middle_name.is_none()
            && self.email.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PhoneLoginRequest {
    #[schema(example = "+79999999999")]
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub phone: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            phone: user.phone,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            middle_name: user.middle_name,
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// What other users may see: no phone, email or account flags.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserPublicProfileResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublicProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar_url: user.avatar_url,
            role: user.role,
            created_at: user.created_at,
        }
    }
}
