//! Fakes shared by unit tests.

use crate::error::{AppError, AppResult};
use crate::external::SmsSender;
use crate::models::{NewUser, UpdateProfileRequest, User, UserRole};
use crate::services::UserDirectory;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Records sent messages; optionally fails every send.
#[derive(Clone, Default)]
pub struct RecordingSms {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingSms {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Code from the latest message sent to `phone`.
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, message) = sent.iter().rev().find(|(to, _)| to == phone)?;
        let start = message.find("code: ")? + "code: ".len();
        Some(message[start..start + 4].to_string())
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::DispatchFailed("provider unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl InMemoryUsers {
    pub async fn insert_verified(&self, phone: &str) -> User {
        let mut user = self
            .create(NewUser {
                phone: phone.to_string(),
                email: None,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                middle_name: None,
            })
            .await
            .unwrap();
        user.is_verified = true;
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub async fn set_active(&self, id: Uuid, active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = active;
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.phone == phone)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            phone: new_user.phone,
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            middle_name: new_user.middle_name,
            role: UserRole::User,
            is_active: true,
            is_verified: false,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.users.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound {
                code: "USER_NOT_FOUND",
                message: "User not found".to_string(),
            })?;
        user.is_verified = true;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_profile(&self, id: Uuid, changes: UpdateProfileRequest) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&id).ok_or_else(|| AppError::NotFound {
            code: "USER_NOT_FOUND",
            message: "User not found".to_string(),
        })?;
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if changes.middle_name.is_some() {
            user.middle_name = changes.middle_name;
        }
        if changes.email.is_some() {
            user.email = changes.email;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}
