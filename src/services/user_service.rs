use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::*;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use uuid::Uuid;

/// User lookups the auth flow depends on.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn mark_verified(&self, id: Uuid) -> AppResult<User>;
    /// Applies the fields present in `changes`.
    async fn update_profile(&self, id: Uuid, changes: UpdateProfileRequest) -> AppResult<User>;
}

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for UserService {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .map(User::from))
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<User>> {
        Ok(users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .one(&self.pool)
            .await?
            .map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.pool)
            .await?
            .map(User::from))
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            phone: Set(new_user.phone),
            email: Set(new_user.email),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            middle_name: Set(new_user.middle_name),
            role: Set(UserRole::User),
            is_active: Set(true),
            is_verified: Set(false),
            avatar_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        users::Entity::delete_by_id(id).exec(&self.pool).await?;
        Ok(())
    }

    async fn mark_verified(&self, id: Uuid) -> AppResult<User> {
        let mut model = users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound {
                code: "USER_NOT_FOUND",
                message: "User not found".to_string(),
            })?
            .into_active_model();
        model.is_verified = Set(true);
        model.updated_at = Set(Utc::now());
        Ok(model.update(&self.pool).await?.into())
    }

    async fn update_profile(&self, id: Uuid, changes: UpdateProfileRequest) -> AppResult<User> {
        let mut model = users::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound {
                code: "USER_NOT_FOUND",
                message: "User not found".to_string(),
            })?
            .into_active_model();
        if let Some(first_name) = changes.first_name {
            model.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            model.last_name = Set(last_name);
        }
        if let Some(middle_name) = changes.middle_name {
            model.middle_name = Set(Some(middle_name));
        }
        if let Some(email) = changes.email {
            model.email = Set(Some(email));
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(&self.pool).await?.into())
    }
}
