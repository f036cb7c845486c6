use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::UserDirectory;
use std::sync::Arc;
use uuid::Uuid;

/// Profile reads and edits for signed-in users.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserDirectory>,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    fn not_found() -> AppError {
        AppError::NotFound {
            code: "USER_NOT_FOUND",
            message: "User not found".to_string(),
        }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(Self::not_found)?;
        Ok(user.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        changes.validate()?;

        if changes.is_empty() {
            return self.get_profile(user_id).await;
        }

        if let Some(email) = &changes.email
            && let Some(owner) = self.users.find_by_email(email).await?
            && owner.id != user_id
        {
            log::warn!("Profile update for {user_id} with an email taken by another user");
            return Err(AppError::Conflict {
                code: "EMAIL_ALREADY_EXISTS",
                message: "User with this email already exists".to_string(),
            });
        }

        let user = self.users.update_profile(user_id, changes).await?;
        log::info!("User profile updated: {user_id}");
        Ok(user.into())
    }

    /// Public view of an active user; inactive accounts are reported as missing.
    pub async fn get_public_profile(&self, user_id: Uuid) -> AppResult<UserPublicProfileResponse> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(Self::not_found)?;
        if !user.is_active {
            return Err(AppError::NotFound {
                code: "USER_INACTIVE",
                message: "User profile is not available".to_string(),
            });
        }
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryUsers;

    fn service(users: &InMemoryUsers) -> ProfileService {
        ProfileService::new(Arc::new(users.clone()))
    }

    #[tokio::test]
    async fn test_update_profile_changes_only_given_fields() {
        let users = InMemoryUsers::default();
        let user = users.insert_verified("+79990000000").await;
        let svc = service(&users);

        let updated = svc
            .update_profile(
                user.id,
                UpdateProfileRequest {
                    first_name: Some("Anna".to_string()),
                    middle_name: Some("Olegovna".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Anna");
        assert_eq!(updated.last_name, user.last_name);
        assert_eq!(updated.full_name, "User Anna Olegovna");
        assert_eq!(updated.phone, "+79990000000");

        let unchanged = svc
            .update_profile(user.id, UpdateProfileRequest::default())
            .await
            .unwrap();
        assert_eq!(unchanged.first_name, "Anna");
    }

    #[tokio::test]
    async fn test_update_profile_rejects_bad_input_and_taken_email() {
        let users = InMemoryUsers::default();
        let user = users.insert_verified("+79990000000").await;
        let other = users.insert_verified("+79990000001").await;
        let svc = service(&users);

        svc.update_profile(
            other.id,
            UpdateProfileRequest {
                email: Some("taken@example.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(matches!(
            svc.update_profile(
                user.id,
                UpdateProfileRequest {
                    email: Some("taken@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await,
            Err(AppError::Conflict { code: "EMAIL_ALREADY_EXISTS", .. })
        ));
        // keeping one's own email is fine
        assert!(
            svc.update_profile(
                other.id,
                UpdateProfileRequest {
                    email: Some("taken@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .is_ok()
        );
        assert!(matches!(
            svc.update_profile(
                user.id,
                UpdateProfileRequest {
                    last_name: Some(String::new()),
                    ..Default::default()
                },
            )
            .await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_public_profile_hides_inactive_and_unknown_users() {
        let users = InMemoryUsers::default();
        let user = users.insert_verified("+79990000000").await;
        let svc = service(&users);

        let public = svc.get_public_profile(user.id).await.unwrap();
        assert_eq!(public.id, user.id);
        assert_eq!(public.first_name, user.first_name);

        users.set_active(user.id, false).await;
        assert!(matches!(
            svc.get_public_profile(user.id).await,
            Err(AppError::NotFound { code: "USER_INACTIVE", .. })
        ));
        assert!(matches!(
            svc.get_public_profile(Uuid::new_v4()).await,
            Err(AppError::NotFound { code: "USER_NOT_FOUND", .. })
        ));
    }
}
