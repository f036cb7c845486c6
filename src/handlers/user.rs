use crate::error::AppError;
use crate::middlewares::{CurrentUser, Requirement};
use crate::models::*;
use crate::services::ProfileService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "User is inactive or not verified")
    )
)]
pub async fn get_me(current_user: CurrentUser) -> Result<HttpResponse> {
    match current_user.require(Requirement::Verified) {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(UserResponse::from(user.clone())))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid request data"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_me(
    profile_service: web::Data<ProfileService>,
    current_user: CurrentUser,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let user_id = match current_user.require(Requirement::Verified) {
        Ok(user) => user.id,
        Err(e) => return Ok(e.error_response()),
    };

    match profile_service
        .update_profile(user_id, request.into_inner())
        .await
    {
        Ok(profile) => Ok(HttpResponse::Ok().json(ApiResponse::success(profile))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User id (UUID)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Public profile", body = UserPublicProfileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found or inactive")
    )
)]
pub async fn get_public_profile(
    profile_service: web::Data<ProfileService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Ok(user_id) = Uuid::parse_str(&path.into_inner()) else {
        return Ok(AppError::NotFound {
            code: "USER_NOT_FOUND",
            message: "User not found".to_string(),
        }
        .error_response());
    };

    match profile_service.get_public_profile(user_id).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(ApiResponse::success(profile))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .service(
                web::resource("/me")
                    .route(web::get().to(get_me))
                    .route(web::put().to(update_me)),
            )
            .route("/{user_id}", web::get().to(get_public_profile)),
    );
}
