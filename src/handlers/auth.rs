use crate::error::AppError;
use crate::middlewares::bearer_token;
use crate::models::*;
use crate::services::AuthService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = PhoneRegisterRequest,
    responses(
        (status = 200, description = "User created, verification code sent", body = SessionStartedResponse),
        (status = 400, description = "Invalid request data"),
        (status = 409, description = "Phone or email already registered"),
        (status = 429, description = "Too many SMS requests"),
        (status = 502, description = "SMS could not be sent")
    )
)]
pub async fn register(
    auth_service: web::Data<AuthService>,
    request: web::Json<PhoneRegisterRequest>,
) -> Result<HttpResponse> {
    match auth_service.register(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = PhoneLoginRequest,
    responses(
        (status = 200, description = "Verification code sent", body = SessionStartedResponse),
        (status = 403, description = "User is inactive"),
        (status = 404, description = "User not found"),
        (status = 429, description = "Too many SMS requests")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<PhoneLoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify",
    tag = "auth",
    request_body = VerificationRequest,
    responses(
        (status = 200, description = "Phone verified, tokens issued", body = TokenResponse),
        (status = 400, description = "Invalid code or unknown session")
    )
)]
pub async fn verify(
    auth_service: web::Data<AuthService>,
    request: web::Json<VerificationRequest>,
) -> Result<HttpResponse> {
    match auth_service.verify(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid or revoked refresh token")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse> {
    match auth_service.refresh_token(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body(content = Option<RefreshTokenRequest>, description = "Refresh token to revoke as well"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    body: Option<web::Json<RefreshTokenRequest>>,
) -> Result<HttpResponse> {
    let Some(access_token) = bearer_token(req.headers()) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };
    let refresh_token = body.as_ref().map(|b| b.refresh_token.as_str());

    match auth_service.logout(access_token, refresh_token).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully"))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/verify", web::post().to(verify))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout)),
    );
}
