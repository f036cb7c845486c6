use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};
use crate::services::TokenService;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::Method;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    excluded_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec!["/swagger-ui", "/swagger-ui/", "/api-docs/openapi.json"],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/auth/"],
            // under a public prefix but still authenticated
            excluded_paths: vec!["/api/v1/auth/logout"],
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self
            .excluded_paths
            .iter()
            .any(|&excluded| path.starts_with(excluded))
        {
            return false;
        }

        if self.exact_paths.contains(&path) {
            return true;
        }

        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub struct AuthMiddleware {
    token_service: TokenService,
}

impl AuthMiddleware {
    pub fn new(token_service: TokenService) -> Self {
        Self { token_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            token_service: self.token_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    token_service: TokenService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight
        if req.method() == Method::OPTIONS || self.public_paths.is_public_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = bearer_token(req.headers()).map(str::to_string);
        let service = Rc::clone(&self.service);
        let token_service = self.token_service.clone();

        Box::pin(async move {
            let Some(token) = token else {
                return Err(AppError::AuthError("Missing access token".to_string()).into());
            };

            match token_service.resolve_user(&token).await? {
                Some(user) => {
                    req.extensions_mut().insert(CurrentUser(user));
                    service.call(req).await
                }
                None => Err(AppError::AuthError("Invalid access token".to_string()).into()),
            }
        })
    }
}

/// The authenticated user, placed in request extensions by [`AuthMiddleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Evaluates `requirement` against this user before the handler proceeds.
    pub fn require(&self, requirement: Requirement) -> AppResult<&User> {
        authorize(&self.0, requirement)?;
        Ok(&self.0)
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<CurrentUser>()
                .cloned()
                .ok_or_else(|| AppError::AuthError("Authentication required".to_string())),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// any active user
    Authenticated,
    Verified,
    Developer,
    Admin,
    DeveloperOrAdmin,
}

impl Requirement {
    fn allowed_roles(&self) -> Option<&'static [UserRole]> {
        match self {
            Requirement::Authenticated | Requirement::Verified => None,
            Requirement::Developer => Some(&[UserRole::Developer]),
            Requirement::Admin => Some(&[UserRole::Admin]),
            Requirement::DeveloperOrAdmin => Some(&[UserRole::Developer, UserRole::Admin]),
        }
    }
}

/// Authorization predicate for an authenticated user.
pub fn authorize(user: &User, requirement: Requirement) -> AppResult<()> {
    if !user.is_active {
        return Err(AppError::InactiveUser);
    }
    if requirement == Requirement::Authenticated {
        return Ok(());
    }
    if !user.is_verified {
        return Err(AppError::Forbidden {
            code: "USER_NOT_VERIFIED",
            message: "Phone number is not verified".to_string(),
        });
    }
    if let Some(roles) = requirement.allowed_roles()
        && !roles.contains(&user.role)
    {
        log::warn!(
            "User {} with role {} denied: requires {requirement:?}",
            user.id,
            user.role
        );
        return Err(AppError::Forbidden {
            code: "INSUFFICIENT_PERMISSIONS",
            message: "Insufficient permissions".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: UserRole, verified: bool, active: bool) -> User {
        User {
            id: Uuid::new_v4(),
            phone: "+79990000000".to_string(),
            email: None,
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            middle_name: None,
            role,
            is_active: active,
            is_verified: verified,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_paths() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path("/api/v1/auth/login"));
        assert!(paths.is_public_path("/api/v1/auth/refresh"));
        assert!(paths.is_public_path("/swagger-ui/index.html"));
        assert!(!paths.is_public_path("/api/v1/auth/logout"));
        assert!(!paths.is_public_path("/api/v1/users/me"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_authorize() {
        let plain = user(UserRole::User, true, true);
        assert!(authorize(&plain, Requirement::Verified).is_ok());
        assert!(matches!(
            authorize(&plain, Requirement::Admin),
            Err(AppError::Forbidden { code: "INSUFFICIENT_PERMISSIONS", .. })
        ));

        let developer = user(UserRole::Developer, true, true);
        assert!(authorize(&developer, Requirement::Developer).is_ok());
        assert!(authorize(&developer, Requirement::DeveloperOrAdmin).is_ok());
        assert!(authorize(&developer, Requirement::Admin).is_err());

        let unverified_admin = user(UserRole::Admin, false, true);
        assert!(authorize(&unverified_admin, Requirement::Authenticated).is_ok());
        assert!(matches!(
            authorize(&unverified_admin, Requirement::Admin),
            Err(AppError::Forbidden { code: "USER_NOT_VERIFIED", .. })
        ));

        let inactive = user(UserRole::Admin, true, false);
        assert!(matches!(
            authorize(&inactive, Requirement::Authenticated),
            Err(AppError::InactiveUser)
        ));
    }
}
