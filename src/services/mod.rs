pub mod auth_service;
pub mod profile_service;
pub mod rate_limiter;
pub mod token_service;
pub mod user_service;
pub mod verification_service;

pub use auth_service::*;
pub use profile_service::*;
pub use rate_limiter::*;
pub use token_service::*;
pub use user_service::*;
pub use verification_service::*;
