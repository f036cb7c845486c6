pub mod auth;
pub mod user;

pub use auth::auth_config;
pub use user::user_config;
