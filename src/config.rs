use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_environment")]
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub sms: SmsConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `redis://...`, or `memory://` for the in-process store (single instance only).
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// "sms_ru" or "console"
    pub provider: String,
    pub api_key: String,
    pub sender: String,
    #[serde(default = "default_sms_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub code_ttl_secs: u64,
    pub max_send_attempts: i64,
    pub rate_limit_window_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 300,
            max_send_attempts: 3,
            rate_limit_window_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_sms_timeout() -> u64 {
    10
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env()?,
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "failed to read config file {config_path}: {e}"
                )));
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("failed to parse config file: {e}")))
    }

    /// Builds the configuration purely from environment variables and defaults.
    fn from_env() -> AppResult<Self> {
        fn get_env(name: &str) -> Option<String> {
            env::var(name).ok()
        }
        fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        let database_url = get_env("DATABASE_URL").ok_or_else(|| {
            AppError::ConfigError(
                "DATABASE_URL is not set and no config.toml was found".to_string(),
            )
        })?;
        let jwt_secret = get_env("JWT_SECRET_KEY").ok_or_else(|| {
            AppError::ConfigError(
                "JWT_SECRET_KEY is not set and no config.toml was found".to_string(),
            )
        })?;

        Ok(Config {
            environment: get_env("ENVIRONMENT").unwrap_or_else(default_environment),
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8000u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379/0".to_string()),
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_token_expire_minutes: get_env_parse("ACCESS_TOKEN_EXPIRE_MINUTES", 15i64),
                refresh_token_expire_days: get_env_parse("REFRESH_TOKEN_EXPIRE_DAYS", 7i64),
            },
            sms: SmsConfig {
                provider: get_env("SMS_PROVIDER").unwrap_or_else(|| "sms_ru".to_string()),
                api_key: get_env("SMS_API_KEY").unwrap_or_default(),
                sender: get_env("SMS_SENDER").unwrap_or_else(|| "YourApp".to_string()),
                timeout_secs: get_env_parse("SMS_TIMEOUT_SECS", default_sms_timeout()),
            },
            verification: VerificationConfig::default(),
            cors: CorsConfig::default(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("ENVIRONMENT") {
            self.environment = v;
        }
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("REDIS_URL") {
            self.redis.url = v;
        }
        if let Ok(v) = env::var("JWT_SECRET_KEY") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expire_minutes = n;
        }
        if let Ok(v) = env::var("REFRESH_TOKEN_EXPIRE_DAYS")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expire_days = n;
        }
        if let Ok(v) = env::var("SMS_PROVIDER") {
            self.sms.provider = v;
        }
        if let Ok(v) = env::var("SMS_API_KEY") {
            self.sms.api_key = v;
        }
        if let Ok(v) = env::var("SMS_SENDER") {
            self.sms.sender = v;
        }
        if let Ok(v) = env::var("SMS_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.sms.timeout_secs = n;
        }
        if let Ok(v) = env::var("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8000

        [database]
        url = "postgres://localhost/realty"
        max_connections = 5

        [redis]
        url = "redis://localhost:6379/0"

        [jwt]
        secret = "test-secret"
        access_token_expire_minutes = 15
        refresh_token_expire_days = 7

        [sms]
        provider = "console"
        api_key = ""
        sender = "Realty"
    "#;

    #[test]
    fn test_parse_applies_defaults() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(config.is_development());
        assert_eq!(config.sms.timeout_secs, 10);
        assert_eq!(config.verification.code_ttl_secs, 300);
        assert_eq!(config.verification.max_send_attempts, 3);
        assert_eq!(config.verification.rate_limit_window_secs, 3600);
        assert!(config.cors.allowed_origins.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_sections() {
        let err = Config::parse("[server]\nhost = \"x\"\nport = 1\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
