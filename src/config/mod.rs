use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC signing secret. Has no default; startup fails without it.
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub leeway_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::with_defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            );

        // Plain JWT_SECRET wins over every other source
        if let Ok(secret) = env::var("JWT_SECRET") {
            builder = builder.set_override("auth.jwt_secret", secret)?;
        }

        let s = builder.build()?;

        s.try_deserialize::<Settings>()?.validated()
    }

    fn with_defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("auth.token_expiry_hours", 24)?
            .set_default("auth.leeway_seconds", 0)?
            .set_default("cors.enabled", true)?
            .set_default("cors.allow_any_origin", false)?
            .set_default("cors.max_age", 3600)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.jwt_secret must not be empty (set JWT_SECRET)".into(),
            ));
        }
        if self.auth.token_expiry_hours <= 0 {
            return Err(ConfigError::Message(
                "auth.token_expiry_hours must be positive".into(),
            ));
        }
        Ok(self)
    }

    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::with_defaults("test")?
            .set_default("auth.jwt_secret", "test_secret")?
            .set_default("auth.token_expiry_hours", 1)?
            .build()?
            .try_deserialize::<Settings>()?
            .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn cleanup_env() {
        env::remove_var("JWT_SECRET");
        env::remove_var("APP_SERVER__PORT");
        env::remove_var("APP_AUTH__JWT_SECRET");
        env::remove_var("APP_AUTH__TOKEN_EXPIRY_HOURS");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.workers as usize, num_cpus::get());
        assert_eq!(settings.auth.jwt_secret, "test_secret");
        assert_eq!(settings.auth.token_expiry_hours, 1);
        assert_eq!(settings.auth.leeway_seconds, 0);
    }

    // Env-driven cases share process state, so they run in one test.
    #[test]
    fn test_environment_sources() {
        cleanup_env();

        let result = Settings::new();
        assert!(result.is_err(), "startup must fail without a secret");

        env::set_var("APP_AUTH__JWT_SECRET", "   ");
        let err = Settings::new().expect_err("blank secret must be rejected");
        assert!(err.to_string().contains("must not be empty"), "Unexpected error: {}", err);

        env::set_var("APP_AUTH__JWT_SECRET", "from_app_prefix");
        env::set_var("APP_SERVER__PORT", "9000");
        let settings = Settings::new().expect("Failed to load settings");
        assert_eq!(settings.auth.jwt_secret, "from_app_prefix");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.auth.token_expiry_hours, 24);

        env::set_var("JWT_SECRET", "from_plain_env");
        let settings = Settings::new().expect("Failed to load settings");
        assert_eq!(settings.auth.jwt_secret, "from_plain_env");
        assert_eq!(settings.server.port, 9000);

        env::set_var("APP_AUTH__TOKEN_EXPIRY_HOURS", "0");
        let err = Settings::new().expect_err("zero expiry must be rejected");
        assert!(err.to_string().contains("must be positive"), "Unexpected error: {}", err);

        env::set_var("APP_AUTH__TOKEN_EXPIRY_HOURS", "48");
        env::set_var("APP_SERVER__PORT", "invalid");
        let err = Settings::new().expect_err("Expected error for invalid port");
        let error_message = err.to_string();
        assert!(
            error_message.contains("invalid digit found in string")
                || error_message.contains("invalid value")
                || error_message.contains("invalid type"),
            "Unexpected error: {}",
            error_message
        );

        cleanup_env();
    }
}
