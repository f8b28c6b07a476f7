//! Process configuration, read once from the environment at startup and
//! shared by reference with the components that need secrets.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub stripe: StripeConfig,
    pub frontend_url: String,
    pub nats_url: Option<String>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub currency: String,
    pub webhook_tolerance: Duration,
}

#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let parsed = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
                None => Ok(default),
            }
        };

        let port = parsed("PORT", 3000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::Invalid { key: "PORT", value: port.to_string() })?;

        let cloudinary = match (get("CLOUDINARY_CLOUD_NAME"), get("CLOUDINARY_API_KEY"), get("CLOUDINARY_API_SECRET")) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig { cloud_name, api_key, api_secret }),
            (None, None, None) => None,
            _ => return Err(ConfigError::Invalid { key: "CLOUDINARY_*", value: "set all three or none".into() }),
        };

        Ok(Self {
            environment: get("APP_ENV").unwrap_or_else(|| "development".into()),
            port,
            database_url: get("DATABASE_URL"),
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: Duration::from_secs(parsed("JWT_TTL_SECS", 3600)?),
            stripe: StripeConfig {
                secret_key: required("STRIPE_SECRET_KEY")?,
                webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
                api_base: get("STRIPE_API_BASE").unwrap_or_else(|| "https://api.stripe.com".into()),
                currency: get("CURRENCY").unwrap_or_else(|| "usd".into()).to_lowercase(),
                webhook_tolerance: Duration::from_secs(parsed("WEBHOOK_TOLERANCE_SECS", 300)?),
            },
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".into()).trim_end_matches('/').to_string(),
            nats_url: get("NATS_URL"),
            cloudinary,
            cors_origins: get("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_else(|| vec!["http://localhost:5173".into(), "http://localhost:5174".into()]),
        })
    }

    pub fn is_production(&self) -> bool { self.environment.eq_ignore_ascii_case("production") }

    /// Configuration for tests and local experiments.
    pub fn for_tests() -> Self {
        Self {
            environment: "test".into(),
            port: 0,
            database_url: None,
            jwt_secret: "test_secret_key_for_testing_purposes_only".into(),
            token_ttl: Duration::from_secs(3600),
            stripe: StripeConfig {
                secret_key: "sk_test_123".into(),
                webhook_secret: "whsec_test_secret".into(),
                api_base: "http://127.0.0.1:9".into(),
                currency: "usd".into(),
                webhook_tolerance: Duration::from_secs(300),
            },
            frontend_url: "http://localhost:5173".into(),
            nats_url: None,
            cloudinary: None,
            cors_origins: vec!["http://localhost:5173".into()],
        }
    }
}
