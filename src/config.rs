use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. Without it the service runs on the in-memory store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Withdrawal engine settings, handed to `WithdrawalService` at construction.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BillingConfig {
    /// Commission as a fraction of the requested amount (0.015 = 1.5%).
    pub commission_rate: Decimal,
    /// Upper bound for the outbound callback made during submission.
    pub callback_timeout_ms: u64,
    /// Shared secret for the operator settlement route. Route is closed when unset.
    #[serde(default)]
    pub operator_secret: Option<String>,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(15, 3),
            callback_timeout_ms: 5_000,
            operator_secret: None,
        }
    }
}

impl BillingConfig {
    pub fn callback_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.commission_rate < Decimal::ZERO || self.commission_rate >= Decimal::ONE {
            bail!(
                "billing.commission_rate must be in [0, 1), got {}",
                self.commission_rate
            );
        }
        if self.callback_timeout_ms == 0 {
            bail!("billing.callback_timeout_ms must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Lifetime of email confirmation and password reset tokens.
    pub token_ttl_secs: u64,
    /// Where confirmation redirects and reset links point to.
    pub frontend_base_url: String,
    /// Externally reachable base URL of this service, used in confirmation links.
    pub public_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-jwt-secret-change-me".to_string(),
            jwt_ttl_hours: 24,
            token_ttl_secs: 1_800,
            frontend_base_url: "http://localhost:3000".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config: {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse config yaml")?;
        config.billing.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: gateway.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.billing.commission_rate, Decimal::new(15, 3));
        assert_eq!(config.billing.callback_timeout(), Duration::from_secs(5));
        assert!(config.postgres_url.is_none());
        assert_eq!(config.auth.token_ttl_secs, 1_800);
    }

    #[test]
    fn test_rejects_out_of_range_rate() {
        let yaml = format!(
            "{}billing:\n  commission_rate: \"1.5\"\n  callback_timeout_ms: 100\n",
            MINIMAL
        );
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = BillingConfig {
            callback_timeout_ms: 0,
            ..BillingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
