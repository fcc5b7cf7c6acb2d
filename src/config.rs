use crate::middleware::auth::AllowedRoles;
use crate::models::user::Role;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidtransEnvironment {
    Sandbox,
    Production,
}

impl MidtransEnvironment {
    pub fn snap_base_url(&self) -> &'static str {
        match self {
            MidtransEnvironment::Sandbox => "https://app.sandbox.midtrans.com",
            MidtransEnvironment::Production => "https://app.midtrans.com",
        }
    }
}

/// What to do when the gateway delivers a notification for an order that
/// has already been settled one way or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookPolicy {
    /// Apply the transition and its side effects again.
    Reapply,
    /// Acknowledge and skip.
    Dedupe,
}

impl FromStr for WebhookPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reapply" => Ok(WebhookPolicy::Reapply),
            "dedupe" => Ok(WebhookPolicy::Dedupe),
            other => Err(format!("expected reapply or dedupe, got {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub rate_limit_per_minute: u64,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub environment: MidtransEnvironment,
    pub verify_signature: bool,
    pub webhook_policy: WebhookPolicy,
    pub timeout_secs: u64,
}

/// Which roles may reach each class of route. Handed to
/// `configure_routes` instead of living in globals.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub admin_only: AllowedRoles,
    pub user_only: AllowedRoles,
    pub all_roles: AllowedRoles,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            admin_only: AllowedRoles::new(vec![Role::Administrator]),
            user_only: AllowedRoles::new(vec![Role::User]),
            all_roles: AllowedRoles::new(vec![Role::Administrator, Role::User]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub app_url: String,
    pub database_url: String,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub midtrans: MidtransConfig,
    /// Share of the event price charged when a paid event is submitted.
    pub submission_fee_percent: u32,
    pub access: AccessPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_string())
        };

        let app_env = match optional("APP_ENV", "development").as_str() {
            "production" => AppEnv::Production,
            _ => AppEnv::Development,
        };

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: "must be at least 32 characters long".to_string(),
            });
        }

        let midtrans_environment = match optional("MIDTRANS_ENVIRONMENT", "sandbox").as_str() {
            "production" => MidtransEnvironment::Production,
            "sandbox" => MidtransEnvironment::Sandbox,
            other => {
                return Err(ConfigError::Invalid {
                    var: "MIDTRANS_ENVIRONMENT",
                    reason: format!("expected sandbox or production, got {}", other),
                })
            }
        };

        let webhook_policy = optional("MIDTRANS_WEBHOOK_POLICY", "reapply")
            .parse::<WebhookPolicy>()
            .map_err(|reason| ConfigError::Invalid {
                var: "MIDTRANS_WEBHOOK_POLICY",
                reason,
            })?;

        let submission_fee_percent = parse_var(&optional("SUBMISSION_FEE_PERCENT", "25"), "SUBMISSION_FEE_PERCENT")?;
        if submission_fee_percent > 100 {
            return Err(ConfigError::Invalid {
                var: "SUBMISSION_FEE_PERCENT",
                reason: "must be between 0 and 100".to_string(),
            });
        }

        Ok(Self {
            app_env,
            app_url: optional("APP_URL", "http://localhost:3000"),
            database_url: required("DATABASE_URL")?,
            server: ServerConfig {
                host: optional("SERVER_HOST", "0.0.0.0"),
                port: parse_var(&optional("SERVER_PORT", "8080"), "SERVER_PORT")?,
                cors_allowed_origins: optional(
                    "CORS_ALLOWED_ORIGINS",
                    "http://localhost:3000,http://localhost:5173",
                )
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
                rate_limit_per_minute: parse_var(
                    &optional("RATE_LIMIT_PER_MINUTE", "100"),
                    "RATE_LIMIT_PER_MINUTE",
                )?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                ttl_minutes: parse_var(&optional("JWT_TTL_MINUTES", "60"), "JWT_TTL_MINUTES")?,
            },
            smtp: SmtpConfig {
                host: optional("SMTP_HOST", "localhost"),
                port: parse_var(&optional("SMTP_PORT", "587"), "SMTP_PORT")?,
                username: optional("SMTP_USERNAME", ""),
                password: optional("SMTP_PASSWORD", ""),
                from: optional("EMAIL_FROM", "no-reply@fasttix.id"),
            },
            midtrans: MidtransConfig {
                server_key: optional("MIDTRANS_SERVER_KEY", ""),
                environment: midtrans_environment,
                verify_signature: parse_bool(&optional("MIDTRANS_VERIFY_SIGNATURE", "true")),
                webhook_policy,
                timeout_secs: parse_var(&optional("MIDTRANS_TIMEOUT_SECS", "15"), "MIDTRANS_TIMEOUT_SECS")?,
            },
            submission_fee_percent,
            access: AccessPolicy::default(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

fn parse_var<T: FromStr>(value: &str, var: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn applies_defaults() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/fasttix"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.submission_fee_percent, 25);
        assert_eq!(cfg.midtrans.environment, MidtransEnvironment::Sandbox);
        assert_eq!(cfg.midtrans.webhook_policy, WebhookPolicy::Reapply);
        assert!(cfg.midtrans.verify_signature);
        assert_eq!(cfg.server.cors_allowed_origins.len(), 2);
        assert!(!cfg.is_production());
    }

    #[test]
    fn rejects_short_jwt_secret() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/fasttix"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_SECRET", .. }));
    }

    #[test]
    fn requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn parses_webhook_policy() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/fasttix"),
            ("JWT_SECRET", SECRET),
            ("MIDTRANS_WEBHOOK_POLICY", "dedupe"),
            ("MIDTRANS_VERIFY_SIGNATURE", "false"),
        ]))
        .unwrap();
        assert_eq!(cfg.midtrans.webhook_policy, WebhookPolicy::Dedupe);
        assert!(!cfg.midtrans.verify_signature);

        assert!("sometimes".parse::<WebhookPolicy>().is_err());
    }
}
