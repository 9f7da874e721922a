use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct InvoicingConfig {
    pub common: core_config::Config,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub email: EmailOverrides,
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            timeout_secs: 30,
        }
    }
}

/// Environment values that take precedence over the stored email settings.
#[derive(Debug, Clone, Default)]
pub struct EmailOverrides {
    pub user: Option<String>,
    pub password: Option<Secret<String>>,
    pub recipient: Option<String>,
}

impl EmailOverrides {
    pub fn from_env() -> Self {
        Self {
            user: non_empty_env("EMAIL_USER"),
            password: non_empty_env("EMAIL_PASS").map(Secret::new),
            recipient: non_empty_env("REMINDER_EMAIL"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Local time of the daily run.
    pub hour: u32,
    pub minute: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 9,
            minute: 0,
        }
    }
}

impl InvoicingConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let reminder_defaults = ReminderConfig::default();
        let hour = parse_env("REMINDER_HOUR", reminder_defaults.hour).min(23);
        let minute = parse_env("REMINDER_MINUTE", reminder_defaults.minute).min(59);

        Ok(InvoicingConfig {
            common: common_config,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: non_empty_env("OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", Some("sqlite://data.db"), is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5),
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: parse_env("SMTP_PORT", 587),
                timeout_secs: parse_env("SMTP_TIMEOUT_SECS", 30),
            },
            email: EmailOverrides::from_env(),
            reminder: ReminderConfig {
                enabled: parse_env("REMINDER_ENABLED", reminder_defaults.enabled),
                hour,
                minute,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Unset or unparsable values fall back to `default`.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    const KEYS: [&str; 9] = [
        "ENVIRONMENT",
        "DATABASE_URL",
        "SMTP_PORT",
        "EMAIL_USER",
        "EMAIL_PASS",
        "REMINDER_EMAIL",
        "REMINDER_ENABLED",
        "REMINDER_HOUR",
        "SMTP_HOST",
    ];

    fn clear() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_outside_production() {
        clear();
        let config = InvoicingConfig::load().unwrap();
        assert_eq!(config.database.url, "sqlite://data.db");
        assert_eq!(config.smtp.host, "smtp.gmail.com");
        assert_eq!(config.smtp.port, 587);
        assert!(config.reminder.enabled);
        assert_eq!((config.reminder.hour, config.reminder.minute), (9, 0));
        assert!(config.email.user.is_none());
    }

    #[test]
    #[serial]
    fn production_requires_database_url() {
        clear();
        env::set_var("ENVIRONMENT", "prod");
        let result = InvoicingConfig::load();
        clear();
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn blank_email_overrides_are_ignored() {
        clear();
        env::set_var("EMAIL_USER", "  ");
        env::set_var("EMAIL_PASS", "app-password");
        env::set_var("REMINDER_EMAIL", "owner@example.com");
        let overrides = EmailOverrides::from_env();
        clear();
        assert!(overrides.user.is_none());
        assert_eq!(
            overrides.password.as_ref().map(|p| p.expose_secret().as_str()),
            Some("app-password")
        );
        assert_eq!(overrides.recipient.as_deref(), Some("owner@example.com"));
    }

    #[test]
    #[serial]
    fn bad_numbers_fall_back_and_hours_are_clamped() {
        clear();
        env::set_var("SMTP_PORT", "not-a-port");
        env::set_var("REMINDER_HOUR", "42");
        env::set_var("REMINDER_ENABLED", "false");
        let config = InvoicingConfig::load().unwrap();
        clear();
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.reminder.hour, 23);
        assert!(!config.reminder.enabled);
    }
}
