use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub min_password_length: u64,
    pub jwt: JwtConfig,
    pub payment: PaymentConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24);
        let min_password_length = env::var("MIN_PASSWORD_LENGTH")
            .ok()
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(8);
        let currency = env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string());
        let from_address =
            env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string());

        Ok(Self {
            min_password_length,
            jwt: JwtConfig { secret, ttl_hours },
            payment: PaymentConfig { currency },
            email: EmailConfig { from_address },
        })
    }

    /// Configuration with local defaults and the given signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            min_password_length: 8,
            jwt: JwtConfig {
                secret: secret.into(),
                ttl_hours: 24,
            },
            payment: PaymentConfig {
                currency: "usd".to_string(),
            },
            email: EmailConfig {
                from_address: "no-reply@localhost".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_reads_overrides_and_defaults() {
        // SAFETY: no other test in this crate touches these variables.
        unsafe {
            env::set_var("JWT_SECRET", "from-env");
            env::set_var("MIN_PASSWORD_LENGTH", "12");
            env::remove_var("PAYMENT_CURRENCY");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.jwt.secret, "from-env");
        assert_eq!(config.min_password_length, 12);
        assert_eq!(config.jwt.ttl_hours, 24);
        assert_eq!(config.payment.currency, "usd");
    }
}
