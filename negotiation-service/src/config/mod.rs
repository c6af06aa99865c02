use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct NegotiationConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageConfig,
    pub catalog_path: String,
    pub negotiation: PolicyConfig,
    pub mandate: MandateConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub mongodb: Option<MongoConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub default_max_rounds: u32,
    pub markup_min_percent: Decimal,
    pub markup_max_percent: Decimal,
    pub default_reference_cost: Decimal,
    pub supplier_response_timeout_ms: u64,
}

impl PolicyConfig {
    pub fn supplier_response_timeout(&self) -> Duration {
        Duration::from_millis(self.supplier_response_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MandateConfig {
    pub issuer: String,
    pub audience: String,
    pub key_id: String,
    pub ttl_hours: i64,
    pub key_bits: usize,
    pub private_key_path: Option<String>,
    pub public_key_path: Option<String>,
}

impl MandateConfig {
    /// Both PEM paths, when configured together.
    pub fn pem_paths(&self) -> Option<(&str, &str)> {
        match (&self.private_key_path, &self.public_key_path) {
            (Some(private), Some(public)) => Some((private.as_str(), public.as_str())),
            _ => None,
        }
    }
}

impl NegotiationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let backend = match get_env("STORAGE_BACKEND", Some("memory"))?
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "mongo" | "mongodb" => StorageBackend::Mongo,
            other => {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Invalid storage backend: {}",
                    other
                )))
            }
        };

        let mongodb = match backend {
            StorageBackend::Mongo => Some(MongoConfig {
                uri: Secret::new(get_env("MONGODB_URI", None)?),
                database: get_env("MONGODB_DATABASE", None)?,
            }),
            StorageBackend::Memory => None,
        };

        let config = NegotiationConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("negotiation-service"))?,
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            storage: StorageConfig { backend, mongodb },
            catalog_path: get_env("CATALOG_PATH", Some("catalog.json"))?,
            negotiation: PolicyConfig {
                default_max_rounds: parse_env("NEGOTIATION_DEFAULT_MAX_ROUNDS", "3")?,
                markup_min_percent: parse_env("NEGOTIATION_MARKUP_MIN_PERCENT", "5")?,
                markup_max_percent: parse_env("NEGOTIATION_MARKUP_MAX_PERCENT", "15")?,
                default_reference_cost: parse_env("NEGOTIATION_DEFAULT_REFERENCE_COST", "5.00")?,
                supplier_response_timeout_ms: parse_env("SUPPLIER_RESPONSE_TIMEOUT_MS", "5000")?,
            },
            mandate: MandateConfig {
                issuer: get_env("MANDATE_ISSUER", Some("SupplyMind"))?,
                audience: get_env("MANDATE_AUDIENCE", Some("ap2-payment-gateway"))?,
                key_id: get_env("MANDATE_KEY_ID", Some("supplymind-key-001"))?,
                ttl_hours: parse_env("MANDATE_TTL_HOURS", "24")?,
                key_bits: parse_env("MANDATE_KEY_BITS", "2048")?,
                private_key_path: get_optional_env("MANDATE_PRIVATE_KEY_PATH"),
                public_key_path: get_optional_env("MANDATE_PUBLIC_KEY_PATH"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let policy = &self.negotiation;
        if !(1..=5).contains(&policy.default_max_rounds) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NEGOTIATION_DEFAULT_MAX_ROUNDS must be between 1 and 5"
            )));
        }
        if policy.markup_min_percent < Decimal::ZERO
            || policy.markup_min_percent > policy.markup_max_percent
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Markup band is invalid: min {} max {}",
                policy.markup_min_percent,
                policy.markup_max_percent
            )));
        }
        if policy.default_reference_cost <= Decimal::ZERO {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NEGOTIATION_DEFAULT_REFERENCE_COST must be positive"
            )));
        }
        if self.mandate.ttl_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MANDATE_TTL_HOURS must be positive"
            )));
        }
        if self.mandate.key_bits < 2048 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MANDATE_KEY_BITS must be at least 2048"
            )));
        }
        if self.mandate.private_key_path.is_some() != self.mandate.public_key_path.is_some() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MANDATE_PRIVATE_KEY_PATH and MANDATE_PUBLIC_KEY_PATH must be set together"
            )));
        }
        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(format!(
                "{} is required but not set",
                key
            )))),
        },
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default))?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}
