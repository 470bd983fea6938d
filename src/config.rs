use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 30;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAX_PDF_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_SIGNATURE_BYTES: usize = 5 * 1024 * 1024;
/// Longest link lifetime, for the configured default and per-document overrides.
pub const MAX_TOKEN_TTL_DAYS: u32 = 365;

// Default locations, overridable via environment variables
const DB_PATH: &str = "/var/lib/signlink/signlink.db";
const STORAGE_DIR: &str = "/var/lib/signlink/uploads";
const LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

/// Settings the signing engine needs. Passed explicitly into every use case
/// so tests can pin TTLs and limits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub token_ttl_days: u32,
    pub base_url: String,
    pub max_pdf_bytes: usize,
    pub max_signature_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_pdf_bytes: DEFAULT_MAX_PDF_BYTES,
            max_signature_bytes: DEFAULT_MAX_SIGNATURE_BYTES,
        }
    }
}

impl EngineConfig {
    /// Public link a counterpart follows to sign.
    pub fn signing_link(&self, token: &str) -> String {
        format!("{}/sign/{}", self.base_url.trim_end_matches('/'), token)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_days == 0 || self.token_ttl_days > MAX_TOKEN_TTL_DAYS {
            return Err(ConfigError::OutOfRange {
                name: "TOKEN_EXPIRY_DAYS",
                value: u64::from(self.token_ttl_days),
                min: 1,
                max: u64::from(MAX_TOKEN_TTL_DAYS),
            });
        }
        Ok(())
    }
}

/// Process-level settings for the HTTP service binary.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub engine: EngineConfig,
    pub db_path: String,
    pub storage_dir: PathBuf,
    pub listen_addr: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            token_ttl_days: parse_var("TOKEN_EXPIRY_DAYS", defaults.token_ttl_days)?,
            base_url: env::var("PUBLIC_BASE_URL").unwrap_or(defaults.base_url),
            max_pdf_bytes: parse_var("SIGNLINK_MAX_PDF_BYTES", defaults.max_pdf_bytes)?,
            max_signature_bytes: parse_var(
                "SIGNLINK_MAX_SIGNATURE_BYTES",
                defaults.max_signature_bytes,
            )?,
        };
        engine.validate()?;

        Ok(Self {
            engine,
            db_path: env::var("SIGNLINK_DB_PATH").unwrap_or_else(|_| DB_PATH.to_string()),
            storage_dir: env::var("SIGNLINK_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(STORAGE_DIR)),
            listen_addr: env::var("SIGNLINK_LISTEN_ADDR")
                .unwrap_or_else(|_| LISTEN_ADDR.to_string()),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
