//! Configuration for the credential broker server.
//!
//! Sources: `.env` file (loaded in `main.rs`), environment variables and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use realtime_portal::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//!
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::PathBuf;

mod yaml;

use crate::core::realtime::{DEFAULT_REALTIME_MODEL, DEFAULT_REALTIME_VOICE, OPENAI_API_BASE_URL};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything the broker needs:
/// - Server settings (host, port, TLS)
/// - Provider API key and session defaults (model, voice)
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Long-lived provider key; never leaves the server
    pub openai_api_key: Option<String>,
    /// Provider base URL; `/v1/realtime/sessions` is appended
    pub openai_base_url: String,
    /// Model requested when minting a session credential
    pub realtime_model: String,
    /// Voice requested when minting a session credential
    pub realtime_voice: String,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name}: {e}")),
        None => Ok(None),
    }
}

fn tls_from_parts(
    enabled: bool,
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, String> {
    if !enabled {
        return Ok(None);
    }
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        _ => Err("TLS is enabled but cert_path or key_path is missing".to_string()),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `TLS_ENABLED`, `TLS_CERT_PATH`, `TLS_KEY_PATH` | disabled |
    /// | `OPENAI_API_KEY` | none |
    /// | `OPENAI_BASE_URL` | `https://api.openai.com` |
    /// | `REALTIME_MODEL` | `gpt-4o-realtime-preview-2024-12-17` |
    /// | `REALTIME_VOICE` | `verse` |
    /// | `CORS_ALLOWED_ORIGINS` | none |
    /// | `RATE_LIMIT_REQUESTS_PER_SECOND` | `60` |
    /// | `RATE_LIMIT_BURST_SIZE` | `10` |
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let tls_enabled = env_parse::<bool>("TLS_ENABLED")?.unwrap_or(false);

        let config = Self {
            host: env_string("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: env_parse("PORT")?.unwrap_or(DEFAULT_PORT),
            tls: tls_from_parts(
                tls_enabled,
                env_string("TLS_CERT_PATH"),
                env_string("TLS_KEY_PATH"),
            )?,
            openai_api_key: env_string("OPENAI_API_KEY"),
            openai_base_url: env_string("OPENAI_BASE_URL")
                .unwrap_or_else(|| OPENAI_API_BASE_URL.to_string()),
            realtime_model: env_string("REALTIME_MODEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            realtime_voice: env_string("REALTIME_VOICE")
                .unwrap_or_else(|| DEFAULT_REALTIME_VOICE.to_string()),
            cors_allowed_origins: env_string("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: env_parse("RATE_LIMIT_REQUESTS_PER_SECOND")?
                .unwrap_or(DEFAULT_RATE_LIMIT_RPS),
            rate_limit_burst_size: env_parse("RATE_LIMIT_BURST_SIZE")?
                .unwrap_or(DEFAULT_RATE_LIMIT_BURST),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = yaml::YamlConfig::from_file(path)?;
        let mut config = Self::from_env()?;

        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls {
                let enabled = tls.enabled.unwrap_or(true);
                config.tls = tls_from_parts(enabled, tls.cert_path, tls.key_path)?;
            }
        }

        if let Some(openai) = yaml.openai {
            if let Some(key) = openai.api_key {
                config.openai_api_key = Some(key);
            }
            if let Some(base_url) = openai.base_url {
                config.openai_base_url = base_url;
            }
            if let Some(model) = openai.model {
                config.realtime_model = model;
            }
            if let Some(voice) = openai.voice {
                config.realtime_voice = voice;
            }
        }

        if let Some(security) = yaml.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.openai_base_url)
            .map_err(|e| format!("Invalid OpenAI base URL '{}': {e}", self.openai_base_url))?;
        if self.realtime_model.trim().is_empty() {
            return Err("Realtime model must not be empty".to_string());
        }
        if self.rate_limit_requests_per_second == 0 || self.rate_limit_burst_size == 0 {
            return Err("Rate limit values must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Upstream endpoint used to mint session credentials.
    pub fn realtime_sessions_url(&self) -> String {
        format!(
            "{}/v1/realtime/sessions",
            self.openai_base_url.trim_end_matches('/')
        )
    }
}
