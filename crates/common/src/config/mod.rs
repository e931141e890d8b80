//! Configuration management for PortraitForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Object storage configuration (training archive uploads)
    pub storage: StorageConfig,

    /// Inference provider configuration
    pub provider: ProviderConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Bucket receiving training archives
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,

    /// Region override
    pub region: Option<String>,

    /// Key prefix for uploaded archives
    #[serde(default = "default_upload_prefix")]
    pub upload_prefix: String,

    /// Pre-signed URL lifetime in seconds
    #[serde(default = "default_upload_expiry")]
    pub upload_expiry_secs: u64,

    /// Use path-style addressing (required by most S3-compatible stores)
    #[serde(default = "default_path_style")]
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider backend: fal, mock
    #[serde(default = "default_provider_backend")]
    pub backend: String,

    /// API key for the inference provider
    pub api_key: Option<String>,

    /// Queue endpoint base URL
    #[serde(default = "default_queue_base_url")]
    pub queue_base_url: String,

    /// Publicly reachable base URL for webhook callbacks
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,

    /// Model identifier for LoRA training jobs
    #[serde(default = "default_training_model")]
    pub training_model: String,

    /// Model identifier for image generation jobs
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Request timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// Shared secret expected on webhook deliveries (optional)
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_bucket() -> String { "portraitforge-uploads".to_string() }
fn default_upload_prefix() -> String { "models".to_string() }
fn default_upload_expiry() -> u64 { 300 }
fn default_path_style() -> bool { false }
fn default_provider_backend() -> String { "fal".to_string() }
fn default_queue_base_url() -> String { "https://queue.fal.run".to_string() }
fn default_webhook_base_url() -> String { "http://localhost:3000".to_string() }
fn default_training_model() -> String { "fal-ai/flux-lora-fast-training".to_string() }
fn default_generation_model() -> String { "fal-ai/flux-lora".to_string() }
fn default_provider_timeout() -> u64 { 30 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "portraitforge".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=3001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl StorageConfig {
    /// Pre-signed URL lifetime as Duration
    pub fn upload_expiry(&self) -> Duration {
        Duration::from_secs(self.upload_expiry_secs)
    }
}

impl ProviderConfig {
    /// Webhook callback URL for a given job kind ("train" or "image")
    pub fn webhook_url(&self, kind: &str) -> String {
        format!(
            "{}/fal-ai/webhook/{}",
            self.webhook_base_url.trim_end_matches('/'),
            kind
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/portraitforge".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            storage: StorageConfig {
                bucket: default_bucket(),
                endpoint: None,
                region: None,
                upload_prefix: default_upload_prefix(),
                upload_expiry_secs: default_upload_expiry(),
                force_path_style: default_path_style(),
            },
            provider: ProviderConfig {
                backend: default_provider_backend(),
                api_key: None,
                queue_base_url: default_queue_base_url(),
                webhook_base_url: default_webhook_base_url(),
                training_model: default_training_model(),
                generation_model: default_generation_model(),
                timeout_secs: default_provider_timeout(),
            },
            auth: AuthConfig {
                jwt_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
                webhook_secret: None,
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.training_model, "fal-ai/flux-lora-fast-training");
        assert_eq!(config.storage.upload_expiry_secs, 300);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/portraitforge");
    }

    #[test]
    fn test_webhook_url() {
        let mut config = AppConfig::default();
        config.provider.webhook_base_url = "https://api.example.com/".to_string();
        assert_eq!(
            config.provider.webhook_url("train"),
            "https://api.example.com/fal-ai/webhook/train"
        );
        assert_eq!(
            config.provider.webhook_url("image"),
            "https://api.example.com/fal-ai/webhook/image"
        );
    }
}
