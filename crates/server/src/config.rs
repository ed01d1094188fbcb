//! Service configuration

use anyhow::Result;
use serde::de::DeserializeOwned;
use shipping_lib::artifacts::{
    ArtifactPaths, ArtifactSource, DEFAULT_ENCODER_FILE, DEFAULT_MODEL_FILE, DEFAULT_SCALER_FILE,
};
use std::path::PathBuf;
use tracing::warn;

/// Optional config file, looked up as `shipping.toml` (or `.json`, `.yaml`) in the working dir
const CONFIG_FILE: &str = "shipping";

/// Service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,

    /// Directory holding the artifact files
    pub artifact_dir: PathBuf,

    pub scaler_file: String,
    pub encoder_file: String,
    pub model_file: String,

    /// Expected SHA-256 digests; unset means no integrity check
    pub scaler_sha256: Option<String>,
    pub encoder_sha256: Option<String>,
    pub model_sha256: Option<String>,

    /// Answer CORS preflights for any origin
    pub cors_allow_any: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_scaler_file() -> String {
    DEFAULT_SCALER_FILE.to_string()
}

fn default_encoder_file() -> String {
    DEFAULT_ENCODER_FILE.to_string()
}

fn default_model_file() -> String {
    DEFAULT_MODEL_FILE.to_string()
}

fn default_cors_allow_any() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            artifact_dir: default_artifact_dir(),
            scaler_file: default_scaler_file(),
            encoder_file: default_encoder_file(),
            model_file: default_model_file(),
            scaler_sha256: None,
            encoder_sha256: None,
            model_sha256: None,
            cors_allow_any: default_cors_allow_any(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the optional config file and `SHIPPING_*` env vars
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("SHIPPING"));
        Self::from_builder(builder)
    }

    /// Build from arbitrary sources. Each field is read on its own, so an
    /// invalid value falls back to that field's default only.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build()?;

        Ok(Self {
            host: field(&config, "host", default_host),
            port: field(&config, "port", default_port),
            artifact_dir: field(&config, "artifact_dir", default_artifact_dir),
            scaler_file: field(&config, "scaler_file", default_scaler_file),
            encoder_file: field(&config, "encoder_file", default_encoder_file),
            model_file: field(&config, "model_file", default_model_file),
            scaler_sha256: field(&config, "scaler_sha256", || None),
            encoder_sha256: field(&config, "encoder_sha256", || None),
            model_sha256: field(&config, "model_sha256", || None),
            cors_allow_any: field(&config, "cors_allow_any", default_cors_allow_any),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        let source = |file: &str, sha256: &Option<String>| {
            let source = ArtifactSource::new(self.artifact_dir.join(file));
            match sha256 {
                Some(digest) => source.with_sha256(digest.clone()),
                None => source,
            }
        };

        ArtifactPaths {
            scaler: source(&self.scaler_file, &self.scaler_sha256),
            encoder: source(&self.encoder_file, &self.encoder_sha256),
            model: source(&self.model_file, &self.model_sha256),
        }
    }
}

/// Read one key, falling back to `default` when it is unset or invalid
fn field<T: DeserializeOwned>(
    config: &config::Config,
    key: &str,
    default: impl FnOnce() -> T,
) -> T {
    match config.get::<T>(key) {
        Ok(value) => value,
        Err(config::ConfigError::NotFound(_)) => default(),
        Err(e) => {
            warn!(field = key, error = %e, "Invalid configuration value, using default");
            default()
        }
    }
}
