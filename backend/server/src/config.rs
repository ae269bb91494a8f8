use std::{
    env,
    fmt::Display,
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CAPTION_API_URL: &str =
    "https://api-inference.huggingface.co/models/Salesforce/blip-image-captioning-large";
pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";
const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Secret {0} is required but was not found in the environment or secrets directory")]
    MissingSecret(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub bucket_name: Option<String>,
    pub storage_api_url: String,
    pub storage_public_url: String,
    pub storage_token: Option<String>,
    pub caption_api_url: String,
    pub caption_api_key: Option<String>,
    pub caption_enabled: bool,
    pub unique_image_keys: bool,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Secrets fall back to
    /// `<SECRETS_DIR>/<NAME>` files when the lookup has no value for them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loader = Loader { lookup };
        let secrets_dir = PathBuf::from(loader.or_default("SECRETS_DIR", DEFAULT_SECRETS_DIR));

        let caption_enabled = loader.flag("CAPTION_ENABLED", true)?;
        let caption_api_key = loader
            .secret(&secrets_dir, "HUGGING_FACE_API_KEY")
            .map(|key| strip_bearer(&key));
        if caption_enabled && caption_api_key.is_none() {
            return Err(ConfigError::MissingSecret("HUGGING_FACE_API_KEY"));
        }

        Ok(Self {
            port: loader.try_load("PORT", "3000")?,
            redis_url: loader.or_default("REDIS_URL", "redis://127.0.0.1:6379"),
            bucket_name: loader.optional("GCS_BUCKET_NAME"),
            storage_api_url: loader.url("STORAGE_API_URL", DEFAULT_STORAGE_URL),
            storage_public_url: loader.url("STORAGE_PUBLIC_URL", DEFAULT_STORAGE_URL),
            storage_token: loader.secret(&secrets_dir, "STORAGE_TOKEN"),
            caption_api_url: loader.or_default("HUGGING_FACE_API_URL", DEFAULT_CAPTION_API_URL),
            caption_api_key,
            caption_enabled,
            unique_image_keys: loader.flag("UNIQUE_IMAGE_KEYS", false)?,
            cors_origins: loader
                .or_default("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            max_upload_bytes: loader.try_load("MAX_UPLOAD_BYTES", "10485760")?,
        })
    }
}

struct Loader<F> {
    lookup: F,
}

impl<F> Loader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
    }

    fn url(&self, key: &str, default: &str) -> String {
        self.or_default(key, default).trim_end_matches('/').to_string()
    }

    fn try_load<T: FromStr>(&self, key: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T::Err: Display,
    {
        let value = self.or_default(key, default);

        value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        })
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };

        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        }
    }

    fn secret(&self, secrets_dir: &Path, secret_name: &str) -> Option<String> {
        self.optional(secret_name)
            .or_else(|| read_secret(secrets_dir, secret_name))
    }
}

fn read_secret(secrets_dir: &Path, secret_name: &str) -> Option<String> {
    let path = secrets_dir.join(secret_name);

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}");
            None
        }
    }
}

fn strip_bearer(key: &str) -> String {
    key.strip_prefix("Bearer ").unwrap_or(key).trim().to_string()
}
