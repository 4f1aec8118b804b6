//! Client configuration.
//!
//! Configuration is an explicit value handed to the invoker; nothing here is
//! read implicitly at load time. [`ClientConfig::from_env`] exists for
//! binaries that want the usual environment variables:
//!
//! - `FNCALL_BASE_URL` (required)
//! - `FNCALL_ANON_KEY` (required)
//! - `FNCALL_MAX_RETRIES` (optional, default 3)
//! - `FNCALL_TIMEOUT_MS` (optional, default 30000)

use std::env;
use std::time::Duration;
use thiserror::Error;

pub const ENV_BASE_URL: &str = "FNCALL_BASE_URL";
pub const ENV_ANON_KEY: &str = "FNCALL_ANON_KEY";
pub const ENV_MAX_RETRIES: &str = "FNCALL_MAX_RETRIES";
pub const ENV_TIMEOUT_MS: &str = "FNCALL_TIMEOUT_MS";

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Per-call retry and timeout options.
///
/// `max_retries` is the total number of attempts, so `1` means a single
/// attempt without retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl InvokeOptions {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns options safe to drive an attempt loop with.
    ///
    /// Zero attempts is raised to one so a call always produces a result;
    /// a zero timeout falls back to [`DEFAULT_TIMEOUT`].
    pub fn normalized(self) -> Self {
        Self {
            max_retries: self.max_retries.max(1),
            timeout: if self.timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                self.timeout
            },
        }
    }
}

/// Static settings shared by every call an invoker makes.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    anon_key: String,
    default_options: InvokeOptions,
}

impl ClientConfig {
    /// Creates a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Functions base URL, must start with `http://` or `https://`.
    ///   Trailing slashes are removed.
    /// * `anon_key` - Anonymous service key, must not be empty
    ///
    /// # Example
    ///
    /// ```
    /// use fncall_common::ClientConfig;
    ///
    /// let config = ClientConfig::new("https://example.supabase.co/functions/v1/", "anon").unwrap();
    /// assert_eq!(config.function_url("rag-search"), "https://example.supabase.co/functions/v1/rag-search");
    ///
    /// assert!(ClientConfig::new("example.supabase.co", "anon").is_err());
    /// ```
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let anon_key = anon_key.into();

        validate_http_url(&base_url, "base URL")?;
        if anon_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "anon key",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            default_options: InvokeOptions::default(),
        })
    }

    /// Loads configuration from `FNCALL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let anon_key = lookup(ENV_ANON_KEY).ok_or(ConfigError::Missing(ENV_ANON_KEY))?;
        let mut config = Self::new(base_url, anon_key)?;

        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            let max_retries = raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                name: ENV_MAX_RETRIES,
                reason: e.to_string(),
            })?;
            config.default_options.max_retries = max_retries;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: ENV_TIMEOUT_MS,
                reason: e.to_string(),
            })?;
            config.default_options.timeout = Duration::from_millis(timeout_ms);
        }

        config.default_options = config.default_options.normalized();
        Ok(config)
    }

    pub fn with_default_options(mut self, options: InvokeOptions) -> Self {
        self.default_options = options.normalized();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn default_options(&self) -> InvokeOptions {
        self.default_options
    }

    /// URL of the named function: `{base_url}/{function_name}`.
    pub fn function_url(&self, function_name: &str) -> String {
        format!("{}/{}", self.base_url, function_name)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &"*****")
            .field("default_options", &self.default_options)
            .finish()
    }
}

/// Validates that a URL string starts with `http://` or `https://`.
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - What the URL is for, used in the error
pub fn validate_http_url(url: &str, description: &'static str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(host) if !host.trim_matches('/').is_empty() => Ok(()),
        Some(_) => Err(ConfigError::Invalid {
            name: description,
            reason: format!("'{}' has no host", url),
        }),
        None => Err(ConfigError::Invalid {
            name: description,
            reason: format!("'{}' must start with http:// or https://", url),
        }),
    }
}
