//! Environment-driven configuration for the chat relay.
//!
//! Values are read through an injectable lookup so that tests never touch
//! the process environment. Blank values count as unset.

use crate::chat::{
    adapters::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    ports::GenerationConfig,
    services::{DEFAULT_CONTEXT_WINDOW, RetryPolicy},
};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the external credential.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_SESSION_TTL_HOURS: u64 = 720;
const SECONDS_PER_HOUR: u64 = 3600;

/// System instructions used when no prompt file is configured.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "\
You are the virtual assistant for this website. Provide helpful, accurate information about \
the services on offer.

IMPORTANT RULES:
- Never give exact prices; say \"starting at\" or suggest requesting a quote
- Be friendly and professional
- If unsure, suggest contacting the team directly
- Keep responses concise (max 100 words)";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable held a value that could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The system instructions file could not be read.
    #[error("failed to read system instructions from {path}: {source}")]
    SystemPrompt {
        /// Configured file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Settings for the chat relay and its server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// External credential; `None` selects the contact-reply short circuit.
    pub api_key: Option<String>,
    /// Generation model name.
    pub model: String,
    /// Base URL of the generation endpoint.
    pub api_base_url: String,
    /// History turns included in each prompt.
    pub context_window: usize,
    /// Retry bound and backoff base.
    pub retry: RetryPolicy,
    /// Sampling settings and per-attempt deadline.
    pub generation: GenerationConfig,
    /// Instructions placed at the top of every prompt.
    pub system_instructions: String,
    /// Idle retention for sessions; `None` keeps sessions forever.
    pub session_ttl: Option<Duration>,
    /// `PostgreSQL` URL; `None` selects in-memory storage.
    pub database_url: Option<String>,
    /// Listen address for the HTTP server.
    pub bind_addr: SocketAddr,
    /// CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl ChatConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is malformed or the system
    /// instructions file cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is malformed or the system
    /// instructions file cannot be read.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let timeout_ms: u64 = parse_or(&get, "PARLEY_TIMEOUT_MS", 10_000)?;
        let generation = GenerationConfig {
            timeout: Duration::from_millis(timeout_ms),
            ..GenerationConfig::default()
        };

        let retry = RetryPolicy::new(
            parse_or(&get, "PARLEY_MAX_ATTEMPTS", 3)?,
            Duration::from_millis(parse_or(&get, "PARLEY_BACKOFF_BASE_MS", 1000)?),
        );

        let system_instructions = match get("PARLEY_SYSTEM_PROMPT_FILE") {
            Some(path) => read_instructions(Utf8Path::new(&path))?,
            None => DEFAULT_SYSTEM_INSTRUCTIONS.to_owned(),
        };

        let ttl_hours: u64 = parse_or(&get, "PARLEY_SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        let session_ttl = (ttl_hours > 0)
            .then(|| Duration::from_secs(ttl_hours.saturating_mul(SECONDS_PER_HOUR)));

        let allowed_origins = get("PARLEY_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            api_key: get(API_KEY_VAR),
            model: get("PARLEY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_base_url: get("PARLEY_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            context_window: parse_or(&get, "PARLEY_CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW)?,
            retry,
            generation,
            system_instructions,
            session_ttl,
            database_url: get("DATABASE_URL"),
            bind_addr: parse_or(&get, "PARLEY_BIND", default_bind())?,
            allowed_origins,
        })
    }

    /// Returns `true` when an external credential is present.
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            api_base_url: DEFAULT_BASE_URL.to_owned(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            retry: RetryPolicy::default(),
            generation: GenerationConfig::default(),
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_owned(),
            session_ttl: Some(Duration::from_secs(
                DEFAULT_SESSION_TTL_HOURS * SECONDS_PER_HOUR,
            )),
            database_url: None,
            bind_addr: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |value| {
        value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value })
    })
}

fn read_instructions(path: &Utf8Path) -> Result<String, ConfigError> {
    let to_error = |source| ConfigError::SystemPrompt {
        path: path.to_owned(),
        source,
    };
    let file_name = path.file_name().ok_or_else(|| {
        to_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no file name",
        ))
    })?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(to_error)?;
    let contents = dir.read_to_string(file_name).map_err(to_error)?;
    Ok(contents.trim().to_owned())
}
