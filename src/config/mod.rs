//! Stored configuration and its resolution into a connection profile
//!
//! The configuration persisted by the host only names a provider and
//! optionally carries server settings and credentials. [`resolve`] turns it
//! into a [`ResolvedProfile`]: concrete connection parameters for one send
//! attempt, taken from the [provider table](crate::provider) for presets
//! and verbatim from the stored values for the custom provider.

use std::{
    error::Error as StdError,
    fmt::{self, Debug, Display, Formatter},
};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::provider::{self, CUSTOM_PROVIDER_KEY};

pub mod store;

/// Configuration as persisted by the host
///
/// Files written by the older generation of the plugin are read as well:
/// their `smtp_*` and `email_sender` keys are accepted as aliases, the port
/// may be text, and the encryption flags may be `null` or empty.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredConfig {
    /// Preset key, or [`CUSTOM_PROVIDER_KEY`]
    pub provider: String,
    /// SMTP server host name, custom provider only
    #[serde(alias = "smtp_server")]
    pub server: Option<String>,
    /// SMTP server port, custom provider only
    #[serde(alias = "smtp_port", deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    /// Login used to authenticate
    #[serde(alias = "smtp_login")]
    pub login: Option<String>,
    /// Password used to authenticate
    #[serde(alias = "smtp_password")]
    pub password: Option<String>,
    /// Upgrade the plaintext connection with STARTTLS
    #[serde(alias = "smtp_tls", deserialize_with = "deserialize_flag")]
    pub tls: bool,
    /// Connect over implicit TLS
    #[serde(alias = "smtp_ssl", deserialize_with = "deserialize_flag")]
    pub ssl: bool,
    /// Default `From` address
    #[serde(alias = "email_sender")]
    pub sender: Option<String>,
}

impl Default for StoredConfig {
    fn default() -> Self {
        StoredConfig {
            provider: CUSTOM_PROVIDER_KEY.to_owned(),
            server: None,
            port: None,
            login: None,
            password: None,
            tls: false,
            ssl: false,
            sender: None,
        }
    }
}

impl Debug for StoredConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredConfig")
            .field("provider", &self.provider)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .field("ssl", &self.ssl)
            .field("sender", &self.sender)
            .finish()
    }
}

impl StoredConfig {
    /// Checks values about to be written to the store
    ///
    /// Only the shape is checked here: the provider must be selectable and
    /// optional text fields must not be empty when present. Whether the
    /// configuration is complete enough to send is decided by [`resolve`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !provider::is_selectable(&self.provider) {
            return Err(ConfigError::UnknownProvider(self.provider.clone()));
        }
        if matches!(self.server.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(ConfigError::EmptyField("server"));
        }
        if matches!(self.sender.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(ConfigError::EmptyField("sender"));
        }
        Ok(())
    }

    /// Resolves this configuration, see [`resolve`]
    pub fn resolve(&self) -> Result<ResolvedProfile, ConfigError> {
        resolve(self)
    }
}

/// Concrete connection parameters for one send attempt
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    /// SMTP server host name
    pub server: String,
    /// SMTP server port
    pub port: u16,
    /// Upgrade the plaintext connection with STARTTLS
    pub tls: bool,
    /// Connect over implicit TLS
    pub ssl: bool,
    /// Default `From` address
    pub sender: Option<String>,
    /// Login to authenticate with, empty means no authentication
    pub login: Option<String>,
    /// Password to authenticate with
    pub password: Option<String>,
}

impl Debug for ResolvedProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProfile")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("ssl", &self.ssl)
            .field("sender", &self.sender)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ResolvedProfile {
    /// Login to authenticate with, if any
    pub fn login(&self) -> Option<&str> {
        non_empty(&self.login)
    }

    /// Configured `From` address, if any
    pub fn sender(&self) -> Option<&str> {
        non_empty(&self.sender)
    }
}

/// Resolves a stored configuration into a connection profile
///
/// * custom provider: server and port are required, and every connection
///   setting is copied from the stored configuration
/// * preset provider: login and password are required, server, port and
///   encryption come from the preset and override any stored value
pub fn resolve(config: &StoredConfig) -> Result<ResolvedProfile, ConfigError> {
    if config.provider == CUSTOM_PROVIDER_KEY {
        let server = non_empty(&config.server).ok_or(ConfigError::ServerPortRequired)?;
        let port = config
            .port
            .filter(|p| *p != 0)
            .ok_or(ConfigError::ServerPortRequired)?;

        return Ok(ResolvedProfile {
            server: server.to_owned(),
            port,
            tls: config.tls,
            ssl: config.ssl,
            sender: config.sender.clone(),
            login: config.login.clone(),
            password: config.password.clone(),
        });
    }

    let preset = provider::preset(&config.provider)
        .ok_or_else(|| ConfigError::UnknownProvider(config.provider.clone()))?;
    if non_empty(&config.login).is_none() || non_empty(&config.password).is_none() {
        return Err(ConfigError::CredentialsRequired);
    }

    Ok(ResolvedProfile {
        server: preset.server.to_owned(),
        port: preset.port,
        tls: preset.tls,
        ssl: preset.ssl,
        sender: config.sender.clone(),
        login: config.login.clone(),
        password: config.password.clone(),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// Older configurations stored the port as text, possibly empty
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(port)) => Ok(Some(port)),
        Some(RawPort::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawPort::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(ConfigError::InvalidPort(text))),
    }
}

// Older configurations stored unset flags as null or as an empty string
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Text(String),
    }

    match Option::<RawFlag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(RawFlag::Bool(flag)) => Ok(flag),
        Some(RawFlag::Text(text)) => match text.trim() {
            "" | "false" => Ok(false),
            "true" => Ok(true),
            _ => Err(D::Error::custom(format!("invalid flag {text:?}"))),
        },
    }
}

/// Invalid or incomplete stored configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Custom provider without server or port
    ServerPortRequired,
    /// Preset provider without login or password
    CredentialsRequired,
    /// Provider is neither a preset nor the custom sentinel
    UnknownProvider(String),
    /// Optional field present but empty
    EmptyField(&'static str),
    /// Port is not a number in 1..=65535
    InvalidPort(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ServerPortRequired => {
                f.write_str("server/port address must be configured when using custom provider")
            }
            ConfigError::CredentialsRequired => {
                f.write_str("credentials must be specified with chosen provider")
            }
            ConfigError::UnknownProvider(key) => write!(f, "unknown provider {key:?}"),
            ConfigError::EmptyField(name) => write!(f, "parameter {name:?} must not be empty"),
            ConfigError::InvalidPort(port) => write!(f, "invalid port {port:?}"),
        }
    }
}

impl StdError for ConfigError {}
