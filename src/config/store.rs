//! Configuration stores
//!
//! The host owns persistence. This module only defines the seam used to read
//! and write a [`StoredConfig`], with an in-memory store and a JSON file store.

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use super::StoredConfig;

/// Reads and writes the stored configuration
pub trait ConfigStore {
    /// Returns the current configuration
    fn get_config(&self) -> Result<StoredConfig, StoreError>;

    /// Replaces the current configuration
    ///
    /// Returns `true` when the new configuration was saved.
    fn update_config(&self, config: StoredConfig) -> Result<bool, StoreError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn get_config(&self) -> Result<StoredConfig, StoreError> {
        (**self).get_config()
    }

    fn update_config(&self, config: StoredConfig) -> Result<bool, StoreError> {
        (**self).update_config(config)
    }
}

/// Keeps the configuration in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: RwLock<StoredConfig>,
}

impl MemoryStore {
    /// Creates a store holding the given configuration
    pub fn new(config: StoredConfig) -> MemoryStore {
        MemoryStore {
            config: RwLock::new(config),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get_config(&self) -> Result<StoredConfig, StoreError> {
        Ok(self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn update_config(&self, config: StoredConfig) -> Result<bool, StoreError> {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(true)
    }
}

/// Persists the configuration as a JSON document
///
/// A missing file is created with the default configuration on first read.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by the given file
    pub fn new<P: AsRef<Path>>(path: P) -> JsonFileStore {
        JsonFileStore {
            path: PathBuf::from(path.as_ref()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, config: &StoredConfig) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec_pretty(config)?;

        // Write next to the target, then swap it in
        let mut partial = self.path.clone().into_os_string();
        partial.push(".tmp");
        let partial = PathBuf::from(partial);
        fs::write(&partial, serialized)?;
        fs::rename(&partial, &self.path)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get_config(&self) -> Result<StoredConfig, StoreError> {
        match fs::read(&self.path) {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                #[cfg(feature = "tracing")]
                tracing::debug!("creating default configuration in {}", self.path.display());

                let config = StoredConfig::default();
                self.write(&config)?;
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_config(&self, config: StoredConfig) -> Result<bool, StoreError> {
        self.write(&config)?;
        Ok(true)
    }
}

/// Failure to read or write a configuration store
#[derive(Debug)]
pub enum StoreError {
    /// IO error
    Io(io::Error),
    /// JSON (de)serialization error
    Json(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "configuration store: {err}"),
            StoreError::Json(err) => write!(f, "invalid stored configuration: {err}"),
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Json(err) => Some(err),
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> StoreError {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> StoreError {
        StoreError::Json(err)
    }
}

#[cfg(test)]
mod test {
    use std::env::temp_dir;

    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    fn gmail() -> StoredConfig {
        StoredConfig {
            provider: "gmail".to_owned(),
            login: Some("a@gmail.com".to_owned()),
            password: Some("p".to_owned()),
            sender: Some("a@gmail.com".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn memory_store() {
        let store = MemoryStore::default();
        assert_eq!(store.get_config().unwrap(), StoredConfig::default());

        assert!(store.update_config(gmail()).unwrap());
        assert_eq!(store.get_config().unwrap(), gmail());
    }

    #[test]
    fn file_store_creates_defaults() {
        let path = temp_dir().join(format!("{}.json", Uuid::new_v4()));
        let store = JsonFileStore::new(&path);

        assert_eq!(store.get_config().unwrap(), StoredConfig::default());
        assert!(path.exists());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_store_round_trip() {
        let path = temp_dir().join(format!("{}.json", Uuid::new_v4()));
        let store = JsonFileStore::new(&path);

        assert!(store.update_config(gmail()).unwrap());
        assert_eq!(JsonFileStore::new(&path).get_config().unwrap(), gmail());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_store_reads_legacy_file() {
        let path = temp_dir().join(format!("{}.json", Uuid::new_v4()));
        fs::write(
            &path,
            r#"{"provider": "custom", "server": "mail.lan", "port": "25", "login": null,
                "password": null, "tls": false, "ssl": false, "sender": "alerts@mail.lan"}"#,
        )
        .unwrap();

        let config = JsonFileStore::new(&path).get_config().unwrap();
        assert_eq!(config.port, Some(25));
        assert_eq!(config.sender.as_deref(), Some("alerts@mail.lan"));

        // Older plugin generation: prefixed keys, unset flags
        fs::write(
            &path,
            r#"{"smtp_server": "mail.lan", "smtp_port": 25, "smtp_login": "",
                "smtp_password": "", "smtp_tls": null, "smtp_ssl": "",
                "email_sender": "me@lan"}"#,
        )
        .unwrap();

        let config = JsonFileStore::new(&path).get_config().unwrap();
        assert_eq!(config.provider, "custom");
        assert_eq!(config.server.as_deref(), Some("mail.lan"));
        assert_eq!(config.port, Some(25));
        assert_eq!(config.sender.as_deref(), Some("me@lan"));
        assert!(!config.tls && !config.ssl);
        assert!(config.resolve().is_ok());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_store_rejects_garbage() {
        let path = temp_dir().join(format!("{}.json", Uuid::new_v4()));
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::new(&path).get_config(),
            Err(StoreError::Json(_))
        ));

        fs::remove_file(path).unwrap();
    }
}
