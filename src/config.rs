use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/";
const DEFAULT_DATABASE: &str = "foodgram";
const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8000";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("unknown STORAGE backend {0:?}, expected \"mongo\" or \"memory\"")]
    UnknownStorage(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Mongo { uri: String, database: String },
    Memory { fixture: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub storage: Storage,
    /// Prefix of short links and redirect targets.
    pub public_url: String,
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            info!(path = %path.display(), "loaded env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let storage = match or_default("STORAGE", "mongo").as_str() {
            "mongo" => Storage::Mongo {
                uri: or_default("MONGO_URI", DEFAULT_MONGO_URI),
                database: or_default("MONGO_DATABASE", DEFAULT_DATABASE),
            },
            "memory" => Storage::Memory {
                fixture: lookup("FIXTURE_PATH").map(PathBuf::from),
            },
            other => return Err(ConfigError::UnknownStorage(other.to_string())),
        };

        Ok(Config {
            storage,
            public_url: or_default("PUBLIC_URL", DEFAULT_PUBLIC_URL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(
            config.storage,
            Storage::Mongo {
                uri: DEFAULT_MONGO_URI.into(),
                database: DEFAULT_DATABASE.into()
            }
        );
        assert_eq!(config.public_url, DEFAULT_PUBLIC_URL);
    }

    #[test]
    fn test_memory_backend_with_fixture() {
        let config = config(&[
            ("STORAGE", "memory"),
            ("FIXTURE_PATH", "data/fixture.json"),
            ("PUBLIC_URL", "https://foodgram.example"),
        ])
        .unwrap();
        assert_eq!(
            config.storage,
            Storage::Memory {
                fixture: Some(PathBuf::from("data/fixture.json"))
            }
        );
        assert_eq!(config.public_url, "https://foodgram.example");
    }

    #[test]
    fn test_unknown_backend() {
        assert_eq!(
            config(&[("STORAGE", "sqlite")]),
            Err(ConfigError::UnknownStorage("sqlite".into()))
        );
    }
}
