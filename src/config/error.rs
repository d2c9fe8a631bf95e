//! Configuration errors

use std::{
    io,
    path,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {err:?}", config.display())]
    ReadError {
        config: path::PathBuf,
        err: io::Error,
    },

    #[error("failed to deserialize config file '{}': {err:?}", config.display())]
    FailedDeserialization {
        config: path::PathBuf,
        err: toml::de::Error,
    },

    #[error("'{0}' is not a valid listen address")]
    InvalidAddress(String),

    #[error("no usable providers are configured")]
    NoProviders,
}
