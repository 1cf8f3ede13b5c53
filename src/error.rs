//! Library error type.
//!
//! Algorithmic outcomes such as a sparse map or a skipped iteration are values
//! on the result types, not errors. Only setup and I/O failures end up here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build correspondence worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("mapping thread panicked")]
    ThreadPanicked,

    #[error("mapping thread is no longer accepting input")]
    Disconnected,
}

impl MappingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
