use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a conversion run. Malformed script content is never
/// one of these: the extractor and the segmenter degrade by omission.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read sheet '{sheet}' of {path}: {source}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("document shell {path} has no {placeholder} placeholder")]
    Template {
        path: PathBuf,
        placeholder: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
