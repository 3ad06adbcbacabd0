// 🚨 Load Errors - The one failure surfaced to users
// Ranking never fails: missing sheets, odd tokens and ambiguous matches are
// all resolved locally. Only failing to obtain the data set at all is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while obtaining the competition data set.
#[derive(Error, Debug)]
pub enum LoadError {
    /// A file or directory could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sheet exists but is not valid CSV
    #[error("Failed to parse sheet {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The competition configuration could not be used
    #[error("Invalid configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Not a single result sheet was found
    #[error("No result data found in {dir}")]
    NoData { dir: PathBuf },
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        LoadError::Csv {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for the CLI: 2 for configuration problems, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::Config { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = LoadError::NoData {
            dir: PathBuf::from("/data/GETXO"),
        };
        assert_eq!(err.to_string(), "No result data found in /data/GETXO");

        let err = LoadError::io(
            "/data/VIERNES100.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("VIERNES100.csv"));
    }

    #[test]
    fn test_exit_codes() {
        let config = LoadError::Config {
            path: PathBuf::from("show.json"),
            message: "bad".to_string(),
        };
        assert_eq!(config.exit_code(), 2);
        assert_eq!(LoadError::NoData { dir: PathBuf::from(".") }.exit_code(), 1);
    }
}
