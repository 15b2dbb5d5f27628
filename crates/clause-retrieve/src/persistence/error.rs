//! Error types for index persistence (atomic rebuild, swap-on-success).

use std::fmt;

#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Format {
        message: String,
        expected: Option<String>,
        actual: Option<String>,
    },
    Serialization(String),
    NotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Format {
                message,
                expected,
                actual,
            } => {
                write!(f, "format error: {}", message)?;
                if let Some(e) = expected {
                    write!(f, " (expected: {})", e)?;
                }
                if let Some(a) = actual {
                    write!(f, " (actual: {})", a)?;
                }
                Ok(())
            }
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::NotFound(resource) => write!(f, "resource not found: {}", resource),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<postcard::Error> for PersistenceError {
    fn from(e: postcard::Error) -> Self {
        Self::Serialization(format!("postcard error: {}", e))
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
