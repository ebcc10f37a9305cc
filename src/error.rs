//! Error handling for VisFlow
//!
//! This module defines the crate-level error type and a Result alias. The
//! engine layers have their own enums ([`FlowError`], [`DataError`]) which
//! convert into [`VisFlowError`] at the session and binary boundaries.

use crate::data::DataError;
use crate::flow::FlowError;
use thiserror::Error;

/// Main error type for VisFlow operations
#[derive(Error, Debug)]
pub enum VisFlowError {
    /// Errors raised by the dataflow engine
    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    /// Errors parsing datasets or constants
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors retrieving a dataset
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisFlowError>,
    },
}

impl VisFlowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisFlowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<toml::de::Error> for VisFlowError {
    fn from(err: toml::de::Error) -> Self {
        VisFlowError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for VisFlowError {
    fn from(err: toml::ser::Error) -> Self {
        VisFlowError::Serialization(err.to_string())
    }
}

/// Result type alias for VisFlow operations
pub type Result<T> = std::result::Result<T, VisFlowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<VisFlowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<VisFlowError>::into(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Into::<VisFlowError>::into(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisFlowError::Fetch("no such file".to_string());
        assert_eq!(err.to_string(), "Fetch error: no such file");
    }

    #[test]
    fn test_error_with_context() {
        let err: Result<()> = Err(FlowError::CycleDetected).context("Failed to connect");
        let msg = err.unwrap_err().to_string();
        assert!(msg.starts_with("Failed to connect"));
        assert!(msg.contains("Cycle"));
    }

    #[test]
    fn test_lazy_context() {
        let err: Result<()> =
            Err(VisFlowError::Config("bad".into())).with_context(|| format!("loading {}", 3));
        assert!(matches!(err, Err(VisFlowError::WithContext { .. })));
    }
}
