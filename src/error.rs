//! Error types for the crew staffing engine.
//!
//! The calculation core never fails: unmatched trains, missing fields and
//! malformed rule parameters all degrade into explainable results. Errors only
//! arise at the configuration seam (loading and looking up staffing standards).

use thiserror::Error;

/// The main error type for the crew staffing engine.
///
/// # Example
///
/// ```
/// use crew_staffing_engine::error::EngineError;
///
/// let error = EngineError::StandardNotFound {
///     bureau: "shanghai".to_string(),
/// };
/// assert_eq!(error.to_string(), "Staffing standard not found for bureau: shanghai");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// No staffing standard is configured for the requested bureau.
    #[error("Staffing standard not found for bureau: {bureau}")]
    StandardNotFound {
        /// The bureau that was requested.
        bureau: String,
    },

    /// A staffing standard failed validation while loading.
    #[error("Invalid staffing standard '{bureau}': {message}")]
    InvalidStandard {
        /// The bureau the standard belongs to.
        bureau: String,
        /// What made the standard invalid.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
