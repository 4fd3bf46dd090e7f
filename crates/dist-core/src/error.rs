//! Error types for the distributor generator.
//!
//! One error enum is shared by every crate in the workspace. Variants carry
//! the context a user needs to fix the input (field names, paths, template
//! names) rather than bare messages.
//!
//! # Examples
//!
//! ```
//! use distributor_core::{Error, Result};
//!
//! fn require_queue(queue: &str) -> Result<()> {
//!     if queue.is_empty() {
//!         return Err(Error::ValidationError {
//!             field: "queue".to_string(),
//!             reason: "queue name cannot be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = require_queue("").unwrap_err();
//! assert!(err.is_validation_error());
//! ```

use thiserror::Error;

/// Main error type for the distributor generator.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    ///
    /// Raised when generator configuration is invalid or contradictory.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Serialization/deserialization error.
    ///
    /// Raised when declaration files or manifests cannot be converted.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Template registration or rendering failed.
    #[error("Template '{template}' failed: {message}")]
    TemplateError {
        /// Template name
        template: String,
        /// Description of the failure
        message: String,
    },

    /// Invalid argument error.
    ///
    /// Raised when CLI arguments or function parameters are invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Validation error for declaration data.
    ///
    /// Raised when the declaration model breaks one of its invariants, such
    /// as duplicate function names or names that are not valid identifiers.
    #[error("Validation error in {field}: {reason}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Detailed reason for the validation failure
        reason: String,
    },
}

impl Error {
    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns `true` if this is a validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use distributor_core::Error;
    ///
    /// let err = Error::ValidationError {
    ///     field: "functions".to_string(),
    ///     reason: "duplicate name 'add'".to_string(),
    /// };
    /// assert!(err.is_validation_error());
    /// ```
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    /// Returns `true` if this is a template error.
    #[must_use]
    pub const fn is_template_error(&self) -> bool {
        matches!(self, Self::TemplateError { .. })
    }
}

/// Result type alias used throughout the workspace.
///
/// # Examples
///
/// ```
/// use distributor_core::{Error, Result};
///
/// fn parse_port(value: i32) -> Result<u16> {
///     u16::try_from(value).map_err(|_| Error::InvalidArgument(format!("bad port {value}")))
/// }
///
/// assert!(parse_port(5672).is_ok());
/// assert!(parse_port(-1).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;
