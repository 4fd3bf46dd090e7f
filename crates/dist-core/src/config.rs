//! Generator configuration.
//!
//! Controls where generated workers live, which modules they import from,
//! and how the import deduplicator resolves an unreadable prior output.
//!
//! # Examples
//!
//! ```
//! use distributor_core::{GeneratorConfig, ReadFailurePolicy};
//!
//! let config = GeneratorConfig::default();
//! assert_eq!(config.default_connection_url, "amqp://localhost");
//! assert_eq!(config.read_failure_policy, ReadFailurePolicy::Emit);
//!
//! let custom = GeneratorConfig::builder()
//!     .output_dir("build/workers")
//!     .default_connection_url("amqp://rabbit:5672")
//!     .build();
//! assert!(custom.validate().is_ok());
//! ```

use crate::types::ServerId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do with an import when prior output cannot be read.
///
/// The file exists and was marked initialized, but reading it failed, so it
/// is unknown whether the import is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFailurePolicy {
    /// Emit the import (fail open). May duplicate a line already on disk.
    #[default]
    Emit,
    /// Suppress the import. May drop a line the module needs.
    Suppress,
}

impl ReadFailurePolicy {
    /// Returns the policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emit => "emit",
            Self::Suppress => "suppress",
        }
    }
}

impl fmt::Display for ReadFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "emit" => Ok(Self::Emit),
            "suppress" => Ok(Self::Suppress),
            _ => Err(Error::InvalidArgument(format!(
                "invalid read failure policy: '{s}' (expected: emit or suppress)"
            ))),
        }
    }
}

/// Configuration of the worker generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory holding generated workers.
    ///
    /// Default: `./src-gen`
    pub output_dir: PathBuf,

    /// File name prefix of a worker module.
    ///
    /// Default: `start-`
    pub file_prefix: String,

    /// File extension of a worker module, without the dot.
    ///
    /// Default: `js`
    pub file_extension: String,

    /// Module imported once per worker as the shared function namespace.
    ///
    /// Default: `../src-gen/functions.js`
    pub shared_module: String,

    /// Prefix of the per-server module that implements the functions.
    ///
    /// The server id and `.js` are appended. Default: `./functions-`
    pub functions_module_prefix: String,

    /// Module providing the broker client.
    ///
    /// Default: `amqplib`
    pub client_module: String,

    /// Broker URL used when a server does not configure one.
    ///
    /// Default: `amqp://localhost`
    pub default_connection_url: String,

    /// Decision taken when prior output cannot be read.
    ///
    /// Default: [`ReadFailurePolicy::Emit`]
    pub read_failure_policy: ReadFailurePolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./src-gen"),
            file_prefix: "start-".to_string(),
            file_extension: "js".to_string(),
            shared_module: "../src-gen/functions.js".to_string(),
            functions_module_prefix: "./functions-".to_string(),
            client_module: "amqplib".to_string(),
            default_connection_url: "amqp://localhost".to_string(),
            read_failure_policy: ReadFailurePolicy::Emit,
        }
    }
}

impl GeneratorConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::new()
    }

    /// Path of the worker module generated for `server`.
    ///
    /// # Examples
    ///
    /// ```
    /// use distributor_core::{GeneratorConfig, ServerId};
    /// use std::path::PathBuf;
    ///
    /// let config = GeneratorConfig::default();
    /// assert_eq!(
    ///     config.output_path(&ServerId::new("S1")),
    ///     PathBuf::from("./src-gen/start-S1.js")
    /// );
    /// ```
    #[must_use]
    pub fn output_path(&self, server: &ServerId) -> PathBuf {
        self.output_dir.join(format!(
            "{}{}.{}",
            self.file_prefix, server, self.file_extension
        ))
    }

    /// Import specifier of the module implementing `server`'s functions.
    ///
    /// # Examples
    ///
    /// ```
    /// use distributor_core::{GeneratorConfig, ServerId};
    ///
    /// let config = GeneratorConfig::default();
    /// assert_eq!(config.functions_module(&ServerId::new("S1")), "./functions-S1.js");
    /// ```
    #[must_use]
    pub fn functions_module(&self, server: &ServerId) -> String {
        format!("{}{}.js", self.functions_module_prefix, server)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the output directory, file
    /// extension, module names, or default broker URL are empty.
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(config_error("output directory cannot be empty"));
        }

        if self.file_extension.trim().is_empty() {
            return Err(config_error("file extension cannot be empty"));
        }

        if self.shared_module.trim().is_empty() || self.client_module.trim().is_empty() {
            return Err(config_error("module specifiers cannot be empty"));
        }

        if self.default_connection_url.trim().is_empty() {
            return Err(config_error("default connection URL cannot be empty"));
        }

        Ok(())
    }
}

fn config_error(message: &str) -> Error {
    Error::ConfigError {
        message: message.to_string(),
    }
}

/// Builder for `GeneratorConfig`.
///
/// # Examples
///
/// ```
/// use distributor_core::{GeneratorConfig, ReadFailurePolicy};
///
/// let config = GeneratorConfig::builder()
///     .file_prefix("worker-")
///     .read_failure_policy(ReadFailurePolicy::Suppress)
///     .build();
///
/// assert_eq!(config.file_prefix, "worker-");
/// assert_eq!(config.read_failure_policy, ReadFailurePolicy::Suppress);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    /// Creates a builder seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    /// Sets the worker file prefix.
    #[must_use]
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// Sets the worker file extension.
    #[must_use]
    pub fn file_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.file_extension = extension.into();
        self
    }

    /// Sets the shared function module.
    #[must_use]
    pub fn shared_module(mut self, module: impl Into<String>) -> Self {
        self.config.shared_module = module.into();
        self
    }

    /// Sets the per-server functions module prefix.
    #[must_use]
    pub fn functions_module_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.functions_module_prefix = prefix.into();
        self
    }

    /// Sets the broker client module.
    #[must_use]
    pub fn client_module(mut self, module: impl Into<String>) -> Self {
        self.config.client_module = module.into();
        self
    }

    /// Sets the fallback broker URL.
    #[must_use]
    pub fn default_connection_url(mut self, url: impl Into<String>) -> Self {
        self.config.default_connection_url = url.into();
        self
    }

    /// Sets the read failure policy.
    #[must_use]
    pub const fn read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.config.read_failure_policy = policy;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> GeneratorConfig {
        self.config
    }
}
