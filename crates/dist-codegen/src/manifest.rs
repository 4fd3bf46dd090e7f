//! Manifest of import lines already written to generated workers.
//!
//! The manifest is persisted next to the generated files by the caller and
//! loaded into the [`RunContext`](crate::RunContext) of the next session.
//! When it covers a server, the import deduplicator answers from the
//! manifest instead of re-reading and scanning the worker file.

use distributor_core::{Error, Result, ServerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = ".distributor-manifest.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Normalized import lines per server.
///
/// # Examples
///
/// ```
/// use distributor_codegen::ImportManifest;
/// use distributor_core::ServerId;
///
/// let server = ServerId::new("S1");
/// let mut manifest = ImportManifest::new();
/// manifest.record(&server, "import { add } from \"./functions-S1.js\";");
/// manifest.record(&server, "import { add } from \"./functions-S1.js\";");
///
/// assert!(manifest.contains(&server, "import { add } from \"./functions-S1.js\";"));
/// assert_eq!(manifest.imports(&server).len(), 1);
///
/// let json = manifest.to_json().unwrap();
/// assert_eq!(ImportManifest::from_json(&json).unwrap(), manifest);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportManifest {
    /// Format version
    pub version: u32,
    /// Import lines keyed by server id, in emission order
    #[serde(default)]
    pub servers: BTreeMap<ServerId, Vec<String>>,
}

impl Default for ImportManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            servers: BTreeMap::new(),
        }
    }

    /// Returns `true` if the manifest has an entry for `server`.
    #[must_use]
    pub fn covers(&self, server: &ServerId) -> bool {
        self.servers.contains_key(server)
    }

    /// Returns `true` if `line` was recorded for `server`.
    #[must_use]
    pub fn contains(&self, server: &ServerId, line: &str) -> bool {
        self.servers
            .get(server)
            .is_some_and(|lines| lines.iter().any(|l| l == line))
    }

    /// Import lines recorded for `server`.
    #[must_use]
    pub fn imports(&self, server: &ServerId) -> &[String] {
        self.servers
            .get(server)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records `line` for `server` unless already present.
    pub fn record(&mut self, server: &ServerId, line: &str) {
        let lines = self.servers.entry(server.clone()).or_default();
        if !lines.iter().any(|l| l == line) {
            lines.push(line.to_string());
        }
    }

    /// Records every line of `imports`.
    pub fn merge<'a, I>(&mut self, imports: I)
    where
        I: IntoIterator<Item = (&'a ServerId, &'a Vec<String>)>,
    {
        for (server, lines) in imports {
            for line in lines {
                self.record(server, line);
            }
        }
    }

    /// Parses a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] for malformed input and
    /// [`Error::ValidationError`] for an unsupported version.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(json).map_err(|e| Error::SerializationError {
            message: format!("invalid import manifest: {e}"),
            source: Some(e),
        })?;

        if manifest.version != MANIFEST_VERSION {
            return Err(Error::ValidationError {
                field: "version".to_string(),
                reason: format!(
                    "unsupported manifest version {} (expected {MANIFEST_VERSION})",
                    manifest.version
                ),
            });
        }

        Ok(manifest)
    }

    /// Serializes the manifest as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::SerializationError {
            message: format!("failed to serialize import manifest: {e}"),
            source: Some(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manifest_is_empty() {
        let manifest = ImportManifest::new();
        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert!(!manifest.covers(&ServerId::new("S1")));
        assert!(manifest.imports(&ServerId::new("S1")).is_empty());
    }

    #[test]
    fn test_record_preserves_order() {
        let server = ServerId::new("S1");
        let mut manifest = ImportManifest::new();
        manifest.record(&server, "b");
        manifest.record(&server, "a");
        manifest.record(&server, "b");
        assert_eq!(manifest.imports(&server), ["b", "a"]);
    }

    #[test]
    fn test_merge() {
        let mut emitted = BTreeMap::new();
        emitted.insert(ServerId::new("S1"), vec!["x".to_string()]);
        emitted.insert(ServerId::new("S2"), vec!["y".to_string()]);

        let mut manifest = ImportManifest::new();
        manifest.record(&ServerId::new("S1"), "w");
        manifest.merge(&emitted);

        assert_eq!(manifest.imports(&ServerId::new("S1")), ["w", "x"]);
        assert!(manifest.contains(&ServerId::new("S2"), "y"));
    }

    #[test]
    fn test_unsupported_version() {
        let err = ImportManifest::from_json(r#"{"version": 99, "servers": {}}"#).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(ImportManifest::from_json("[]").is_err());
    }
}
