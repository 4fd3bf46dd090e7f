//! Strong domain types for the distributor generator.
//!
//! Server ids and function names travel through every stage of generation
//! and end up spliced into generated source. Newtypes keep the two from being
//! mixed up and give one place to hang identifier rules.
//!
//! # Examples
//!
//! ```
//! use distributor_core::{FunctionName, ServerId};
//!
//! let server = ServerId::new("S1");
//! let function = FunctionName::new("add");
//! assert_eq!(server.as_str(), "S1");
//! assert_eq!(function.as_str(), "add");
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Words that cannot name a function or binding in generated JavaScript.
const RESERVED_WORDS: &[&str] = &[
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Server identifier (newtype over String).
///
/// Ordered so that generated output can be kept in a deterministic map.
///
/// # Examples
///
/// ```
/// use distributor_core::ServerId;
///
/// let id = ServerId::new("billing");
/// assert_eq!(id.to_string(), "billing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Creates a new server identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the server ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ServerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Function name (newtype over String).
///
/// The name doubles as the JavaScript binding imported into the worker and
/// the `funcName` carried by call envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionName(String);

impl FunctionName {
    /// Creates a new function name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the function name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FunctionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for FunctionName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for FunctionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Returns `true` if `name` can be used as a plain JavaScript identifier.
///
/// Only the ASCII subset is accepted: a letter, `_` or `$`, followed by
/// letters, digits, `_` or `$`. Reserved words are rejected.
///
/// # Examples
///
/// ```
/// use distributor_core::is_js_identifier;
///
/// assert!(is_js_identifier("add"));
/// assert!(is_js_identifier("$send_2"));
/// assert!(!is_js_identifier("2fast"));
/// assert!(!is_js_identifier("delete"));
/// assert!(!is_js_identifier("a-b"));
/// ```
#[must_use]
pub fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED_WORDS.contains(&name)
}

/// Maps an arbitrary server id onto characters allowed inside an identifier.
///
/// Used to build the worker start routine name (`waitForCall<suffix>`), so a
/// leading digit is fine here.
///
/// # Examples
///
/// ```
/// use distributor_core::js_identifier_suffix;
///
/// assert_eq!(js_identifier_suffix("S1"), "S1");
/// assert_eq!(js_identifier_suffix("order-service.v2"), "order_service_v2");
/// ```
#[must_use]
pub fn js_identifier_suffix(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_id_roundtrip_json() {
        let id = ServerId::new("S1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"S1\"");
        let back: ServerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_server_id_ordering() {
        let mut ids = vec![ServerId::new("b"), ServerId::new("a"), ServerId::new("c")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
        assert_eq!(ids[2].as_str(), "c");
    }

    #[test]
    fn test_function_name_from_str() {
        let name: FunctionName = "sum".into();
        assert_eq!(name.to_string(), "sum");
    }

    #[test]
    fn test_is_js_identifier() {
        assert!(is_js_identifier("_private"));
        assert!(is_js_identifier("camelCase1"));
        assert!(!is_js_identifier(""));
        assert!(!is_js_identifier("with space"));
        assert!(!is_js_identifier("return"));
        assert!(!is_js_identifier("x;alert(1)"));
    }

    #[test]
    fn test_js_identifier_suffix_replaces_symbols() {
        assert_eq!(js_identifier_suffix("a b/c"), "a_b_c");
        assert_eq!(js_identifier_suffix("9lives"), "9lives");
    }
}
