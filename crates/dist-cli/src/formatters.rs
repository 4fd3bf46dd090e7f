//! Output formatters for CLI commands.
//!
//! Every command reports a serializable result; these formatters render it
//! as JSON, flat text, or colorized output.

use anyhow::Result;
use colored::Colorize;
use distributor_core::cli::OutputFormat;
use serde::Serialize;

/// Format data according to the specified output format.
///
/// # Errors
///
/// Returns an error if the data cannot be serialized.
///
/// # Examples
///
/// ```
/// use distributor_cli::formatters::format_output;
/// use distributor_core::cli::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Worker {
///     server: String,
///     functions: Vec<String>,
/// }
///
/// let worker = Worker {
///     server: "S1".to_string(),
///     functions: vec!["add".to_string()],
/// };
///
/// let output = format_output(&worker, OutputFormat::Text)?;
/// assert!(output.lines().any(|l| l == "server=S1"));
/// assert!(output.lines().any(|l| l == "functions.0=add"));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Format data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Plain text output formatting.
pub mod text {
    use super::{Result, Serialize};
    use serde_json::Value;

    /// Format data as `path=value` lines.
    ///
    /// Nested keys and array indices are joined with `.`, which keeps the
    /// output greppable from shell scripts. Empty arrays and objects are
    /// omitted.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut lines = Vec::new();
        flatten(&value, "", &mut lines);
        Ok(lines.join("\n"))
    }

    fn flatten(value: &Value, path: &str, lines: &mut Vec<String>) {
        let child = |key: &str| {
            if path.is_empty() {
                key.to_string()
            } else {
                format!("{path}.{key}")
            }
        };

        match value {
            Value::Object(obj) => {
                for (key, val) in obj {
                    flatten(val, &child(key), lines);
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter().enumerate() {
                    flatten(val, &child(&i.to_string()), lines);
                }
            }
            Value::String(s) => lines.push(format!("{path}={s}")),
            Value::Null => lines.push(format!("{path}=")),
            other => lines.push(format!("{path}={other}")),
        }
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize};
    use serde_json::Value;

    /// Format data as colorized, indented output.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        write_value(&value, 0, &mut out);
        Ok(out)
    }

    fn write_value(value: &Value, indent: usize, out: &mut String) {
        let pad = "  ".repeat(indent);

        match value {
            Value::Null => out.push_str(&"-".dimmed().to_string()),
            Value::Bool(b) => out.push_str(&b.to_string().yellow().to_string()),
            Value::Number(n) => out.push_str(&n.to_string().cyan().to_string()),
            Value::String(s) => out.push_str(&s.green().to_string()),
            Value::Array(arr) if arr.is_empty() => out.push_str(&"none".dimmed().to_string()),
            Value::Array(arr) => {
                for item in arr {
                    out.push('\n');
                    out.push_str(&pad);
                    out.push_str("- ");
                    write_value(item, indent + 1, out);
                }
            }
            Value::Object(obj) if obj.is_empty() => out.push_str(&"none".dimmed().to_string()),
            Value::Object(obj) => {
                for (i, (key, val)) in obj.iter().enumerate() {
                    if indent > 0 || i > 0 {
                        out.push('\n');
                        out.push_str(&pad);
                    }
                    out.push_str(&key.blue().bold().to_string());
                    out.push_str(": ");
                    write_value(val, indent + 1, out);
                }
            }
        }
    }
}
