//! Common utilities shared across CLI commands.
//!
//! Provides the generator settings flags and declaration loading used by
//! both `generate` and `plan`.

use anyhow::{Context, Result};
use clap::Args;
use distributor_core::{DeclarationFile, DeclarationModel, GeneratorConfig, ReadFailurePolicy};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Generator settings accepted on the command line.
///
/// Values come from, in increasing priority: built-in defaults, the
/// `--config` TOML file, `DISTRIBUTOR_*` environment variables, flags.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigArgs {
    /// TOML file with generator settings
    #[arg(long = "config", env = "DISTRIBUTOR_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Directory receiving the generated workers
    #[arg(long, env = "DISTRIBUTOR_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Broker URL for servers that do not declare one
    #[arg(long, env = "DISTRIBUTOR_CONNECTION_URL")]
    pub connection_url: Option<String>,

    /// Module imported as the shared function namespace
    #[arg(long, env = "DISTRIBUTOR_SHARED_MODULE")]
    pub shared_module: Option<String>,

    /// Module providing the broker client
    #[arg(long, env = "DISTRIBUTOR_CLIENT_MODULE")]
    pub client_module: Option<String>,

    /// What to do with an import when an existing worker cannot be read
    /// (emit, suppress)
    #[arg(long, env = "DISTRIBUTOR_READ_FAILURE_POLICY")]
    pub read_failure_policy: Option<ReadFailurePolicy>,
}

impl ConfigArgs {
    /// Resolves the effective generator configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub fn resolve(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config_file {
            Some(path) => load_config(path)?,
            None => GeneratorConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(url) = &self.connection_url {
            config.default_connection_url.clone_from(url);
        }
        if let Some(module) = &self.shared_module {
            config.shared_module.clone_from(module);
        }
        if let Some(module) = &self.client_module {
            config.client_module.clone_from(module);
        }
        if let Some(policy) = self.read_failure_policy {
            config.read_failure_policy = policy;
        }

        config.validate().context("invalid generator configuration")?;
        Ok(config)
    }
}

/// Loads generator settings from a TOML file.
///
/// Missing keys keep their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: GeneratorConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    debug!("Loaded generator config from {}", path.display());
    Ok(config)
}

/// Loads and validates a declaration document.
///
/// `.toml` files are parsed as TOML, anything else as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or fails
/// model validation.
///
/// # Examples
///
/// ```no_run
/// use distributor_cli::commands::common::load_declarations;
/// use std::path::Path;
///
/// let model = load_declarations(Path::new("declarations.json"))?;
/// println!("{} functions", model.functions().len());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_declarations(path: &Path) -> Result<DeclarationModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read declarations {}", path.display()))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let model = if is_toml {
        let file: DeclarationFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse declarations {}", path.display()))?;
        DeclarationModel::try_from(file)
    } else {
        DeclarationModel::from_json_str(&content)
    }
    .with_context(|| format!("invalid declarations in {}", path.display()))?;

    debug!(
        "Loaded {} functions and {} servers from {}",
        model.functions().len(),
        model.servers().len(),
        path.display()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_defaults() {
        let config = ConfigArgs::default().resolve().unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("distributor.toml");
        fs::write(
            &path,
            "output_dir = \"gen\"\ndefault_connection_url = \"amqp://file\"\n",
        )
        .unwrap();

        let args = ConfigArgs {
            config_file: Some(path),
            connection_url: Some("amqp://flag".to_string()),
            ..ConfigArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("gen"));
        assert_eq!(config.default_connection_url, "amqp://flag");
        assert_eq!(config.file_prefix, "start-");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let args = ConfigArgs {
            connection_url: Some("  ".to_string()),
            ..ConfigArgs::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_load_declarations_json_and_toml() {
        let dir = TempDir::new().unwrap();

        let json = dir.path().join("decl.json");
        fs::write(
            &json,
            r#"{"functions":[{"name":"add","server":"S1","method":"RABBIT","parameters":["a","b"]}],
                "servers":[{"id":"S1","rabbitmq":{"queue":"jobs"}}]}"#,
        )
        .unwrap();
        assert_eq!(load_declarations(&json).unwrap().functions().len(), 1);

        let toml_path = dir.path().join("decl.toml");
        fs::write(
            &toml_path,
            r#"
[[functions]]
name = "add"
server = "S1"
method = "rabbit"
parameters = ["a", "b"]

[[servers]]
id = "S1"
rabbitmq = { queue = "jobs", connectionUrl = "amqp://broker" }
"#,
        )
        .unwrap();
        let model = load_declarations(&toml_path).unwrap();
        assert!(model.function("add").unwrap().uses_queue());
    }

    #[test]
    fn test_load_declarations_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("decl.json");
        fs::write(
            &path,
            r#"{"functions":[
                {"name":"add","server":"S1","method":"RABBIT"},
                {"name":"add","server":"S1","method":"RABBIT"}],
                "servers":[]}"#,
        )
        .unwrap();
        assert!(load_declarations(&path).is_err());
    }
}
