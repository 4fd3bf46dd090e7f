//! Plan command implementation.
//!
//! Shows which workers a `generate` run would produce: every queue server,
//! the queue and broker it binds to, its worker path, and the functions it
//! dispatches. Nothing is written.

use super::common::{ConfigArgs, load_declarations};
use anyhow::Result;
use clap::Args;
use distributor_codegen::{FunctionMap, start_routine_name};
use distributor_core::cli::{ExitCode, OutputFormat};
use distributor_core::{DeclarationModel, GeneratorConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the `plan` command.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Declaration file (JSON, or TOML with a `.toml` extension)
    #[arg(short, long, env = "DISTRIBUTOR_DECLARATIONS")]
    pub declarations: PathBuf,

    /// Generator settings
    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Planned worker of one server.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WorkerPlan {
    /// Server id
    pub server: String,
    /// Start routine name
    pub start_routine: String,
    /// Queue consumed and replied to
    pub queue: String,
    /// Broker URL
    pub connection_url: String,
    /// Worker path
    pub output: String,
    /// Dispatched functions, in declaration order
    pub functions: Vec<String>,
}

/// Everything `generate` would do with a declaration file.
#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct Plan {
    /// Workers to generate
    pub workers: Vec<WorkerPlan>,
    /// Functions left to other transports
    pub other_transport: Vec<String>,
    /// Queue functions whose server is undeclared or has no queue settings
    pub unplaceable: Vec<String>,
}

/// Builds the plan of `model` under `config`.
///
/// # Examples
///
/// ```
/// use distributor_cli::commands::plan::build_plan;
/// use distributor_core::{DeclarationModel, Function, GeneratorConfig, Server, Transport};
///
/// let model = DeclarationModel::new(
///     vec![Function::new("add", "S1", Transport::Rabbit, &["a", "b"])],
///     vec![Server::rabbit("S1", "jobs")],
/// )?;
///
/// let plan = build_plan(&model, &GeneratorConfig::default());
/// assert_eq!(plan.workers[0].queue, "jobs");
/// assert_eq!(plan.workers[0].functions, ["add"]);
/// # Ok::<(), distributor_core::Error>(())
/// ```
#[must_use]
pub fn build_plan(model: &DeclarationModel, config: &GeneratorConfig) -> Plan {
    let functions = FunctionMap::build(model.functions());
    let mut plan = Plan::default();

    for function in model.functions() {
        if !function.uses_queue() {
            plan.other_transport.push(function.name.to_string());
            continue;
        }
        let placeable = model
            .server(&function.server)
            .is_some_and(|s| s.rabbitmq.is_some());
        if !placeable {
            plan.unplaceable.push(function.name.to_string());
        }
    }

    for server in model.servers() {
        let Some(transport) = &server.rabbitmq else {
            continue;
        };
        let dispatched: Vec<String> = functions
            .queue_functions(&server.id)
            .iter()
            .map(|f| f.name.to_string())
            .collect();
        if dispatched.is_empty() {
            continue;
        }

        plan.workers.push(WorkerPlan {
            server: server.id.to_string(),
            start_routine: start_routine_name(&server.id),
            queue: transport.queue.clone(),
            connection_url: transport
                .connection_url_or(&config.default_connection_url)
                .to_string(),
            output: config.output_path(&server.id).display().to_string(),
            functions: dispatched,
        });
    }

    plan
}

/// Runs the plan command.
///
/// # Errors
///
/// Returns an error if the declarations or config file cannot be loaded.
pub async fn run(args: PlanArgs, output_format: OutputFormat) -> Result<ExitCode> {
    let model = load_declarations(&args.declarations)?;
    let config = args.config.resolve()?;

    let plan = build_plan(&model, &config);
    info!(
        "Planned {} workers ({} functions on other transports)",
        plan.workers.len(),
        plan.other_transport.len()
    );

    let formatted = crate::formatters::format_output(&plan, output_format)?;
    println!("{formatted}");

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use distributor_core::{Function, Server, ServerId, Transport};

    #[test]
    fn test_plan_groups_and_filters() {
        let model = DeclarationModel::new(
            vec![
                Function::new("add", "S1", Transport::Rabbit, &["a", "b"]),
                Function::new("fetch", "S1", Transport::from("http"), &[]),
                Function::new("sub", "S1", Transport::Rabbit, &["a", "b"]),
                Function::new("lost", "S9", Transport::Rabbit, &[]),
                Function::new("bare", "S2", Transport::Rabbit, &[]),
            ],
            vec![
                Server::rabbit("S1", "jobs").with_connection_url("amqp://broker"),
                Server {
                    id: ServerId::new("S2"),
                    rabbitmq: None,
                },
            ],
        )
        .unwrap();

        let plan = build_plan(&model, &GeneratorConfig::default());
        assert_eq!(plan.workers.len(), 1);
        let worker = &plan.workers[0];
        assert_eq!(worker.start_routine, "waitForCallS1");
        assert_eq!(worker.connection_url, "amqp://broker");
        assert_eq!(worker.functions, ["add", "sub"]);
        assert_eq!(plan.other_transport, ["fetch"]);
        assert_eq!(plan.unplaceable, ["lost", "bare"]);
    }

    #[test]
    fn test_plan_skips_servers_without_queue_functions() {
        let model = DeclarationModel::new(
            vec![Function::new("fetch", "S1", Transport::from("http"), &[])],
            vec![Server::rabbit("S1", "jobs")],
        )
        .unwrap();
        assert!(build_plan(&model, &GeneratorConfig::default()).workers.is_empty());
    }
}
