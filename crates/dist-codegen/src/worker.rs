//! Worker module emission.
//!
//! [`WorkerEmitter`] turns one server and its queue-transport functions into
//! the text of a JavaScript worker: deduplicated imports followed by a start
//! routine that consumes the server's queue and dispatches `call` messages.

use crate::context::RunContext;
use crate::dedup::{ImportDeduplicator, ImportKind, normalize_import};
use crate::template_engine::{TemplateEngine, WORKER_TEMPLATE};
use distributor_core::{
    Error, Function, GeneratorConfig, Result, Server, ServerId, js_identifier_suffix,
};
use serde::Serialize;

/// Template data of one worker module.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerContext {
    /// Import lines to write, in order
    pub imports: Vec<String>,
    /// Name of the start routine, e.g. `waitForCallS1`
    pub start_routine: String,
    /// Quoted broker connection URL
    pub connection_url: String,
    /// Quoted queue name
    pub queue: String,
    /// One dispatch branch per function
    pub handlers: Vec<HandlerContext>,
}

/// Template data of one dispatch branch.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerContext {
    /// Function identifier
    pub name: String,
    /// Function name as a quoted string literal
    pub name_literal: String,
    /// Comma-separated parameter names
    pub parameters: String,
    /// Whether any parameter is declared
    pub has_parameters: bool,
}

/// Emits worker modules through the worker template.
///
/// # Examples
///
/// ```
/// use distributor_codegen::{RunContext, WorkerEmitter};
/// use distributor_core::{Function, GeneratorConfig, Server, Transport};
///
/// let emitter = WorkerEmitter::new(GeneratorConfig::default()).unwrap();
/// let server = Server::rabbit("S1", "jobs");
/// let add = Function::new("add", "S1", Transport::Rabbit, &["a", "b"]);
///
/// let mut ctx = RunContext::new();
/// let code = emitter.emit(&server, &[&add], &mut ctx).unwrap();
/// assert!(code.contains("import { add } from \"./functions-S1.js\";"));
/// assert!(code.contains("waitForCallS1();"));
/// ```
#[derive(Debug)]
pub struct WorkerEmitter {
    engine: TemplateEngine<'static>,
    config: GeneratorConfig,
}

impl WorkerEmitter {
    /// Creates an emitter with the built-in worker template.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the template fails to
    /// register.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: TemplateEngine::new()?,
            config,
        })
    }

    /// Creates an emitter around a prepared engine.
    ///
    /// The engine must have [`WORKER_TEMPLATE`] registered.
    #[must_use]
    pub const fn with_engine(engine: TemplateEngine<'static>, config: GeneratorConfig) -> Self {
        Self { engine, config }
    }

    /// Generator settings in use.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Renders the worker of `server` hosting `functions`.
    ///
    /// Imports are filtered through the deduplicator; the ones written are
    /// recorded in `ctx` once rendering succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] if `server` has no queue
    /// settings, [`Error::SerializationError`] if a literal cannot be
    /// quoted, or [`Error::TemplateError`] if rendering fails.
    pub fn emit(
        &self,
        server: &Server,
        functions: &[&Function],
        ctx: &mut RunContext,
    ) -> Result<String> {
        let transport = server
            .rabbitmq
            .as_ref()
            .ok_or_else(|| Error::ValidationError {
                field: format!("servers.{}.rabbitmq", server.id),
                reason: "server has no queue settings".to_string(),
            })?;

        let handlers = functions
            .iter()
            .map(|&f| handler_context(f))
            .collect::<Result<Vec<_>>>()?;
        let connection_url = js_string(
            transport.connection_url_or(&self.config.default_connection_url),
        )?;
        let queue = js_string(&transport.queue)?;

        let imports = self.imports(&server.id, functions, ctx)?;
        let context = WorkerContext {
            imports,
            start_routine: start_routine_name(&server.id),
            connection_url,
            queue,
            handlers,
        };

        let code = self.engine.render(WORKER_TEMPLATE, &context)?;
        for line in context.imports {
            ctx.record_import(&server.id, line);
        }

        tracing::debug!(
            server = %server.id,
            functions = functions.len(),
            bytes = code.len(),
            "rendered worker"
        );
        Ok(code)
    }

    /// Candidate imports of a worker that survive deduplication.
    ///
    /// Order: shared namespace, broker client, then one line per function
    /// in declaration order.
    fn imports(
        &self,
        server: &ServerId,
        functions: &[&Function],
        ctx: &mut RunContext,
    ) -> Result<Vec<String>> {
        let dedup = ImportDeduplicator::new(&self.config);

        let mut candidates = vec![
            (
                ImportKind::Primary,
                format!(
                    "import * as shared from {};",
                    js_string(&self.config.shared_module)?
                ),
            ),
            (
                ImportKind::Runtime,
                format!("import amqp from {};", js_string(&self.config.client_module)?),
            ),
        ];
        let functions_module = js_string(&self.config.functions_module(server))?;
        candidates.extend(functions.iter().map(|f| {
            (
                ImportKind::Function,
                format!("import {{ {} }} from {functions_module};", f.name),
            )
        }));

        Ok(candidates
            .into_iter()
            .map(|(kind, line)| (kind, normalize_import(&line)))
            .filter(|(kind, line)| dedup.check(*kind, server, line, ctx).is_emit())
            .map(|(_, line)| line)
            .collect())
    }
}

/// Name of the start routine of a server's worker.
///
/// # Examples
///
/// ```
/// use distributor_codegen::start_routine_name;
/// use distributor_core::ServerId;
///
/// assert_eq!(start_routine_name(&ServerId::new("S1")), "waitForCallS1");
/// assert_eq!(start_routine_name(&ServerId::new("eu-west")), "waitForCalleu_west");
/// ```
#[must_use]
pub fn start_routine_name(server: &ServerId) -> String {
    format!("waitForCall{}", js_identifier_suffix(server.as_str()))
}

/// Combines a freshly rendered worker with text already held for the
/// same server.
///
/// When `existing` already declares `start_routine`, its skeleton is
/// replaced: the import lines of `existing` are kept, followed by
/// `generated` (its new imports, then the one skeleton). Otherwise
/// `generated` is appended.
///
/// # Examples
///
/// ```
/// use distributor_codegen::merge_worker;
///
/// let existing = "import amqp from \"amqplib\";\n\nasync function waitForCallS1() {}\n\nwaitForCallS1();\n";
/// let generated = "import { sub } from \"./functions-S1.js\";\n\nasync function waitForCallS1() {}\n\nwaitForCallS1();\n";
///
/// let merged = merge_worker(existing, generated, "waitForCallS1");
/// assert!(merged.starts_with("import amqp from \"amqplib\";\nimport { sub }"));
/// assert_eq!(merged.matches("async function waitForCallS1()").count(), 1);
/// ```
#[must_use]
pub fn merge_worker(existing: &str, generated: &str, start_routine: &str) -> String {
    let declaration = format!("async function {start_routine}(");
    if !existing.contains(&declaration) {
        return format!("{existing}{generated}");
    }

    let mut merged = String::with_capacity(existing.len() + generated.len());
    for line in existing
        .lines()
        .filter(|line| line.trim_start().starts_with("import "))
    {
        merged.push_str(line.trim_end());
        merged.push('\n');
    }
    merged.push_str(generated.trim_start_matches('\n'));
    merged
}

fn handler_context(function: &Function) -> Result<HandlerContext> {
    let parameters = function.parameter_names();
    Ok(HandlerContext {
        name: function.name.to_string(),
        name_literal: js_string(function.name.as_str())?,
        has_parameters: !parameters.is_empty(),
        parameters: parameters.join(", "),
    })
}

/// Quotes `value` as a JavaScript string literal.
fn js_string(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::SerializationError {
        message: format!("cannot quote '{value}' as a string literal: {e}"),
        source: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use distributor_core::Transport;
    use std::fs;
    use tempfile::TempDir;

    fn emitter_in(dir: &TempDir) -> WorkerEmitter {
        let config = GeneratorConfig::builder().output_dir(dir.path()).build();
        WorkerEmitter::new(config).unwrap()
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("a\"b").unwrap(), "\"a\\\"b\"");
    }

    #[test]
    fn test_emit_imports_in_order() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server::rabbit("S1", "jobs");
        let add = Function::new("add", "S1", Transport::Rabbit, &["a", "b"]);
        let sub = Function::new("sub", "S1", Transport::Rabbit, &["a", "b"]);

        let mut ctx = RunContext::new();
        let code = emitter.emit(&server, &[&add, &sub], &mut ctx).unwrap();

        let shared = code.find("import * as shared from").unwrap();
        let amqp = code.find("import amqp from \"amqplib\";").unwrap();
        let add_at = code.find("import { add } from \"./functions-S1.js\";").unwrap();
        let sub_at = code.find("import { sub } from \"./functions-S1.js\";").unwrap();
        assert!(shared < amqp && amqp < add_at && add_at < sub_at);

        assert_eq!(ctx.emitted_imports()[&ServerId::new("S1")].len(), 4);
    }

    #[test]
    fn test_emit_uses_default_connection_url() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server::rabbit("S1", "jobs");
        let ping = Function::new("ping", "S1", Transport::Rabbit, &[]);

        let code = emitter
            .emit(&server, &[&ping], &mut RunContext::new())
            .unwrap();
        assert!(code.contains("amqp.connect(\"amqp://localhost\")"));
        assert!(code.contains("let queueName = \"jobs\";"));
        assert!(code.contains("const resultping = await ping();"));
        assert!(!code.contains("message.parameters"));
    }

    #[test]
    fn test_emit_uses_declared_connection_url() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server::rabbit("S1", "jobs").with_connection_url("amqp://broker:5672");
        let ping = Function::new("ping", "S1", Transport::Rabbit, &[]);

        let code = emitter
            .emit(&server, &[&ping], &mut RunContext::new())
            .unwrap();
        assert!(code.contains("amqp.connect(\"amqp://broker:5672\")"));
    }

    #[test]
    fn test_emit_without_queue_settings_fails() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server {
            id: ServerId::new("S1"),
            rabbitmq: None,
        };
        let err = emitter
            .emit(&server, &[], &mut RunContext::new())
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_emit_skips_imports_present_on_disk() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server::rabbit("S1", "jobs");
        let add = Function::new("add", "S1", Transport::Rabbit, &["a", "b"]);
        let path = emitter.config().output_path(&server.id);
        fs::write(&path, "import amqp from \"amqplib\";\nimport {add} from \"./functions-S1.js\";\n")
            .unwrap();

        let mut ctx = RunContext::new().with_initialized([path]);
        let code = emitter.emit(&server, &[&add], &mut ctx).unwrap();

        assert!(code.contains("import * as shared from"));
        assert!(!code.contains("import amqp from"));
        assert!(!code.contains("import { add }"));
        assert!(code.contains("const resultadd = await add(a, b);"));
    }

    #[test]
    fn test_render_failure_records_no_imports() {
        let dir = TempDir::new().unwrap();
        let config = GeneratorConfig::builder().output_dir(dir.path()).build();
        let mut engine = TemplateEngine::new().unwrap();
        engine
            .register_template_string(WORKER_TEMPLATE, "{{undefined_value}}")
            .unwrap();
        let emitter = WorkerEmitter::with_engine(engine, config);

        let mut ctx = RunContext::new();
        let server = Server::rabbit("S1", "jobs");
        assert!(emitter.emit(&server, &[], &mut ctx).is_err());
        assert!(ctx.emitted_imports().is_empty());
    }
    #[test]
    fn test_merge_appends_without_prior_skeleton() {
        let merged = merge_worker("// prelude\n", "import a from \"a\";\n", "waitForCallS1");
        assert_eq!(merged, "// prelude\nimport a from \"a\";\n");
    }

    #[test]
    fn test_merge_regenerated_worker_keeps_one_skeleton() {
        let dir = TempDir::new().unwrap();
        let emitter = emitter_in(&dir);
        let server = Server::rabbit("S1", "jobs");
        let add = Function::new("add", "S1", Transport::Rabbit, &["a", "b"]);
        let sub = Function::new("sub", "S1", Transport::Rabbit, &["a", "b"]);

        let first = emitter.emit(&server, &[&add], &mut RunContext::new()).unwrap();
        let path = emitter.config().output_path(&server.id);
        fs::write(&path, &first).unwrap();

        let mut ctx = RunContext::new().with_initialized([path]);
        let second = emitter.emit(&server, &[&add, &sub], &mut ctx).unwrap();
        let merged = merge_worker(&first, &second, "waitForCallS1");

        assert_eq!(merged.matches("async function waitForCallS1()").count(), 1);
        assert_eq!(merged.matches("waitForCallS1();").count(), 1);
        assert_eq!(merged.matches("import amqp from").count(), 1);
        assert_eq!(merged.matches("import { add }").count(), 1);
        assert_eq!(merged.matches("import { sub }").count(), 1);
        assert!(merged.contains("const resultsub = await sub(a, b);"));

        let last_import = merged.rfind("import ").unwrap();
        assert!(last_import < merged.find("async function").unwrap());
    }
}
