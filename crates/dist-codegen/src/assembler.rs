//! Incremental worker assembly.
//!
//! The assembler is driven once per function declaration site encountered
//! while walking sources. The first queue-transport site of a server emits
//! that server's whole worker; later sites of the same server are no-ops.
//! All run state lives in the caller-owned [`RunContext`], so several passes
//! (one per source file) can share one session.

use crate::context::{Diagnostic, DiagnosticKind, RunContext};
use crate::grouper::FunctionMap;
use crate::worker::{WorkerEmitter, start_routine_name};
use distributor_core::{DeclarationModel, FunctionName, GeneratorConfig, Result, ServerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A function declaration encountered in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSite {
    /// Declared function name
    pub function: FunctionName,
    /// Where the declaration was found, e.g. `src/math.js:12`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl DeclarationSite {
    /// Creates a site without location information.
    #[must_use]
    pub fn new(function: impl Into<FunctionName>) -> Self {
        Self {
            function: function.into(),
            origin: None,
        }
    }

    /// Attaches the location of the declaration.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

impl From<&str> for DeclarationSite {
    fn from(function: &str) -> Self {
        Self::new(function)
    }
}

impl fmt::Display for DeclarationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "'{}' at {origin}", self.function),
            None => write!(f, "'{}'", self.function),
        }
    }
}

/// What happened at one declaration site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteOutcome {
    /// The server's worker was emitted.
    Generated(ServerId),
    /// The server's worker was emitted earlier in the session.
    AlreadyGenerated(ServerId),
    /// The function uses another transport.
    OtherTransport,
    /// The function is not declared.
    UnknownFunction,
    /// The function's server is not declared.
    UnknownServer,
    /// The server has no queue settings.
    MissingQueueConfig,
    /// The worker template failed to render.
    RenderFailed,
}

impl SiteOutcome {
    /// Returns `true` if the site produced worker text.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Counters of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    /// Sites visited
    pub sites: usize,
    /// Servers whose worker was emitted in this pass, in order
    pub generated: Vec<ServerId>,
    /// Sites skipped because their server was already emitted
    pub already_generated: usize,
    /// Sites of functions using another transport
    pub other_transport: usize,
    /// Sites that produced a diagnostic
    pub failed: usize,
}

impl PassSummary {
    fn record(&mut self, outcome: SiteOutcome) {
        self.sites += 1;
        match outcome {
            SiteOutcome::Generated(server) => self.generated.push(server),
            SiteOutcome::AlreadyGenerated(_) => self.already_generated += 1,
            SiteOutcome::OtherTransport => self.other_transport += 1,
            SiteOutcome::UnknownFunction
            | SiteOutcome::UnknownServer
            | SiteOutcome::MissingQueueConfig
            | SiteOutcome::RenderFailed => self.failed += 1,
        }
    }
}

/// Assembles worker modules from declaration sites.
///
/// # Examples
///
/// ```
/// use distributor_codegen::{RunContext, WorkerAssembler};
/// use distributor_core::{DeclarationModel, Function, GeneratorConfig, Server, ServerId, Transport};
///
/// let model = DeclarationModel::new(
///     vec![
///         Function::new("add", "S1", Transport::Rabbit, &["a", "b"]),
///         Function::new("sub", "S1", Transport::Rabbit, &["a", "b"]),
///     ],
///     vec![Server::rabbit("S1", "jobs")],
/// )
/// .unwrap();
///
/// let assembler = WorkerAssembler::new(&model, GeneratorConfig::default()).unwrap();
/// let mut ctx = RunContext::new();
/// let summary = assembler.generate(["add", "sub"], &mut ctx);
///
/// assert_eq!(summary.generated, vec![ServerId::new("S1")]);
/// assert_eq!(summary.already_generated, 1);
/// assert!(ctx.output(&ServerId::new("S1")).unwrap().contains("waitForCallS1();"));
/// ```
#[derive(Debug)]
pub struct WorkerAssembler<'m> {
    model: &'m DeclarationModel,
    functions: FunctionMap,
    emitter: WorkerEmitter,
}

impl<'m> WorkerAssembler<'m> {
    /// Creates an assembler over `model`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the worker template
    /// fails to register.
    pub fn new(model: &'m DeclarationModel, config: GeneratorConfig) -> Result<Self> {
        Ok(Self::with_emitter(model, WorkerEmitter::new(config)?))
    }

    /// Creates an assembler using a prepared emitter.
    #[must_use]
    pub fn with_emitter(model: &'m DeclarationModel, emitter: WorkerEmitter) -> Self {
        let functions = FunctionMap::build(model.functions());
        tracing::debug!(
            functions = model.functions().len(),
            servers = functions.server_count(),
            "grouped functions by server"
        );
        Self {
            model,
            functions,
            emitter,
        }
    }

    /// Functions grouped by server.
    #[must_use]
    pub const fn function_map(&self) -> &FunctionMap {
        &self.functions
    }

    /// Generator settings in use.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        self.emitter.config()
    }

    /// Visits every site in order.
    pub fn generate<I>(&self, sites: I, ctx: &mut RunContext) -> PassSummary
    where
        I: IntoIterator,
        I::Item: Into<DeclarationSite>,
    {
        let mut summary = PassSummary::default();
        for site in sites {
            let outcome = self.visit(&site.into(), ctx);
            summary.record(outcome);
        }
        tracing::info!(
            sites = summary.sites,
            generated = summary.generated.len(),
            failed = summary.failed,
            "assembly pass complete"
        );
        summary
    }

    /// Visits every declared function as a site, in declaration order.
    pub fn generate_all(&self, ctx: &mut RunContext) -> PassSummary {
        self.generate(
            self.model
                .functions()
                .iter()
                .map(|f| DeclarationSite::new(f.name.clone())),
            ctx,
        )
    }

    /// Handles one declaration site.
    ///
    /// Unknown functions, unknown servers, servers without queue settings,
    /// and render failures are reported in `ctx`; the session continues.
    pub fn visit(&self, site: &DeclarationSite, ctx: &mut RunContext) -> SiteOutcome {
        let Some(function) = self.model.function(site.function.as_str()) else {
            ctx.report(Diagnostic::new(
                DiagnosticKind::UnknownFunction,
                format!("function {site} is not declared"),
            ));
            return SiteOutcome::UnknownFunction;
        };

        let Some(server) = self.model.server(&function.server) else {
            ctx.report(Diagnostic::new(
                DiagnosticKind::UnknownServer,
                format!(
                    "server '{}' of function {site} is not declared",
                    function.server
                ),
            ));
            return SiteOutcome::UnknownServer;
        };

        if !function.uses_queue() {
            tracing::debug!(
                function = %function.name,
                method = function.method.as_str(),
                "skipping function with another transport"
            );
            return SiteOutcome::OtherTransport;
        }

        if ctx.is_generated(&server.id) {
            return SiteOutcome::AlreadyGenerated(server.id.clone());
        }

        if server.rabbitmq.is_none() {
            ctx.report(Diagnostic::new(
                DiagnosticKind::MissingQueueConfig,
                format!(
                    "server '{}' hosts queue function {site} but has no rabbitmq settings",
                    server.id
                ),
            ));
            return SiteOutcome::MissingQueueConfig;
        }

        let functions = self.functions.queue_functions(&server.id);
        match self.emitter.emit(server, &functions, ctx) {
            Ok(code) => {
                ctx.append_worker(&server.id, &code, &start_routine_name(&server.id));
                ctx.mark_generated(&server.id);
                tracing::info!(
                    server = %server.id,
                    functions = functions.len(),
                    "generated worker"
                );
                SiteOutcome::Generated(server.id.clone())
            }
            Err(e) => {
                ctx.report(Diagnostic::new(
                    DiagnosticKind::RenderFailed,
                    format!("worker for server '{}' not generated: {e}", server.id),
                ));
                SiteOutcome::RenderFailed
            }
        }
    }
}
