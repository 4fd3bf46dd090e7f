//! Run-scoped generation state.
//!
//! A [`RunContext`] is created at the start of a generation session, threaded
//! through every assembler call, and handed back to the caller with the
//! accumulated worker text once all sources have been processed.

use crate::manifest::ImportManifest;
use crate::worker::merge_worker;
use distributor_core::ServerId;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// Category of a diagnostic reported during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A declaration site names a function missing from the declarations.
    UnknownFunction,
    /// A function names a server missing from the registry.
    UnknownServer,
    /// A queue-transport function belongs to a server without queue settings.
    MissingQueueConfig,
    /// Prior output could not be read during import deduplication.
    UnreadableOutput,
    /// The worker template failed to render.
    RenderFailed,
}

impl DiagnosticKind {
    /// Returns the kind as a short identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownFunction => "unknown_function",
            Self::UnknownServer => "unknown_server",
            Self::MissingQueueConfig => "missing_queue_config",
            Self::UnreadableOutput => "unreadable_output",
            Self::RenderFailed => "render_failed",
        }
    }
}

/// A recoverable problem met while generating.
///
/// Diagnostics never abort a session; they explain why a site or import was
/// handled the way it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Category
    pub kind: DiagnosticKind,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

/// Mutable state of one generation session.
///
/// # Examples
///
/// ```
/// use distributor_codegen::RunContext;
/// use distributor_core::ServerId;
/// use std::path::PathBuf;
///
/// let mut ctx = RunContext::new()
///     .with_initialized([PathBuf::from("src-gen/start-S1.js")]);
/// ctx.seed_output(&ServerId::new("S1"), "// header\n");
///
/// assert!(ctx.is_initialized(&PathBuf::from("src-gen/start-S1.js")));
/// assert_eq!(ctx.output(&ServerId::new("S1")), Some("// header\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    primary_emitted: HashSet<ServerId>,
    initialized: HashSet<PathBuf>,
    outputs: BTreeMap<ServerId, String>,
    generated: HashSet<ServerId>,
    emitted_imports: BTreeMap<ServerId, Vec<String>>,
    manifest: Option<ImportManifest>,
    diagnostics: Vec<Diagnostic>,
}

impl RunContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks output paths known to predate this run.
    #[must_use]
    pub fn with_initialized<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.initialized.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Attaches a manifest loaded from a previous run.
    #[must_use]
    pub fn with_manifest(mut self, manifest: ImportManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Marks one output path as initialized.
    pub fn mark_initialized(&mut self, path: impl Into<PathBuf>) {
        self.initialized.insert(path.into());
    }

    /// Returns `true` if `path` was marked initialized.
    #[must_use]
    pub fn is_initialized(&self, path: &Path) -> bool {
        self.initialized.contains(path)
    }

    /// Loaded manifest, if any.
    #[must_use]
    pub const fn manifest(&self) -> Option<&ImportManifest> {
        self.manifest.as_ref()
    }

    /// Appends text produced elsewhere (another generator, an earlier
    /// pass) to a server's output.
    pub fn seed_output(&mut self, server: &ServerId, text: &str) {
        self.outputs
            .entry(server.clone())
            .or_default()
            .push_str(text);
    }

    /// Accumulated worker text per server.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<ServerId, String> {
        &self.outputs
    }

    /// Accumulated text of one server.
    #[must_use]
    pub fn output(&self, server: &ServerId) -> Option<&str> {
        self.outputs.get(server).map(String::as_str)
    }

    /// Consumes the context and returns the accumulated text.
    #[must_use]
    pub fn into_outputs(self) -> BTreeMap<ServerId, String> {
        self.outputs
    }

    /// Returns `true` if the worker skeleton of `server` was produced.
    #[must_use]
    pub fn is_generated(&self, server: &ServerId) -> bool {
        self.generated.contains(server)
    }

    /// Returns `true` if the primary import of `server` was emitted.
    #[must_use]
    pub fn primary_emitted(&self, server: &ServerId) -> bool {
        self.primary_emitted.contains(server)
    }

    /// Import lines emitted this run, per server, in emission order.
    #[must_use]
    pub const fn emitted_imports(&self) -> &BTreeMap<ServerId, Vec<String>> {
        &self.emitted_imports
    }

    /// Diagnostics collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` if any diagnostic was reported.
    #[must_use]
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Manifest to persist after this run: the loaded manifest (or a new
    /// one) with every import emitted this run recorded.
    #[must_use]
    pub fn manifest_update(&self) -> ImportManifest {
        let mut manifest = self.manifest.clone().unwrap_or_default();
        manifest.merge(&self.emitted_imports);
        manifest
    }

    /// Claims the primary import slot of `server`.
    ///
    /// Returns `true` for the first caller of the run.
    pub(crate) fn claim_primary(&mut self, server: &ServerId) -> bool {
        self.primary_emitted.insert(server.clone())
    }

    pub(crate) fn mark_generated(&mut self, server: &ServerId) {
        self.generated.insert(server.clone());
    }

    /// Adds a rendered worker to the server's text, replacing an earlier
    /// skeleton of the same start routine instead of repeating it.
    pub(crate) fn append_worker(&mut self, server: &ServerId, code: &str, start_routine: &str) {
        let entry = self.outputs.entry(server.clone()).or_default();
        *entry = merge_worker(entry, code, start_routine);
    }

    pub(crate) fn record_import(&mut self, server: &ServerId, normalized: String) {
        self.emitted_imports
            .entry(server.clone())
            .or_default()
            .push(normalized);
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(kind = diagnostic.kind.as_str(), "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }
}
