//! Import deduplication across a run and across runs.
//!
//! Every import line a worker needs passes through [`ImportDeduplicator::check`]
//! before it is emitted. Two tiers apply:
//!
//! 1. **In-run**: the primary import of a server is emitted by the first
//!    caller only.
//! 2. **On-disk**: when the server's worker file exists and was marked
//!    initialized, an import already present in it is suppressed. A loaded
//!    [`ImportManifest`](crate::ImportManifest) covering the server answers
//!    instead of the file.
//!
//! # Examples
//!
//! ```
//! use distributor_codegen::{ImportDecision, ImportDeduplicator, ImportKind, RunContext};
//! use distributor_core::{GeneratorConfig, ServerId};
//!
//! let config = GeneratorConfig::default();
//! let dedup = ImportDeduplicator::new(&config);
//! let mut ctx = RunContext::new();
//! let server = ServerId::new("S1");
//! let line = "import * as shared from \"../src-gen/functions.js\";";
//!
//! assert_eq!(dedup.check(ImportKind::Primary, &server, line, &mut ctx), ImportDecision::Emit);
//! assert_eq!(dedup.check(ImportKind::Primary, &server, line, &mut ctx), ImportDecision::Suppress);
//! ```

use crate::context::{Diagnostic, DiagnosticKind, RunContext};
use distributor_core::{GeneratorConfig, ReadFailurePolicy, ServerId};
use std::fs;

/// Role of an import line in a worker module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// Shared function namespace, one per server per run.
    Primary,
    /// Broker client module.
    Runtime,
    /// Implementation of one queue-transport function.
    Function,
}

/// Outcome of a deduplication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportDecision {
    /// Write the import.
    Emit,
    /// The import is already present; skip it.
    Suppress,
}

impl ImportDecision {
    /// Returns `true` for [`ImportDecision::Emit`].
    #[must_use]
    pub const fn is_emit(self) -> bool {
        matches!(self, Self::Emit)
    }
}

/// What prior output says about a candidate import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingOutput {
    /// The worker path was not marked initialized; prior output is ignored.
    NotInitialized,
    /// The worker file does not exist.
    Missing,
    /// The import is already there.
    Present,
    /// The file (or manifest) was consulted and the import is not there.
    Absent,
    /// The file exists but could not be read.
    Unreadable {
        /// Error message of the failed read
        reason: String,
    },
}

/// Decides whether candidate import lines must be emitted.
#[derive(Debug, Clone, Copy)]
pub struct ImportDeduplicator<'c> {
    config: &'c GeneratorConfig,
}

impl<'c> ImportDeduplicator<'c> {
    /// Creates a deduplicator resolving worker paths through `config`.
    #[must_use]
    pub const fn new(config: &'c GeneratorConfig) -> Self {
        Self { config }
    }

    /// Decides whether `candidate` must be emitted for `server`.
    ///
    /// Primary imports are claimed in `ctx` by the first caller; later
    /// callers for the same server are suppressed without touching disk.
    /// Read failures are reported as diagnostics and resolved by the
    /// configured [`ReadFailurePolicy`].
    pub fn check(
        &self,
        kind: ImportKind,
        server: &ServerId,
        candidate: &str,
        ctx: &mut RunContext,
    ) -> ImportDecision {
        if kind == ImportKind::Primary && !ctx.claim_primary(server) {
            tracing::debug!(server = %server, "primary import already emitted this run");
            return ImportDecision::Suppress;
        }

        let normalized = normalize_import(candidate);
        let decision = match self.existing_output(server, &normalized, ctx) {
            ExistingOutput::NotInitialized | ExistingOutput::Missing | ExistingOutput::Absent => {
                ImportDecision::Emit
            }
            ExistingOutput::Present => ImportDecision::Suppress,
            ExistingOutput::Unreadable { reason } => {
                let path = self.config.output_path(server);
                ctx.report(Diagnostic::new(
                    DiagnosticKind::UnreadableOutput,
                    format!(
                        "cannot read {} to deduplicate imports ({reason}); applying '{}' policy",
                        path.display(),
                        self.config.read_failure_policy
                    ),
                ));
                match self.config.read_failure_policy {
                    ReadFailurePolicy::Emit => ImportDecision::Emit,
                    ReadFailurePolicy::Suppress => ImportDecision::Suppress,
                }
            }
        };

        tracing::debug!(server = %server, import = %normalized, ?decision, "import checked");
        decision
    }

    /// Looks up `normalized` in the prior output of `server`.
    ///
    /// Prior output only counts when the worker path was marked initialized
    /// in `ctx` and the file exists.
    #[must_use]
    pub fn existing_output(
        &self,
        server: &ServerId,
        normalized: &str,
        ctx: &RunContext,
    ) -> ExistingOutput {
        let path = self.config.output_path(server);

        if !ctx.is_initialized(&path) {
            return ExistingOutput::NotInitialized;
        }

        if !path.exists() {
            return ExistingOutput::Missing;
        }

        if let Some(manifest) = ctx.manifest()
            && manifest.covers(server)
        {
            return if manifest.contains(server, normalized) {
                ExistingOutput::Present
            } else {
                ExistingOutput::Absent
            };
        }

        match fs::read_to_string(&path) {
            Ok(code) if contains_import(&code, normalized) => ExistingOutput::Present,
            Ok(_) => ExistingOutput::Absent,
            Err(e) => ExistingOutput::Unreadable {
                reason: e.to_string(),
            },
        }
    }
}

/// Normalizes an import statement for comparison and emission.
///
/// Whitespace runs collapse to one space, braces get one space inside and
/// outside, and no space is left before `,` or `;`.
///
/// # Examples
///
/// ```
/// use distributor_codegen::normalize_import;
///
/// assert_eq!(
///     normalize_import("import   {add}from \"./functions-S1.js\" ;"),
///     "import { add } from \"./functions-S1.js\";"
/// );
/// assert_eq!(normalize_import("import {a ,b} from 'm';"), "import { a, b } from 'm';");
/// ```
#[must_use]
pub fn normalize_import(statement: &str) -> String {
    let spaced = statement.replace('{', " { ").replace('}', " } ");
    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" ;", ";")
        .replace(" ,", ",")
}

/// Returns `true` if `code` already holds the normalized import.
///
/// Matches either a raw substring or any line that normalizes to the same
/// statement.
#[must_use]
pub fn contains_import(code: &str, normalized: &str) -> bool {
    code.contains(normalized) || code.lines().any(|line| normalize_import(line) == normalized)
}
