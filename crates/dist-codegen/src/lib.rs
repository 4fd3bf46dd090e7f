//! Queue worker generation for distributed functions.
//!
//! Given a declaration model (functions, the server that hosts each, and
//! the transport each is invoked over), this crate emits one JavaScript
//! worker module per server that consumes the server's message queue and
//! dispatches incoming calls to the hosted functions.
//!
//! # Architecture
//!
//! - [`FunctionMap`]: functions grouped by owning server
//! - [`ImportDeduplicator`]: in-run and on-disk import deduplication
//! - [`WorkerEmitter`]: renders a worker through Handlebars
//! - [`WorkerAssembler`]: drives emission once per declaration site
//! - [`RunContext`]: session state shared by all of the above
//!
//! # Examples
//!
//! ```
//! use distributor_codegen::{RunContext, WorkerAssembler};
//! use distributor_core::{DeclarationModel, GeneratorConfig, ServerId};
//!
//! let model = DeclarationModel::from_json_str(r#"{
//!     "functions": [
//!         {"name": "add", "server": "S1", "method": "RABBIT", "parameters": ["a", "b"]}
//!     ],
//!     "servers": [
//!         {"id": "S1", "rabbitmq": {"queue": "jobs"}}
//!     ]
//! }"#).unwrap();
//!
//! let assembler = WorkerAssembler::new(&model, GeneratorConfig::default()).unwrap();
//! let mut ctx = RunContext::new();
//! assembler.generate(["add"], &mut ctx);
//!
//! let code = ctx.output(&ServerId::new("S1")).unwrap();
//! assert!(code.contains("async function waitForCallS1()"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod assembler;
mod context;
mod dedup;
mod grouper;
mod manifest;
mod worker;

pub mod template_engine;

pub use assembler::{DeclarationSite, PassSummary, SiteOutcome, WorkerAssembler};
pub use context::{Diagnostic, DiagnosticKind, RunContext};
pub use dedup::{
    ExistingOutput, ImportDecision, ImportDeduplicator, ImportKind, contains_import,
    normalize_import,
};
pub use grouper::FunctionMap;
pub use manifest::{ImportManifest, MANIFEST_FILE_NAME, MANIFEST_VERSION};
pub use worker::{
    HandlerContext, WorkerContext, WorkerEmitter, merge_worker, start_routine_name,
};
