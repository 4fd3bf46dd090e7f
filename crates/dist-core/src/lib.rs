//! Core types, configuration, and errors for the distributor generator.
//!
//! This crate provides the foundational types shared by the code generator
//! and the command-line front-end.
//!
//! # Architecture
//!
//! The core consists of:
//! - Strong identifiers (`ServerId`, `FunctionName`)
//! - The declaration model (functions, servers, transport tags) with a
//!   prebuilt name index
//! - Generator configuration with a builder
//! - Error hierarchy with contextual information
//! - CLI value types (`OutputFormat`, `ExitCode`)

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod config;
mod error;
mod model;
mod types;

pub mod cli;

pub use config::{GeneratorConfig, GeneratorConfigBuilder, ReadFailurePolicy};
pub use error::{Error, Result};
pub use model::{DeclarationFile, DeclarationModel, Function, Parameter, QueueTransport, Server, Transport};
pub use types::{FunctionName, ServerId, is_js_identifier, js_identifier_suffix};
