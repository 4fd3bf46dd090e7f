//! Distributor CLI library.
//!
//! Exposes the command implementations, the source scanner, and the output
//! formatters so they can be tested and reused outside the binary.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod commands;
pub mod formatters;
pub mod sites;
