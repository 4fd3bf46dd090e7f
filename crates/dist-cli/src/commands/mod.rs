//! Command implementations for the distributor CLI.
//!
//! Each command module parses its arguments, runs the operation, and
//! formats output according to the requested format.

pub mod common;
pub mod completions;
pub mod generate;
pub mod plan;
