//! CLI subcommand implementations.

pub mod common;
pub mod delete;
pub mod seed;
pub mod stats;
