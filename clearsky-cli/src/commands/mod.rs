//! CLI subcommands.

pub mod common;
pub mod config;
pub mod metrics;
pub mod resolve;
pub mod revs;
pub mod run;
