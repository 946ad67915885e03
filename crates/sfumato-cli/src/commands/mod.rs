//! CLI command implementations.

pub mod common;
pub mod config;
pub mod schedule;
pub mod simulate;
pub mod tiles;
