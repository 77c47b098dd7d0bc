//! Testing infrastructure for tooldex integration tests.
//!
//! This crate provides utilities for writing robust integration tests:
//! - `TestWorld`: Fluent interface for a fake home with platform roots
//! - `assertions`: Checks over scan results
//! - `fixtures`: Writers for skills, commands, hooks, MCP configs, plugins

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::TestWorld;
