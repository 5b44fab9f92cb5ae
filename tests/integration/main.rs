//! Integration tests for lifecycle-hooks
//!
//! These tests drive the public API end to end: registering lifecycles,
//! running them through the engine, late-bound variants and the CLI.


mod engine_tests;
mod hooks_tests;

// Re-export common utilities for use by test modules
pub use common::*;
