//! Worker Tests
//!
//! These tests drive the shader compiler and the pipeline cache builder
//! against stand-in tools written as shell scripts.

#[path = "../common/mod.rs"]
mod common;

mod compiler_tests;
