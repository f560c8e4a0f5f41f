//! # vksc-server
//!
//! Offline compilation and pipeline cache server for Vulkan SC test runs:
//! - Length-prefixed binary protocol over TCP
//! - Shared content store (in memory and on disk)
//! - Shader compilation and pipeline cache builds through external tools
//! - One thread per client connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │          Connection: FrameBuffer → Request decode            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Services                                │
//! └──────────┬──────────────────┬─────────────────┬─────────────┘
//!            │                  │                 │
//!            ▼                  ▼                 ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ ContentStore │   │ShaderCompiler│   │ Cache builder│
//!   │   (Mutex)    │   │ (subprocess) │   │ (subprocess) │
//!   └──────────────┘   └──────────────┘   └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod network;
pub mod protocol;
pub mod services;
pub mod store;
pub mod worker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{PipelineCompilerParams, ServerConfig, DEFAULT_PORT};
pub use error::{Result, VkscError};
pub use network::{Client, Server, ShutdownHandle};
pub use services::{Services, Session};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vksc-server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
