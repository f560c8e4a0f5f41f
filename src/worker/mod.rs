//! Worker Module
//!
//! Shells out to the external tools that do the actual compilation.
//!
//! ## Tools
//! - GLSL compiler (`glslangValidator`) and SPIR-V assembler (`spirv-as`)
//!   for `CompileShaderRequest`
//! - offline pipeline compiler for `CreateCacheRequest`
//!
//! Every job runs synchronously on the calling connection's thread, so a
//! slow compile only blocks the client that asked for it.

mod cache;
mod compiler;
mod process;

pub use cache::{build_pipeline_cache, export_pipelines, file_prefix};
pub use compiler::{validate_spirv, ShaderCompiler};
pub use process::{run_tool, split_args, ProcessOutput};
