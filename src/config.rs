//! Configuration for vksc-server
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::protocol::MAX_CONTENT_SIZE;

/// Default TCP port of the server
pub const DEFAULT_PORT: u16 = 59333;

/// Main configuration for a server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read (idle) timeout in milliseconds, 0 disables it
    pub read_timeout_ms: u64,

    /// Connection write timeout in milliseconds, 0 disables it
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Content Store Configuration
    // -------------------------------------------------------------------------
    /// Root directory for file-backed content entries.
    /// Names starting with `@` never touch the disk.
    pub content_root: PathBuf,

    /// Largest size a single entry may reach through store or append
    pub max_content_size: usize,

    /// File that receives client log messages (in addition to stdout)
    pub log_file: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // External Tools
    // -------------------------------------------------------------------------
    /// GLSL to SPIR-V compiler executable
    pub glsl_compiler: PathBuf,

    /// SPIR-V assembler executable
    pub spirv_assembler: PathBuf,

    /// Offline pipeline compiler settings, handed to every session
    pub pipeline: PipelineCompilerParams,
}

/// Settings for the offline pipeline cache compiler.
///
/// Captured once at startup and cloned into every client session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineCompilerParams {
    /// Path to the compiler executable. Empty means no offline compiler.
    pub compiler_path: PathBuf,

    /// Directory where pipeline descriptions are exported
    pub data_dir: PathBuf,

    /// File the compiler writes the pipeline cache into
    pub output_file: PathBuf,

    /// Optional compiler log file
    pub log_file: Option<PathBuf>,

    /// Extra arguments appended verbatim (whitespace separated)
    pub args: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            max_connections: 256,
            read_timeout_ms: 10 * 60 * 1000,
            write_timeout_ms: 60 * 1000,
            content_root: PathBuf::from("./vksc_content"),
            max_content_size: MAX_CONTENT_SIZE,
            log_file: None,
            glsl_compiler: PathBuf::from("glslangValidator"),
            spirv_assembler: PathBuf::from("spirv-as"),
            pipeline: PipelineCompilerParams::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Listen on all interfaces at the given port
    pub fn port(mut self, port: u16) -> Self {
        self.config.listen_addr = format!("0.0.0.0:{}", port);
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the content root directory
    pub fn content_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.content_root = path.into();
        self
    }

    /// Set the per-entry size limit (capped at what a response can carry)
    pub fn max_content_size(mut self, bytes: usize) -> Self {
        self.config.max_content_size = bytes.min(MAX_CONTENT_SIZE);
        self
    }

    /// Set the client log file
    pub fn log_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.log_file = path;
        self
    }

    /// Set the GLSL compiler executable
    pub fn glsl_compiler(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.glsl_compiler = path.into();
        self
    }

    /// Set the SPIR-V assembler executable
    pub fn spirv_assembler(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.spirv_assembler = path.into();
        self
    }

    /// Set the offline pipeline compiler parameters
    pub fn pipeline(mut self, params: PipelineCompilerParams) -> Self {
        self.config.pipeline = params;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Normalize a `host[:port]` string, filling in the default port.
///
/// `"localhost"` becomes `"localhost:59333"`, `"10.0.0.2:4000"` is kept.
/// IPv6 hosts take a port only in brackets: `"[::1]:4000"` is kept, while
/// `"::1"` and `"[::1]"` become `"[::1]:59333"`.
pub fn with_default_port(address: &str) -> String {
    if let Some(rest) = address.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, "")) => format!("{}:{}", address, DEFAULT_PORT),
            _ => address.to_string(),
        };
    }

    match address.rsplit_once(':') {
        Some((host, _)) if host.contains(':') => format!("[{}]:{}", address, DEFAULT_PORT),
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            address.to_string()
        }
        _ => format!("{}:{}", address, DEFAULT_PORT),
    }
}
