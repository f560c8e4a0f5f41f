//! vksc-server Binary
//!
//! Starts the TCP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};
use vksc_server::network::{Server, ShutdownHandle};
use vksc_server::{PipelineCompilerParams, ServerConfig, Services, DEFAULT_PORT};

/// vksc-server
#[derive(Parser, Debug)]
#[command(name = "vksc-server")]
#[command(about = "Offline shader compilation and pipeline cache server")]
#[command(version)]
struct Args {
    /// TCP port, bound on all interfaces
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// File that receives client log messages
    #[arg(long)]
    log: Option<PathBuf>,

    /// Offline pipeline compiler executable
    #[arg(long, default_value = "")]
    pipeline_compiler: PathBuf,

    /// Directory pipelines are exported to for the offline compiler
    #[arg(long, default_value = "")]
    pipeline_dir: PathBuf,

    /// Pipeline cache file written by the offline compiler
    #[arg(long, default_value = "")]
    pipeline_file: PathBuf,

    /// Offline compiler log file
    #[arg(long)]
    pipeline_log: Option<PathBuf>,

    /// Extra arguments for the offline compiler
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pipeline_args: String,

    /// Root directory for file-backed content
    #[arg(long, default_value = "./vksc_content")]
    content_dir: PathBuf,

    /// Largest content entry in bytes (capped at what one response can carry)
    #[arg(long)]
    max_content_size: Option<usize>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "256")]
    max_connections: usize,

    /// Close connections idle for this long (0 = never)
    #[arg(long, default_value = "600000")]
    idle_timeout_ms: u64,

    /// Write timeout per response (0 = none)
    #[arg(long, default_value = "60000")]
    write_timeout_ms: u64,

    /// GLSL to SPIR-V compiler
    #[arg(long, default_value = "glslangValidator")]
    glsl_compiler: PathBuf,

    /// SPIR-V assembler
    #[arg(long, default_value = "spirv-as")]
    spirv_assembler: PathBuf,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vksc_server=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("vksc-server v{}", vksc_server::VERSION);
    tracing::info!("Content directory: {}", args.content_dir.display());
    if !args.pipeline_compiler.as_os_str().is_empty() {
        tracing::info!("Pipeline compiler: {}", args.pipeline_compiler.display());
    }

    let pipeline = PipelineCompilerParams {
        compiler_path: args.pipeline_compiler,
        data_dir: args.pipeline_dir,
        output_file: args.pipeline_file,
        log_file: args.pipeline_log,
        args: args.pipeline_args,
    };

    // Build config from args
    let config = ServerConfig::builder()
        .port(args.port)
        .content_root(&args.content_dir)
        .log_file(args.log)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.idle_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .glsl_compiler(args.glsl_compiler)
        .spirv_assembler(args.spirv_assembler)
        .pipeline(pipeline);
    let config = match args.max_content_size {
        Some(bytes) => config.max_content_size(bytes),
        None => config,
    }
    .build();

    let services = match Services::open(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to initialize services: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = match Server::bind(config, services) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind port {}: {}", args.port, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = install_signal_handler(server.shutdown_handle()) {
        tracing::warn!("Cannot install signal handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Turn SIGINT/SIGTERM into a graceful shutdown; a second signal exits at once
fn install_signal_handler(shutdown: ShutdownHandle) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::spawn(move || {
        for sig in signals.forever() {
            if shutdown.is_shutdown() {
                tracing::warn!("Received signal {} during shutdown, exiting", sig);
                std::process::exit(128 + sig);
            }
            tracing::info!("Received signal {}, initiating shutdown...", sig);
            shutdown.shutdown();
        }
    });

    Ok(())
}
