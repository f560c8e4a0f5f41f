//! vksc-client CLI
//!
//! Command-line driver for a running vksc-server.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use vksc_server::protocol::{
    PipelineCacheInput, PipelineDescription, PipelineKind, Severity, ShaderSource, ShaderStage,
};
use vksc_server::{Client, Result, VkscError};

/// vksc-client
#[derive(Parser, Debug)]
#[command(name = "vksc-client")]
#[command(about = "CLI for the vksc offline compilation server")]
#[command(version)]
struct Args {
    /// Server address (host[:port])
    #[arg(short, long, default_value = "localhost:59333")]
    address: String,

    /// Give up on a response after this long (0 = wait forever)
    #[arg(long, default_value = "0")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store content under a name
    Store {
        name: String,
        #[command(flatten)]
        data: DataArgs,
    },

    /// Fetch content by name
    Get {
        name: String,

        /// Delete the entry after reading it
        #[arg(long)]
        remove: bool,

        /// Write the content here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Append content to a name
    Append {
        name: String,
        #[command(flatten)]
        data: DataArgs,

        /// Empty the entry first
        #[arg(long)]
        clear: bool,
    },

    /// Print a message on the server
    Log {
        message: String,

        #[arg(long, value_enum, default_value = "info")]
        severity: LogSeverity,
    },

    /// Compile a shader (.spvasm, .spv or GLSL by stage)
    Compile {
        file: PathBuf,

        /// GLSL stage, defaults to the file extension
        #[arg(long)]
        stage: Option<String>,

        /// Extra compiler arguments
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        args: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Build a pipeline cache from pipeline JSON files
    CreateCache {
        /// Pipeline JSON file, repeatable; names containing "compute" are compute pipelines
        #[arg(long = "pipeline", required = true)]
        pipelines: Vec<PathBuf>,

        /// Sub-case index, negative for a whole run
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        fraction: i32,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run the store/get round trip against the server
    Selftest,
}

#[derive(clap::Args, Debug)]
struct DataArgs {
    /// Literal text payload
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,

    /// Read the payload from a file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl DataArgs {
    fn load(&self) -> Result<Vec<u8>> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.as_bytes().to_vec()),
            (None, Some(path)) => Ok(fs::read(path)?),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogSeverity {
    Info,
    Warning,
    Error,
}

impl From<LogSeverity> for Severity {
    fn from(severity: LogSeverity) -> Self {
        match severity {
            LogSeverity::Info => Severity::Info,
            LogSeverity::Warning => Severity::Warning,
            LogSeverity::Error => Severity::Error,
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("fail");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns the request status
fn run(args: Args) -> Result<bool> {
    let mut client = Client::connect(&args.address)?;
    if args.timeout_ms > 0 {
        client.set_timeout(Some(Duration::from_millis(args.timeout_ms)))?;
    }

    match args.command {
        Commands::Store { name, data } => client.store_content(&name, &data.load()?),
        Commands::Get { name, remove, out } => {
            let response = client.get_content(&name, remove)?;
            if response.status {
                write_output(out.as_deref(), &response.data)?;
            }
            Ok(response.status)
        }
        Commands::Append { name, data, clear } => {
            client.append(&name, &data.load()?, clear)?;
            Ok(true)
        }
        Commands::Log { message, severity } => {
            client.log(severity.into(), &message)?;
            Ok(true)
        }
        Commands::Compile {
            file,
            stage,
            args,
            out,
        } => {
            let source = load_shader(&file, stage.as_deref())?;
            let response = client.compile_shader(source, &args)?;
            if response.status {
                write_output(out.as_deref(), &response.binary)?;
            }
            Ok(response.status)
        }
        Commands::CreateCache {
            pipelines,
            fraction,
            out,
        } => {
            let input = load_pipelines(&pipelines)?;
            let response = client.create_cache(input, fraction)?;
            if response.status {
                fs::write(&out, &response.binary)?;
            }
            Ok(response.status)
        }
        Commands::Selftest => selftest(&mut client),
    }
}

/// Overwrite, then read with removal, then read again
fn selftest(client: &mut Client) -> Result<bool> {
    const KEY: &str = "@test1";

    let steps = [
        ("store", client.store_content(KEY, &[1, 2, 3, 4])?),
        ("store existing", client.store_content(KEY, &[5, 6, 7, 8, 9])?),
    ];
    for (name, status) in steps {
        println!("{}: {}", name, if status { "ok" } else { "fail" });
        if !status {
            return Ok(false);
        }
    }

    let first = client.get_content(KEY, true)?;
    let first_ok = first.status && first.data == [5, 6, 7, 8, 9];
    println!("get and remove: {}", if first_ok { "ok" } else { "fail" });

    let second = client.get_content(KEY, false)?;
    let second_ok = !second.status && second.data.is_empty();
    println!("get removed: {}", if second_ok { "ok" } else { "fail" });

    Ok(first_ok && second_ok)
}

fn load_shader(file: &Path, stage: Option<&str>) -> Result<ShaderSource> {
    let extension = file
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    match extension.as_str() {
        "spv" => Ok(ShaderSource::Spirv {
            binary: fs::read(file)?,
        }),
        "spvasm" => Ok(ShaderSource::SpirvAssembly {
            source: fs::read_to_string(file)?,
        }),
        _ => {
            let stage_name = stage.unwrap_or(extension.as_str());
            let stage = ShaderStage::from_extension(stage_name).ok_or_else(|| {
                VkscError::Config(format!("unknown shader stage {:?}", stage_name))
            })?;
            Ok(ShaderSource::Glsl {
                stage,
                source: fs::read_to_string(file)?,
            })
        }
    }
}

fn load_pipelines(paths: &[PathBuf]) -> Result<PipelineCacheInput> {
    let mut pipelines = Vec::with_capacity(paths.len());
    for (index, path) in paths.iter().enumerate() {
        let kind = if path.to_string_lossy().contains("compute") {
            PipelineKind::Compute
        } else {
            PipelineKind::Graphics
        };

        let mut identifier = [0u8; 16];
        identifier[..8].copy_from_slice(&(index as u64).to_le_bytes());

        pipelines.push(PipelineDescription {
            identifier,
            kind,
            json: fs::read_to_string(path)?,
            shaders: Vec::new(),
            device_extensions: Vec::new(),
            max_count: 1,
            all_count: 1,
        });
    }
    Ok(PipelineCacheInput { pipelines })
}

fn write_output(out: Option<&Path>, data: &[u8]) -> Result<()> {
    match out {
        Some(path) => fs::write(path, data)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
