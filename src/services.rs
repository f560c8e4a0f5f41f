//! Services Module
//!
//! Request dispatch: routes every decoded request to the content store or
//! the workers and turns the outcome into a response.
//!
//! ## Failure Policy
//! Handlers never fail. Any application error (bad name, compile error,
//! cache build error, disk error) is logged here and reported to the
//! client as `status: false`. Only transport and framing problems,
//! handled one layer up, can end a connection.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::{PipelineCompilerParams, ServerConfig};
use crate::error::Result;
use crate::protocol::{
    AppendRequest, CompileShaderRequest, CompileShaderResponse, CreateCacheRequest,
    CreateCacheResponse, GetContentRequest, GetContentResponse, LogRequest, Request, Response,
    StoreContentRequest, StoreContentResponse,
};
use crate::store::ContentStore;
use crate::worker::{build_pipeline_cache, ShaderCompiler};

/// Per-connection state handed to every request of that connection
#[derive(Debug, Clone)]
pub struct Session {
    /// Server-assigned client id
    pub id: u64,

    /// Peer address for logging
    pub peer_addr: String,

    /// Offline compiler settings used for this client's cache requests
    pub pipeline: PipelineCompilerParams,
}

impl Session {
    pub fn new(id: u64, peer_addr: impl Into<String>, pipeline: PipelineCompilerParams) -> Self {
        Self {
            id,
            peer_addr: peer_addr.into(),
            pipeline,
        }
    }
}

/// Sink for client `LogRequest` messages.
///
/// Lines go to stdout and, if configured, to a log file. The mutex keeps
/// lines from different connections whole.
pub struct ClientLog {
    file: Mutex<Option<File>>,
}

impl ClientLog {
    /// Log to stdout only
    pub fn stdout() -> Self {
        Self {
            file: Mutex::new(None),
        }
    }

    /// Log to stdout and append to `path`
    pub fn with_file(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(Some(file)),
        })
    }

    pub fn write(&self, session: &Session, request: &LogRequest) {
        let line = format!(
            "[client {} {}] {}: {}",
            session.id, session.peer_addr, request.severity, request.message
        );
        let mut file = self.file.lock();

        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();

        if let Some(file) = file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line) {
                tracing::warn!("Failed to write client log: {}", e);
            }
        }
    }
}

/// Everything a connection can ask the server to do
pub struct Services {
    /// Shared blob storage
    store: ContentStore,

    /// Shader compiler front end
    compiler: ShaderCompiler,

    /// Client log sink
    client_log: ClientLog,

    /// Serializes cache builds: they share the export directory
    cache_lock: Mutex<()>,
}

impl Services {
    pub fn new(store: ContentStore, compiler: ShaderCompiler, client_log: ClientLog) -> Self {
        Self {
            store,
            compiler,
            client_log,
            cache_lock: Mutex::new(()),
        }
    }

    /// Build services from the server configuration
    pub fn open(config: &ServerConfig) -> Result<Self> {
        let store =
            ContentStore::with_max_entry_size(&config.content_root, config.max_content_size)?;
        let compiler = ShaderCompiler::new(&config.glsl_compiler, &config.spirv_assembler);
        let client_log = match &config.log_file {
            Some(path) => ClientLog::with_file(path)?,
            None => ClientLog::stdout(),
        };
        Ok(Self::new(store, compiler, client_log))
    }

    /// Execute a request
    ///
    /// Returns `None` for fire-and-forget requests.
    pub fn execute(&self, request: Request, session: &Session) -> Option<Response> {
        match request {
            Request::CompileShader(req) => {
                Some(Response::CompileShader(self.compile_shader(&req, session)))
            }
            Request::StoreContent(req) => {
                Some(Response::StoreContent(self.store_content(&req, session)))
            }
            Request::GetContent(req) => Some(Response::GetContent(self.get_content(&req, session))),
            Request::CreateCache(req) => Some(Response::CreateCache(self.create_cache(&req, session))),
            Request::Append(req) => {
                self.append(&req, session);
                None
            }
            Request::Log(req) => {
                self.client_log.write(session, &req);
                None
            }
        }
    }

    pub fn compile_shader(
        &self,
        request: &CompileShaderRequest,
        session: &Session,
    ) -> CompileShaderResponse {
        match self.compiler.compile(&request.source, &request.command_line) {
            Ok(binary) => CompileShaderResponse {
                status: true,
                binary,
            },
            Err(e) => {
                tracing::warn!(
                    "Client {} ({}): {} shader compilation failed: {}",
                    session.id,
                    session.peer_addr,
                    request.source.kind(),
                    e
                );
                CompileShaderResponse::default()
            }
        }
    }

    pub fn store_content(
        &self,
        request: &StoreContentRequest,
        session: &Session,
    ) -> StoreContentResponse {
        match self.store.store(&request.name, &request.data) {
            Ok(()) => StoreContentResponse { status: true },
            Err(e) => {
                tracing::warn!(
                    "Client {} ({}): store {:?} failed: {}",
                    session.id,
                    session.peer_addr,
                    request.name,
                    e
                );
                StoreContentResponse { status: false }
            }
        }
    }

    pub fn get_content(&self, request: &GetContentRequest, session: &Session) -> GetContentResponse {
        match self.store.get(&request.path, request.remove_after) {
            Ok(Some(data)) => GetContentResponse { status: true, data },
            Ok(None) => GetContentResponse::default(),
            Err(e) => {
                tracing::warn!(
                    "Client {} ({}): get {:?} failed: {}",
                    session.id,
                    session.peer_addr,
                    request.path,
                    e
                );
                GetContentResponse::default()
            }
        }
    }

    /// Append has no response; failures only reach the server log
    pub fn append(&self, request: &AppendRequest, session: &Session) -> bool {
        match self
            .store
            .append(&request.file_name, &request.data, request.clear)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Client {} ({}): append to {:?} failed: {}",
                    session.id,
                    session.peer_addr,
                    request.file_name,
                    e
                );
                false
            }
        }
    }

    pub fn create_cache(&self, request: &CreateCacheRequest, session: &Session) -> CreateCacheResponse {
        let _guard = self.cache_lock.lock();

        match build_pipeline_cache(&request.input, request.case_fraction, &session.pipeline) {
            Ok(binary) => CreateCacheResponse {
                status: true,
                binary,
            },
            Err(e) => {
                tracing::error!(
                    "Client {} ({}): pipeline cache build failed (fraction {}): {}",
                    session.id,
                    session.peer_addr,
                    request.case_fraction,
                    e
                );
                CreateCacheResponse::default()
            }
        }
    }

    /// Get the content store
    pub fn store(&self) -> &ContentStore {
        &self.store
    }
}
