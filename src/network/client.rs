//! Blocking client
//!
//! Used by test runners to reach the server. Strictly one request in
//! flight: every call writes a request and, unless it is fire-and-forget,
//! waits for the matching response.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use crate::config::with_default_port;
use crate::error::{Result, VkscError};
use crate::protocol::{
    read_packet, write_packet, AppendRequest, CompileShaderRequest, CompileShaderResponse,
    CreateCacheRequest, CreateCacheResponse, GetContentRequest, GetContentResponse, LogRequest,
    Packet, PipelineCacheInput, Request, Response, Severity, ShaderSource, StoreContentRequest,
    DEFAULT_MAX_PAYLOAD_SIZE,
};

/// Connection to a vksc server
pub struct Client {
    stream: TcpStream,
    address: String,
}

impl Client {
    /// Connect to `host[:port]`; the port defaults to 59333
    pub fn connect(address: &str) -> Result<Self> {
        let address = with_default_port(address);
        let stream = TcpStream::connect(&address)?;
        stream.set_nodelay(true)?;

        tracing::debug!("Connected to {}", address);

        Ok(Self { stream, address })
    }

    /// Limit how long a single response may take
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Server address this client is connected to
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn compile_shader(
        &mut self,
        source: ShaderSource,
        command_line: &str,
    ) -> Result<CompileShaderResponse> {
        let request = Request::CompileShader(CompileShaderRequest {
            source,
            command_line: command_line.to_string(),
        });
        match self.call(request)? {
            Response::CompileShader(response) => Ok(response),
            other => Err(mismatch(&other)),
        }
    }

    /// Store `data` under `name`; returns the server's status
    pub fn store_content(&mut self, name: &str, data: &[u8]) -> Result<bool> {
        let request = Request::StoreContent(StoreContentRequest {
            name: name.to_string(),
            data: data.to_vec(),
        });
        Ok(self.call(request)?.status())
    }

    pub fn get_content(&mut self, path: &str, remove_after: bool) -> Result<GetContentResponse> {
        let request = Request::GetContent(GetContentRequest {
            path: path.to_string(),
            remove_after,
        });
        match self.call(request)? {
            Response::GetContent(response) => Ok(response),
            other => Err(mismatch(&other)),
        }
    }

    /// Append to a server-side entry (no response)
    pub fn append(&mut self, file_name: &str, data: &[u8], clear: bool) -> Result<()> {
        self.send(&Request::Append(AppendRequest {
            file_name: file_name.to_string(),
            data: data.to_vec(),
            clear,
        }))
    }

    /// Print a message on the server (no response)
    pub fn log(&mut self, severity: Severity, message: &str) -> Result<()> {
        self.send(&Request::Log(LogRequest {
            severity,
            message: message.to_string(),
        }))
    }

    pub fn create_cache(
        &mut self,
        input: PipelineCacheInput,
        case_fraction: i32,
    ) -> Result<CreateCacheResponse> {
        let request = Request::CreateCache(CreateCacheRequest {
            input,
            case_fraction,
        });
        match self.call(request)? {
            Response::CreateCache(response) => Ok(response),
            other => Err(mismatch(&other)),
        }
    }

    /// Send a request and wait for its response
    pub fn call(&mut self, request: Request) -> Result<Response> {
        let expected = request.response_type().ok_or_else(|| {
            VkscError::Protocol(format!(
                "{:?} has no response",
                request.message_type()
            ))
        })?;

        self.send(&request)?;
        let packet = read_packet(&mut self.stream, DEFAULT_MAX_PAYLOAD_SIZE).map_err(lost)?;
        Response::from_packet(&packet, expected)
    }

    /// Send a request without waiting
    pub fn send(&mut self, request: &Request) -> Result<()> {
        let packet = request.to_packet()?;
        self.send_packet(&packet)
    }

    /// Send an arbitrary packet
    pub fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        write_packet(&mut self.stream, packet).map_err(lost)
    }
}

/// Map a dropped socket onto `ConnectionLost`
fn lost(err: VkscError) -> VkscError {
    match err {
        VkscError::Io(ref e)
            if matches!(
                e.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) =>
        {
            VkscError::ConnectionLost
        }
        other => other,
    }
}

fn mismatch(response: &Response) -> VkscError {
    VkscError::Protocol(format!(
        "unexpected response {:?}",
        response.message_type()
    ))
}
