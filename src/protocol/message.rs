//! Request/response catalog
//!
//! Every schema has a fixed type tag. Requests that expect an answer name
//! exactly one response schema.

use serde::{Deserialize, Serialize};

use super::codec::{decode, encode};
use super::frame::{Packet, DEFAULT_MAX_PAYLOAD_SIZE};
use super::types::{PipelineCacheInput, Severity, ShaderSource};
use crate::error::{Result, VkscError};

/// Largest content entry a `GetContentResponse` can carry: the payload
/// limit minus the status byte and the `u64` data length prefix
pub const MAX_CONTENT_SIZE: usize = DEFAULT_MAX_PAYLOAD_SIZE as usize - 1 - 8;

/// Wire type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    CompileShaderRequest = 0,
    CompileShaderResponse = 1,
    StoreContentRequest = 2,
    StoreContentResponse = 3,
    AppendRequest = 4,
    GetContentRequest = 5,
    GetContentResponse = 6,
    CreateCacheRequest = 7,
    CreateCacheResponse = 8,
    LogRequest = 9,
}

impl MessageType {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        let message_type = match tag {
            0 => MessageType::CompileShaderRequest,
            1 => MessageType::CompileShaderResponse,
            2 => MessageType::StoreContentRequest,
            3 => MessageType::StoreContentResponse,
            4 => MessageType::AppendRequest,
            5 => MessageType::GetContentRequest,
            6 => MessageType::GetContentResponse,
            7 => MessageType::CreateCacheRequest,
            8 => MessageType::CreateCacheResponse,
            9 => MessageType::LogRequest,
            _ => return None,
        };
        Some(message_type)
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileShaderRequest {
    pub source: ShaderSource,
    /// Extra compiler arguments, whitespace separated
    pub command_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContentRequest {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendRequest {
    pub file_name: String,
    pub data: Vec<u8>,
    /// Truncate before appending
    pub clear: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContentRequest {
    pub path: String,
    pub remove_after: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCacheRequest {
    pub input: PipelineCacheInput,
    /// Sub-case index for split runs, negative for a whole run
    pub case_fraction: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    pub severity: Severity,
    pub message: String,
}

// =============================================================================
// Response Bodies
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileShaderResponse {
    pub status: bool,
    pub binary: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContentResponse {
    pub status: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContentResponse {
    pub status: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCacheResponse {
    pub status: bool,
    pub binary: Vec<u8>,
}

// =============================================================================
// Request
// =============================================================================

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CompileShader(CompileShaderRequest),
    StoreContent(StoreContentRequest),
    Append(AppendRequest),
    GetContent(GetContentRequest),
    CreateCache(CreateCacheRequest),
    Log(LogRequest),
}

impl Request {
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::CompileShader(_) => MessageType::CompileShaderRequest,
            Request::StoreContent(_) => MessageType::StoreContentRequest,
            Request::Append(_) => MessageType::AppendRequest,
            Request::GetContent(_) => MessageType::GetContentRequest,
            Request::CreateCache(_) => MessageType::CreateCacheRequest,
            Request::Log(_) => MessageType::LogRequest,
        }
    }

    /// Schema of the answer, `None` for fire-and-forget requests
    pub fn response_type(&self) -> Option<MessageType> {
        match self {
            Request::CompileShader(_) => Some(MessageType::CompileShaderResponse),
            Request::StoreContent(_) => Some(MessageType::StoreContentResponse),
            Request::GetContent(_) => Some(MessageType::GetContentResponse),
            Request::CreateCache(_) => Some(MessageType::CreateCacheResponse),
            Request::Append(_) | Request::Log(_) => None,
        }
    }

    /// Encode into a framed packet
    pub fn to_packet(&self) -> Result<Packet> {
        let payload = match self {
            Request::CompileShader(body) => encode(body)?,
            Request::StoreContent(body) => encode(body)?,
            Request::Append(body) => encode(body)?,
            Request::GetContent(body) => encode(body)?,
            Request::CreateCache(body) => encode(body)?,
            Request::Log(body) => encode(body)?,
        };
        Packet::new(self.message_type().tag(), payload)
    }

    /// Decode a request packet.
    ///
    /// Any tag that is not a request schema is `UnknownRequestType`.
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        let tag = packet.message_type();
        let payload = &packet.payload[..];

        let request = match MessageType::from_tag(tag) {
            Some(MessageType::CompileShaderRequest) => Request::CompileShader(decode(payload)?),
            Some(MessageType::StoreContentRequest) => Request::StoreContent(decode(payload)?),
            Some(MessageType::AppendRequest) => Request::Append(decode(payload)?),
            Some(MessageType::GetContentRequest) => Request::GetContent(decode(payload)?),
            Some(MessageType::CreateCacheRequest) => Request::CreateCache(decode(payload)?),
            Some(MessageType::LogRequest) => Request::Log(decode(payload)?),
            _ => return Err(VkscError::UnknownRequestType(tag)),
        };

        Ok(request)
    }
}

// =============================================================================
// Response
// =============================================================================

/// A server answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    CompileShader(CompileShaderResponse),
    StoreContent(StoreContentResponse),
    GetContent(GetContentResponse),
    CreateCache(CreateCacheResponse),
}

impl Response {
    pub fn message_type(&self) -> MessageType {
        match self {
            Response::CompileShader(_) => MessageType::CompileShaderResponse,
            Response::StoreContent(_) => MessageType::StoreContentResponse,
            Response::GetContent(_) => MessageType::GetContentResponse,
            Response::CreateCache(_) => MessageType::CreateCacheResponse,
        }
    }

    /// Status flag carried by every response schema
    pub fn status(&self) -> bool {
        match self {
            Response::CompileShader(body) => body.status,
            Response::StoreContent(body) => body.status,
            Response::GetContent(body) => body.status,
            Response::CreateCache(body) => body.status,
        }
    }

    /// The same schema with `status: false` and no payload
    pub fn failed(&self) -> Response {
        match self {
            Response::CompileShader(_) => Response::CompileShader(CompileShaderResponse::default()),
            Response::StoreContent(_) => Response::StoreContent(StoreContentResponse::default()),
            Response::GetContent(_) => Response::GetContent(GetContentResponse::default()),
            Response::CreateCache(_) => Response::CreateCache(CreateCacheResponse::default()),
        }
    }

    /// Encode into a framed packet
    pub fn to_packet(&self) -> Result<Packet> {
        let payload = match self {
            Response::CompileShader(body) => encode(body)?,
            Response::StoreContent(body) => encode(body)?,
            Response::GetContent(body) => encode(body)?,
            Response::CreateCache(body) => encode(body)?,
        };
        Packet::new(self.message_type().tag(), payload)
    }

    /// Decode a packet that must carry the `expected` response schema.
    pub fn from_packet(packet: &Packet, expected: MessageType) -> Result<Self> {
        let tag = packet.message_type();
        if tag != expected.tag() {
            return Err(VkscError::UnexpectedResponse {
                expected: expected.tag(),
                actual: tag,
            });
        }

        let payload = &packet.payload[..];
        let response = match expected {
            MessageType::CompileShaderResponse => Response::CompileShader(decode(payload)?),
            MessageType::StoreContentResponse => Response::StoreContent(decode(payload)?),
            MessageType::GetContentResponse => Response::GetContent(decode(payload)?),
            MessageType::CreateCacheResponse => Response::CreateCache(decode(payload)?),
            other => {
                return Err(VkscError::Protocol(format!(
                    "{:?} is not a response schema",
                    other
                )))
            }
        };

        Ok(response)
    }
}
