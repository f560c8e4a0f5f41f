//! Protocol Module
//!
//! Defines the wire protocol between test runners and the server.
//!
//! ## Packet Format
//!
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (4) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Both header fields are little-endian `u32`. The payload is the
//! bincode body of the message named by the type tag.
//!
//! ### Type Tags
//! - 0: CompileShaderRequest    1: CompileShaderResponse
//! - 2: StoreContentRequest     3: StoreContentResponse
//! - 4: AppendRequest
//! - 5: GetContentRequest       6: GetContentResponse
//! - 7: CreateCacheRequest      8: CreateCacheResponse
//! - 9: LogRequest
//!
//! `AppendRequest` and `LogRequest` are fire-and-forget: the server sends
//! nothing back.

mod codec;
mod frame;
mod frame_buffer;
mod message;
mod types;

pub use codec::{decode, encode};
pub use frame::{read_packet, write_packet, Header, Packet, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
pub use frame_buffer::FrameBuffer;
pub use message::{
    AppendRequest, CompileShaderRequest, CompileShaderResponse, CreateCacheRequest,
    CreateCacheResponse, GetContentRequest, GetContentResponse, LogRequest, MessageType, Request,
    Response, StoreContentRequest, StoreContentResponse, MAX_CONTENT_SIZE,
};
pub use types::{
    PipelineCacheInput, PipelineDescription, PipelineKind, PipelineShader, Severity, ShaderSource,
    ShaderStage, SPIRV_MAGIC,
};
