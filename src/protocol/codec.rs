//! Payload codec
//!
//! Symmetric binary encoding of message bodies.
//!
//! ## Encoding Rules
//! - integers: fixed width, little-endian
//! - `bool`: one byte, 0 or 1
//! - strings and byte vectors: `u64` length prefix + contents
//! - enums: `u32` variant index + fields
//! - structs: fields in declaration order
//!
//! Decoding never reads past the buffer: a short buffer, a length prefix
//! pointing outside it, or leftover trailing bytes are all `Decode` errors.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::frame::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::error::{Result, VkscError};

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(DEFAULT_MAX_PAYLOAD_SIZE as u64)
        .reject_trailing_bytes()
}

/// Encode a value into a payload buffer
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| VkscError::Encode(e.to_string()))
}

/// Decode a value from a payload buffer
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}
