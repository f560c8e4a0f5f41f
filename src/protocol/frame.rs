//! Packet framing
//!
//! Header layout and blocking stream helpers.
//!
//! ```text
//! ┌─────────────────┬─────────────────┐
//! │ Message type    │ Payload length  │
//! │ u32 LE          │ u32 LE          │
//! └─────────────────┴─────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::Bytes;

use crate::error::{Result, VkscError};

/// Header size in bytes: 4 byte type tag + 4 byte payload length
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size accepted from the wire (256 MB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 256 * 1024 * 1024;

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Type tag of the payload schema
    pub message_type: u32,
    /// Payload length in bytes
    pub payload_length: u32,
}

impl Header {
    pub fn new(message_type: u32, payload_length: u32) -> Self {
        Self {
            message_type,
            payload_length,
        }
    }

    /// Encode header to bytes
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.message_type.to_le_bytes());
        buf[4..8].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            message_type: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            payload_length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// One framed unit: header + payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Bytes,
}

impl Packet {
    /// Build a packet around a payload, filling in the length
    pub fn new(message_type: u32, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let payload_length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= DEFAULT_MAX_PAYLOAD_SIZE)
            .ok_or(VkscError::PayloadTooLarge {
                size: u32::try_from(payload.len()).unwrap_or(u32::MAX),
                max: DEFAULT_MAX_PAYLOAD_SIZE,
            })?;

        Ok(Self {
            header: Header::new(message_type, payload_length),
            payload,
        })
    }

    /// Type tag of this packet
    pub fn message_type(&self) -> u32 {
        self.header.message_type
    }

    /// Serialize header + payload into one buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        message.extend_from_slice(&self.header.encode());
        message.extend_from_slice(&self.payload);
        message
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete packet from a blocking stream.
///
/// End of stream, before or inside a packet, is `ConnectionLost`.
pub fn read_packet<R: Read>(reader: &mut R, max_payload_size: u32) -> Result<Packet> {
    let mut header = [0u8; HEADER_SIZE];
    read_exact_or_lost(reader, &mut header)?;

    let header = Header::decode(&header)
        .ok_or_else(|| VkscError::Protocol("Incomplete packet header".to_string()))?;

    if header.payload_length > max_payload_size {
        return Err(VkscError::PayloadTooLarge {
            size: header.payload_length,
            max: max_payload_size,
        });
    }

    let mut payload = vec![0u8; header.payload_length as usize];
    if !payload.is_empty() {
        read_exact_or_lost(reader, &mut payload)?;
    }

    Ok(Packet {
        header,
        payload: Bytes::from(payload),
    })
}

/// Write a packet to a stream and flush it
pub fn write_packet<W: Write>(writer: &mut W, packet: &Packet) -> Result<()> {
    writer.write_all(&packet.encode())?;
    writer.flush()?;
    Ok(())
}

fn read_exact_or_lost<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(VkscError::ConnectionLost),
        Err(e) => Err(e.into()),
    }
}
