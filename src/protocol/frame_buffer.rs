//! Frame buffer for accumulating partial reads.
//!
//! Socket reads arrive in arbitrary chunks. The buffer keeps every byte
//! that does not yet form a complete packet and hands out complete
//! packets in arrival order:
//! - `WaitingForHeader`: fewer than 8 bytes buffered
//! - `WaitingForPayload`: header parsed, payload still incomplete

use bytes::BytesMut;

use super::frame::{Header, Packet, DEFAULT_MAX_PAYLOAD_SIZE, HEADER_SIZE};
use crate::error::{Result, VkscError};

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    WaitingForPayload { header: Header },
}

/// Buffer for accumulating incoming bytes and extracting complete packets.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads
    buffer: BytesMut,
    /// Current parsing state
    state: State,
    /// Maximum allowed payload size
    max_payload_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default settings.
    ///
    /// Default capacity: 64KB, max payload: 256MB.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new frame buffer with custom max payload size.
    pub fn with_max_payload(max_payload_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_payload_size,
        }
    }

    /// Push data into the buffer and extract all complete packets.
    ///
    /// Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if a header announces more than
    /// `max_payload_size` bytes. The stream is unusable after that.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Packet>> {
        self.buffer.extend_from_slice(data);

        let mut packets = Vec::new();
        while let Some(packet) = self.try_extract()? {
            packets.push(packet);
        }

        Ok(packets)
    }

    /// Try to extract a single packet from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(packet))` if a complete packet was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` on an oversized length field
    pub fn try_extract(&mut self) -> Result<Option<Packet>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let header = match Header::decode(&self.buffer) {
                        Some(header) => header,
                        None => return Ok(None),
                    };

                    if header.payload_length > self.max_payload_size {
                        return Err(VkscError::PayloadTooLarge {
                            size: header.payload_length,
                            max: self.max_payload_size,
                        });
                    }

                    let _ = self.buffer.split_to(HEADER_SIZE);
                    self.state = State::WaitingForPayload { header };
                }

                State::WaitingForPayload { header } => {
                    let needed = header.payload_length as usize;
                    if self.buffer.len() < needed {
                        // Reserve up front so large payloads grow the buffer once
                        self.buffer.reserve(needed - self.buffer.len());
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(needed).freeze();
                    self.state = State::WaitingForHeader;

                    return Ok(Some(Packet { header, payload }));
                }
            }
        }
    }

    /// Number of buffered bytes not yet handed out (excluding a parsed header).
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer holds no pending bytes and no parsed header.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && matches!(self.state, State::WaitingForHeader)
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
