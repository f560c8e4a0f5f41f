//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ## States
//! ```text
//!   CONNECTED ──► RECEIVING ⇄ DISPATCHING ──► DISCONNECTED
//! ```
//! Every complete packet in the buffer is dispatched, and its response
//! written, before the next socket read.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, VkscError};
use crate::protocol::{write_packet, FrameBuffer, Packet, Request};
use crate::services::{Services, Session};

/// Size of a single socket read
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream, used for both directions
    stream: TcpStream,

    /// Bytes received but not yet forming a complete packet
    frames: FrameBuffer,

    /// Reference to the request services
    services: Arc<Services>,

    /// Client id, peer and per-client tool settings
    session: Session,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, services: Arc<Services>, session: Session) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            frames: FrameBuffer::new(),
            services,
            session,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.stream
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.stream
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok` when the client goes away or idles out, and `Err` on
    /// protocol violations and other I/O failures.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(
            "Client {} connected from {}",
            self.session.id,
            self.session.peer_addr
        );

        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let read = match self.stream.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.session.id);
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} connection closed: {}", self.session.id, e);
                    return Ok(());
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    // Unix reports an expired read timeout as WouldBlock, Windows as TimedOut
                    tracing::debug!("Client {} idle timeout", self.session.id);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from client {}: {}", self.session.id, e);
                    return Err(e.into());
                }
            };

            let packets = self.frames.push(&chunk[..read])?;
            for packet in packets {
                let e = match self.dispatch(packet) {
                    Ok(()) => continue,
                    Err(e) => e,
                };

                if let VkscError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.session.id,
                            e
                        );
                        return Ok(());
                    }
                }
                if e.is_fatal() {
                    return Err(e);
                }
                tracing::warn!("Client {}: request failed: {}", self.session.id, e);
            }
        }
    }

    /// Decode one packet, execute it and send the response, if any
    fn dispatch(&mut self, packet: Packet) -> Result<()> {
        let request = Request::from_packet(&packet)?;

        tracing::trace!(
            "Client {}: {:?} ({} bytes)",
            self.session.id,
            request.message_type(),
            packet.payload.len()
        );

        if let Some(response) = self.services.execute(request, &self.session) {
            let packet = match response.to_packet() {
                Ok(packet) => packet,
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(
                        "Client {}: cannot encode {:?}, answering with failure: {}",
                        self.session.id,
                        response.message_type(),
                        e
                    );
                    response.failed().to_packet()?
                }
                Err(e) => return Err(e),
            };
            write_packet(&mut self.stream, &packet)?;
        }

        Ok(())
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}
