//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.
//!
//! ## Lifecycle
//! - `bind` opens the listener (port 0 picks a free port)
//! - `run` accepts until `ShutdownHandle::shutdown` is called or accept
//!   fails fatally
//! - handler threads report completion over a channel and are joined on
//!   the next accept-loop pass
//! - on shutdown every live socket is closed and every handler joined

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use super::Connection;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::services::{Services, Session};

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cloneable handle that stops a running server
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the server to stop; `run` returns after closing all clients
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A live handler thread
struct ClientSlot {
    /// Second handle on the client socket, used to close it on shutdown
    stream: TcpStream,
    handle: JoinHandle<()>,
}

/// TCP server for vksc-server
pub struct Server {
    config: ServerConfig,
    services: Arc<Services>,
    listener: TcpListener,
    shutdown: ShutdownHandle,

    /// Live handlers by client id
    clients: HashMap<u64, ClientSlot>,
    next_client_id: u64,

    /// Handler threads send their id here when they finish
    finished_tx: Sender<u64>,
    finished_rx: Receiver<u64>,
}

impl Server {
    /// Bind the listener described by `config`
    pub fn bind(config: ServerConfig, services: Arc<Services>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        let (finished_tx, finished_rx) = channel::unbounded();

        Ok(Self {
            config,
            services,
            listener,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
            clients: HashMap::new(),
            next_client_id: 1,
            finished_tx,
            finished_rx,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of handlers not yet reaped
    pub fn active_connections(&self) -> usize {
        self.clients.len()
    }

    /// Start the server (blocking)
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.is_shutdown() {
            self.reap_finished();

            match self.listener.accept() {
                Ok((stream, addr)) => self.spawn_client(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Live handlers keep serving their clients
                    tracing::error!("Accept failed, stopping listener: {}", e);
                    return Err(e.into());
                }
            }
        }

        tracing::info!(
            "Shutting down, closing {} connections",
            self.active_connections()
        );
        self.close_all();
        Ok(())
    }

    fn spawn_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        if self.active_connections() >= self.config.max_connections {
            tracing::warn!(
                "Refusing {}: {} connections already open",
                addr,
                self.active_connections()
            );
            let _ = stream.shutdown(Shutdown::Both);
            return;
        }

        let id = self.next_client_id;
        self.next_client_id += 1;

        let control = match Self::prepare_stream(&stream) {
            Ok(control) => control,
            Err(e) => {
                tracing::warn!("Cannot set up connection from {}: {}", addr, e);
                return;
            }
        };

        let session = Session::new(id, addr.to_string(), self.config.pipeline.clone());
        let services = Arc::clone(&self.services);
        let finished_tx = self.finished_tx.clone();
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;

        let spawned = thread::Builder::new()
            .name(format!("vksc-client-{}", id))
            .spawn(move || {
                let span = tracing::info_span!("client", id, peer = %session.peer_addr);
                let _entered = span.enter();

                let result = Connection::new(stream, services, session).and_then(|mut connection| {
                    connection.set_timeouts(read_timeout_ms, write_timeout_ms)?;
                    connection.handle()
                });
                if let Err(e) = result {
                    tracing::warn!("Client {} terminated: {}", id, e);
                }
                let _ = finished_tx.send(id);
            });

        match spawned {
            Ok(handle) => {
                self.clients.insert(
                    id,
                    ClientSlot {
                        stream: control,
                        handle,
                    },
                );
            }
            Err(e) => {
                tracing::error!("Cannot spawn handler for {}: {}", addr, e);
                let _ = control.shutdown(Shutdown::Both);
            }
        }
    }

    /// Switch the accepted socket to blocking mode and clone a control handle
    fn prepare_stream(stream: &TcpStream) -> std::io::Result<TcpStream> {
        // Some platforms let accepted sockets inherit the listener's non-blocking flag
        stream.set_nonblocking(false)?;
        stream.try_clone()
    }

    /// Join handlers that announced completion
    fn reap_finished(&mut self) {
        while let Ok(id) = self.finished_rx.try_recv() {
            if let Some(slot) = self.clients.remove(&id) {
                let _ = slot.handle.join();
                tracing::trace!("Reaped client {}", id);
            }
        }
    }

    /// Close every live socket and wait for the handlers
    fn close_all(&mut self) {
        for slot in self.clients.values() {
            let _ = slot.stream.shutdown(Shutdown::Both);
        }
        for (id, slot) in self.clients.drain() {
            if slot.handle.join().is_err() {
                tracing::warn!("Client {} handler panicked", id);
            }
        }
        while self.finished_rx.try_recv().is_ok() {}
    }
}
