//! TCP Endpoint
//!
//! Accepts connections on a background thread and multiplexes their request
//! frames into one FIFO queue for the serve loop.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{CacheError, Result};
use super::connection::{is_disconnect, Connection};
use super::{ClientId, Endpoint, Envelope};

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Book-keeping for one live connection
struct Peer {
    /// Write half, shared with in-flight `send` calls
    stream: Arc<TcpStream>,

    /// Requests queued for the serve loop and not yet answered
    pending: usize,

    /// False once the reader thread has seen EOF or a bad frame
    reading: bool,
}

/// Live connections keyed by client, shared by the acceptor, the reader
/// threads and the serve loop
///
/// A connection is closed only when its reader is done and every request it
/// forwarded has been answered, so a client that half-closes after writing
/// still gets its replies.
#[derive(Clone, Default)]
pub(crate) struct Peers {
    inner: Arc<Mutex<HashMap<ClientId, Peer>>>,
}

impl Peers {
    fn insert(&self, client: ClientId, stream: Arc<TcpStream>) {
        let peer = Peer {
            stream,
            pending: 0,
            reading: true,
        };
        self.inner.lock().insert(client, peer);
    }

    fn remove(&self, client: ClientId) {
        self.inner.lock().remove(&client);
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Count one request forwarded by `client`'s reader
    pub(crate) fn enqueue(&self, client: ClientId) {
        if let Some(peer) = self.inner.lock().get_mut(&client) {
            peer.pending += 1;
        }
    }

    /// Reader for `client` exited; close now unless replies are still owed
    fn finish_reading(&self, client: ClientId) {
        let mut peers = self.inner.lock();
        let Some(peer) = peers.get_mut(&client) else {
            return;
        };

        peer.reading = false;
        if peer.pending == 0 {
            if let Some(peer) = peers.remove(&client) {
                let _ = peer.stream.shutdown(Shutdown::Both);
            }
        } else {
            tracing::debug!("{} stopped sending with {} replies owed", client, peer.pending);
            let _ = peer.stream.shutdown(Shutdown::Read);
        }
    }

    fn stream(&self, client: ClientId) -> Option<Arc<TcpStream>> {
        self.inner.lock().get(&client).map(|peer| Arc::clone(&peer.stream))
    }

    /// Account for one reply written (or failed) to `client`
    fn complete(&self, client: ClientId, written: bool) {
        let mut peers = self.inner.lock();
        let Some(peer) = peers.get_mut(&client) else {
            return;
        };

        peer.pending = peer.pending.saturating_sub(1);
        let done = !written || (peer.pending == 0 && !peer.reading);
        if done {
            if let Some(peer) = peers.remove(&client) {
                let _ = peer.stream.shutdown(Shutdown::Both);
            }
        }
    }

    fn close_all(&self) {
        for (_, peer) in self.inner.lock().drain() {
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
    }
}

/// TCP implementation of `Endpoint`
pub struct TcpEndpoint {
    /// Address actually bound (resolves port 0)
    local_addr: SocketAddr,

    /// Frames from every connection, in arrival order
    inbox: Receiver<Envelope>,

    /// Write half and owed-reply count of each live connection
    peers: Peers,

    /// Reader threads, joined on release
    readers: Arc<Mutex<Vec<JoinHandle<()>>>>,

    /// Acceptor thread, `None` once released
    acceptor: Option<JoinHandle<()>>,

    /// Tells the acceptor to stop
    shutdown: Arc<AtomicBool>,
}

impl TcpEndpoint {
    /// Bind `addr` and start accepting connections
    pub fn bind(addr: &str, config: &Config) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let (tx, inbox) = channel::unbounded();
        let peers = Peers::default();
        let readers = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let acceptor = Acceptor {
            listener,
            inbox: tx,
            peers: peers.clone(),
            readers: Arc::clone(&readers),
            shutdown: Arc::clone(&shutdown),
            next_client: AtomicU64::new(1),
            config: config.clone(),
        };
        let acceptor = thread::Builder::new()
            .name(format!("tablecache-accept-{}", local_addr.port()))
            .spawn(move || acceptor.run())?;

        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            local_addr,
            inbox,
            peers,
            readers,
            acceptor: Some(acceptor),
            shutdown,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected clients
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }
}

impl Endpoint for TcpEndpoint {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Envelope>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CacheError::Network(format!(
                "endpoint {} stopped accepting connections",
                self.local_addr
            ))),
        }
    }

    fn send(&mut self, client: ClientId, reply: Bytes) -> Result<()> {
        let Some(stream) = self.peers.stream(client) else {
            tracing::debug!("Dropping reply for {}: connection closed", client);
            return Ok(());
        };

        let written = (&*stream).write_all(&reply).and_then(|_| (&*stream).flush());
        if let Err(ref e) = written {
            // A single client going away is not a transport failure
            if is_disconnect(e.kind()) {
                tracing::debug!("{} disconnected before reply could be sent: {}", client, e);
            } else {
                tracing::warn!("Error writing to {}: {}", client, e);
            }
        }
        self.peers.complete(client, written.is_ok());

        Ok(())
    }

    fn release(&mut self) {
        let Some(acceptor) = self.acceptor.take() else {
            return;
        };

        self.shutdown.store(true, Ordering::SeqCst);
        let _ = acceptor.join();

        self.peers.close_all();
        let readers: Vec<_> = self.readers.lock().drain(..).collect();
        for reader in readers {
            let _ = reader.join();
        }

        tracing::info!("Released endpoint {}", self.local_addr);
    }
}

impl Drop for TcpEndpoint {
    fn drop(&mut self) {
        self.release();
    }
}

/// State owned by the accept thread
struct Acceptor {
    listener: TcpListener,
    inbox: Sender<Envelope>,
    peers: Peers,
    readers: Arc<Mutex<Vec<JoinHandle<()>>>>,
    shutdown: Arc<AtomicBool>,
    next_client: AtomicU64,
    config: Config,
}

impl Acceptor {
    fn run(self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.admit(stream) {
                        tracing::warn!("Rejected connection from {}: {}", peer, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_BACKOFF),
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_BACKOFF);
                }
            }
        }
    }

    fn admit(&self, stream: TcpStream) -> Result<()> {
        if self.peers.len() >= self.config.max_connections {
            return Err(CacheError::Network(format!(
                "connection limit of {} reached",
                self.config.max_connections
            )));
        }

        stream.set_nonblocking(false)?;
        if self.config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(self.config.write_timeout_ms)))?;
        }

        let client = ClientId(self.next_client.fetch_add(1, Ordering::Relaxed));
        let writer = Arc::new(stream.try_clone()?);
        let mut connection = Connection::new(
            client,
            stream,
            self.inbox.clone(),
            self.peers.clone(),
            self.config.max_frame_size,
        )?;

        self.peers.insert(client, writer);

        let peers = self.peers.clone();
        let handle = thread::Builder::new()
            .name(format!("tablecache-{}", client))
            .spawn(move || {
                let _ = connection.handle();
                peers.finish_reading(client);
            });
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                self.peers.remove(client);
                return Err(e.into());
            }
        };

        let mut readers = self.readers.lock();
        readers.retain(|reader| !reader.is_finished());
        readers.push(handle);
        Ok(())
    }
}
