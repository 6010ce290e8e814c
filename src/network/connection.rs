//! Connection Handler
//!
//! Reads request frames from one client and forwards them to the serve loop.

use std::io::BufReader;
use std::net::TcpStream;

use bytes::Bytes;
use crossbeam::channel::Sender;

use crate::error::{CacheError, Result};
use crate::protocol::read_frame;
use super::tcp::Peers;
use super::{ClientId, Envelope};

/// Read side of a single client connection
pub(crate) struct Connection {
    /// Identity replies are routed by
    client: ClientId,

    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Queue shared by all connections of one endpoint
    inbox: Sender<Envelope>,

    /// Unanswered request counts, bumped before a frame is queued
    peers: Peers,

    /// Largest accepted frame body
    max_frame_size: u32,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection reader
    pub(crate) fn new(
        client: ClientId,
        stream: TcpStream,
        inbox: Sender<Envelope>,
        peers: Peers,
        max_frame_size: u32,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        Ok(Self {
            client,
            reader: BufReader::new(stream),
            inbox,
            peers,
            max_frame_size,
            peer_addr,
        })
    }

    /// Forward frames until the client goes away (blocking)
    ///
    /// Returns `Ok(())` on a clean disconnect or when the endpoint is gone.
    /// Replies to frames already forwarded are still owed after this returns.
    pub(crate) fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {} as {}", self.peer_addr, self.client);

        loop {
            let frame = match read_frame(&mut self.reader, self.max_frame_size) {
                Ok(frame) => frame,
                Err(CacheError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    // The stream cannot be resynchronized after a bad header
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received {} byte frame from {}", frame.len(), self.peer_addr);

            let envelope = Envelope {
                client: self.client,
                payload: Bytes::from(frame),
            };
            self.peers.enqueue(self.client);
            if self.inbox.send(envelope).is_err() {
                tracing::debug!("Endpoint released, dropping {}", self.peer_addr);
                return Ok(());
            }
        }
    }
}

/// Error kinds that mean the peer (or our own release) closed the socket
pub(crate) fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
