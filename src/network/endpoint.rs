//! Transport abstraction
//!
//! The serve loop only ever talks to an `Endpoint`.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Opaque identity used to route a reply back to its requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// One raw request frame and who sent it
#[derive(Debug, Clone)]
pub struct Envelope {
    pub client: ClientId,
    pub payload: Bytes,
}

/// A bound request/response transport
///
/// Exactly one `send` is expected per received envelope, in receive order.
pub trait Endpoint {
    /// Wait up to `timeout` for the next request
    ///
    /// `Ok(None)` means nothing arrived in time. An error means the transport
    /// is unusable and the serve loop must stop.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Envelope>>;

    /// Deliver a reply frame to a client
    fn send(&mut self, client: ClientId, reply: Bytes) -> Result<()>;

    /// Stop accepting work and free the underlying resources
    ///
    /// Must be safe to call more than once.
    fn release(&mut self);
}
