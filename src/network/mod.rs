//! Network Module
//!
//! Request/response transport and the TCP client.
//!
//! ## Architecture
//! - `Endpoint`: what the serve loop needs from a transport (receive one
//!   request, send one reply to the same client, release)
//! - `TcpEndpoint`: single acceptor thread plus one reader thread per
//!   connection, all funnelled into one FIFO channel
//! - Replies are written from the serve loop thread, one at a time

mod endpoint;
mod connection;
mod tcp;
mod client;

pub use endpoint::{ClientId, Endpoint, Envelope};
pub use tcp::TcpEndpoint;
pub use client::Client;
