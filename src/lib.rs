//! # TableCache
//!
//! A look-aside cache server with:
//! - Named tables, each a key -> value map, held in process memory
//! - Per-table default content restored on reset (static or produced)
//! - One server record per address, one request in flight at a time
//! - Framed binary request/response protocol over TCP
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Endpoint                            │
//! │          (Multiple Clients, one FIFO of requests)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  (client id, frame)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Cache Server                              │
//! │        (Registry: one record per address, run state)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  decoded Request
//!                       ▼
//!                ┌─────────────┐          ┌─────────────┐
//!                │ Dispatcher  │ ───────► │ CacheStore  │
//!                │ (stateless) │          │  (tables +  │
//!                └─────────────┘          │  defaults)  │
//!                                         └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod protocol;
pub mod dispatch;
pub mod network;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use dispatch::Dispatcher;
pub use server::{CacheServer, Registry, ServerState};
pub use store::{CacheStore, Key, Table, TableDefault, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TableCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
