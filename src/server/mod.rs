//! Server Module
//!
//! One cache server record per address and the loop that serves it.
//!
//! ## Lifecycle
//! ```text
//!   get_or_create ──► STOPPED ──run()──► RUNNING ──loop exits──► STOPPED
//!                                  │
//!                                  └── already RUNNING: AlreadyRunning error
//! ```
//! `run` resets the store to its defaults, binds an endpoint and serves one
//! request at a time until `stop()` is called or the transport fails.

mod registry;

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{CacheError, Result};
use crate::network::{Endpoint, TcpEndpoint};
use crate::protocol::{decode_request, encode_error, encode_reply, Reply};
use crate::store::{CacheStore, TableDefault};

pub use registry::Registry;

/// Run state of a server record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
}

/// Cache state and run state bound to one address
///
/// Shared as `Arc<CacheServer>` through a `Registry`; the store lock is only
/// contended by embedding threads, never by concurrent requests.
pub struct CacheServer {
    /// Address the server binds
    addr: String,

    /// Network settings (listen address ignored in favour of `addr`)
    config: Config,

    /// Tables and their defaults
    store: Mutex<CacheStore>,

    /// STOPPED / RUNNING
    state: Mutex<ServerState>,

    /// Set by `stop()`, polled between receives
    stop: AtomicBool,

    dispatcher: Dispatcher,
}

impl CacheServer {
    pub(crate) fn new(addr: &str, config: Config) -> Self {
        Self {
            addr: addr.to_string(),
            config,
            store: Mutex::new(CacheStore::new()),
            state: Mutex::new(ServerState::Stopped),
            stop: AtomicBool::new(false),
            dispatcher: Dispatcher::new(),
        }
    }

    // =========================================================================
    // Administrative Surface
    // =========================================================================

    /// Register the content `table` is recreated with on reset
    ///
    /// Allowed at any time; only materializes on the next table or full reset.
    pub fn set_table_default(&self, table: impl Into<String>, default: impl Into<TableDefault>) {
        let table = table.into();
        tracing::debug!(addr = %self.addr, table = %table, "registered table default");
        self.store.lock().set_default(table, default.into());
    }

    /// Run a closure against the store
    pub fn with_store<R>(&self, f: impl FnOnce(&mut CacheStore) -> R) -> R {
        let mut store = self.store.lock();
        f(&mut *store)
    }

    /// Ask the serve loop to exit after the current request
    ///
    /// A stop requested while `run` is still starting up is kept: the loop
    /// returns right after the endpoint is bound.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    // =========================================================================
    // Serving
    // =========================================================================

    /// Bind a TCP endpoint on this record's address and serve until stopped
    pub fn run(&self) -> Result<()> {
        self.run_with(TcpEndpoint::bind)
    }

    /// Serve on an endpoint produced by `bind`
    ///
    /// Fails with `AlreadyRunning` without side effects if the record is
    /// already serving. Whatever way the loop ends, the endpoint is released
    /// and the state goes back to STOPPED.
    pub fn run_with<E, F>(&self, bind: F) -> Result<()>
    where
        E: Endpoint,
        F: FnOnce(&str, &Config) -> Result<E>,
    {
        let _running = RunGuard::enter(self)?;

        self.store.lock().reset_all()?;
        let mut endpoint = bind(&self.addr, &self.config)?;
        tracing::info!("Cache server running at {}", self.addr);

        let result = self.serve(&mut endpoint);
        endpoint.release();

        match &result {
            Ok(()) => tracing::info!("Cache server at {} stopped", self.addr),
            Err(e) => tracing::warn!("Cache server at {} failed: {}", self.addr, e),
        }
        result
    }

    fn serve<E: Endpoint>(&self, endpoint: &mut E) -> Result<()> {
        let poll = self.config.poll_interval();

        while !self.stop.load(Ordering::SeqCst) {
            let Some(envelope) = endpoint.receive(poll)? else {
                continue;
            };
            let reply = self.process(&envelope.payload);
            endpoint.send(envelope.client, Bytes::from(reply))?;
        }

        Ok(())
    }

    /// Handle one raw request frame, producing one raw reply frame
    pub fn process(&self, frame: &[u8]) -> Vec<u8> {
        let reply = match decode_request(frame) {
            Ok(request) => {
                let mut store = self.store.lock();
                self.dispatcher.dispatch(&mut *store, &request)
            }
            Err(e) => {
                tracing::debug!("undecodable request: {}", e);
                Reply::error(e.to_string())
            }
        };

        encode_reply(&reply).unwrap_or_else(|e| encode_error(&e.to_string()))
    }
}

/// Holds RUNNING for the duration of a serve loop
struct RunGuard<'a> {
    server: &'a CacheServer,
}

impl<'a> RunGuard<'a> {
    fn enter(server: &'a CacheServer) -> Result<Self> {
        let mut state = server.state.lock();
        if *state == ServerState::Running {
            return Err(CacheError::AlreadyRunning(server.addr.clone()));
        }
        *state = ServerState::Running;
        Ok(Self { server })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.server.state.lock();
        self.server.stop.store(false, Ordering::SeqCst);
        *state = ServerState::Stopped;
    }
}
