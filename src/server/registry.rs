//! Server registry
//!
//! Process-wide address -> server record map. Passed around explicitly
//! rather than living in a global.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use super::CacheServer;

/// At most one `CacheServer` per address
#[derive(Default)]
pub struct Registry {
    /// Settings handed to newly created records
    config: Config,

    servers: Mutex<HashMap<String, Arc<CacheServer>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose records inherit `config`
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            servers: Mutex::new(HashMap::new()),
        }
    }

    /// Existing record for `addr`, or a new STOPPED one
    ///
    /// Lookup and insert happen under one lock, so racing callers all get the
    /// same record.
    pub fn get_or_create(&self, addr: &str) -> Arc<CacheServer> {
        let mut servers = self.servers.lock();
        if let Some(server) = servers.get(addr) {
            return Arc::clone(server);
        }

        tracing::debug!(addr, "creating cache server record");
        let server = Arc::new(CacheServer::new(addr, self.config.clone()));
        servers.insert(addr.to_string(), Arc::clone(&server));
        server
    }

    /// Existing record for `addr`; never creates one
    pub fn get_instance(&self, addr: &str) -> Option<Arc<CacheServer>> {
        self.servers.lock().get(addr).cloned()
    }

    /// Serve `addr` on the calling thread until stopped
    pub fn run(&self, addr: &str) -> Result<()> {
        self.get_or_create(addr).run()
    }

    /// Addresses with a record, sorted
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.servers.lock().keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub fn len(&self) -> usize {
        self.servers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.lock().is_empty()
    }
}
