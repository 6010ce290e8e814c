//! Store Module
//!
//! In-memory named tables served by the cache.
//!
//! ## Responsibilities
//! - Map table name -> table content (key -> value)
//! - Keep per-table default content used by resets
//! - Never retain an empty table: emptiness and absence are the same state
//!
//! ## Data Structure Choice
//! Tables are BTreeMaps so query and batch replies come out in key order.
//! No locking here; a server record serializes all access.

mod cache;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

pub use cache::CacheStore;

/// Opaque key, unique within a table
pub type Key = Vec<u8>;

/// Opaque value; `None` is a stored absent value, not a missing key
pub type Value = Option<Vec<u8>>;

/// Content of one table
pub type Table = BTreeMap<Key, Value>;

/// Zero-argument producer of a fresh table snapshot
pub type Provider = Arc<dyn Fn() -> Result<Table> + Send + Sync>;

/// Content a table is recreated with on reset
#[derive(Clone)]
pub enum TableDefault {
    /// A snapshot copied on every reset
    Static(Table),

    /// A producer invoked on every reset
    Provider(Provider),
}

impl TableDefault {
    /// Wrap an infallible snapshot producer
    pub fn provider<F>(f: F) -> Self
    where
        F: Fn() -> Table + Send + Sync + 'static,
    {
        TableDefault::Provider(Arc::new(move || Ok(f())))
    }

    /// Wrap a snapshot producer that may fail
    pub fn try_provider<F>(f: F) -> Self
    where
        F: Fn() -> Result<Table> + Send + Sync + 'static,
    {
        TableDefault::Provider(Arc::new(f))
    }

    /// Produce the content this default stands for
    pub fn resolve(&self) -> Result<Table> {
        match self {
            TableDefault::Static(table) => Ok(table.clone()),
            TableDefault::Provider(provider) => provider(),
        }
    }
}

impl From<Table> for TableDefault {
    fn from(table: Table) -> Self {
        TableDefault::Static(table)
    }
}

impl fmt::Debug for TableDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableDefault::Static(table) => f.debug_tuple("Static").field(&table.len()).finish(),
            TableDefault::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}
