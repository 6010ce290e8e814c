//! Dispatch Module
//!
//! Turns one decoded request into exactly one reply against a `CacheStore`.
//!
//! ## Responsibilities
//! - Resolve the op code; unknown codes get an error reply
//! - Reject per-table operations with an empty table name before touching
//!   the store
//! - Convert every failure into `Reply::Error` so a bad request never stops
//!   the serve loop

use crate::error::{CacheError, Result};
use crate::protocol::{Operation, Reply, Request};
use crate::store::CacheStore;

/// Stateless request router; all table state lives in the store
#[derive(Debug, Default, Clone, Copy)]
pub struct Dispatcher;

impl Dispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Execute a request, always producing a reply
    pub fn dispatch(&self, store: &mut CacheStore, request: &Request) -> Reply {
        match self.try_dispatch(store, request) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(op = request.op, table = %request.body.table, "request failed: {}", e);
                Reply::error(e.to_string())
            }
        }
    }

    /// Execute a request, surfacing failures as errors
    pub fn try_dispatch(&self, store: &mut CacheStore, request: &Request) -> Result<Reply> {
        let operation = request.operation()?;
        let body = &request.body;

        if operation.is_per_table() && body.table.is_empty() {
            return Err(CacheError::EmptyTableName);
        }
        let table = body.table.as_str();
        tracing::trace!(%operation, table, "dispatching");

        let reply = match operation {
            Operation::ListTables => Reply::Tables(store.list_tables()),
            Operation::ResetAll => {
                store.reset_all()?;
                Reply::Success(0)
            }
            Operation::Get => {
                let key = body.key.as_deref().ok_or(CacheError::MissingField("key"))?;
                Reply::Payload(store.get(table, key))
            }
            Operation::Set => {
                let key = body.key.clone().ok_or(CacheError::MissingField("key"))?;
                store.set(table, key, body.value.clone());
                Reply::Success(0)
            }
            Operation::Delete => {
                let key = body.key.as_deref().ok_or(CacheError::MissingField("key"))?;
                Reply::Success(store.delete(table, key))
            }
            Operation::Query => Reply::Batch(
                store
                    .query(table)
                    .into_iter()
                    .map(|(key, value)| (key, Some(value)))
                    .collect(),
            ),
            Operation::GetBatch => {
                let keys = body.keys.as_deref().ok_or(CacheError::MissingField("keys"))?;
                Reply::Batch(store.get_batch(table, keys))
            }
            Operation::SetBatch => {
                let entries = body.entries.clone().ok_or(CacheError::MissingField("entries"))?;
                store.set_batch(table, entries);
                Reply::Success(0)
            }
            Operation::DeleteBatch => {
                let keys = body.keys.as_deref().ok_or(CacheError::MissingField("keys"))?;
                Reply::Success(store.delete_batch(table, keys))
            }
            Operation::DeleteAll => Reply::Success(store.delete_all(table)),
            Operation::ResetTable => {
                store.reset_table(table)?;
                Reply::Success(0)
            }
            Operation::TableSize => Reply::Success(store.table_size(table)),
        };

        Ok(reply)
    }
}
