//! Reply definitions
//!
//! Represents replies to clients.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::{Key, Value};

/// Reply status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Payload = 0x00,
    Batch = 0x01,
    Success = 0x02,
    Error = 0x03,
    Tables = 0x04,
}

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Single lookup result; `None` when the key is not present
    Payload(Option<Value>),

    /// Key -> value-or-absent mapping (QUERY, GET_BATCH)
    Batch(BTreeMap<Key, Option<Value>>),

    /// Count-carrying success
    Success(u64),

    /// Request failed; the server keeps serving
    Error(String),

    /// Names of the materialized tables
    Tables(BTreeSet<String>),
}

impl Reply {
    /// Create an ERROR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// Status byte for this reply
    pub fn status(&self) -> Status {
        match self {
            Reply::Payload(_) => Status::Payload,
            Reply::Batch(_) => Status::Batch,
            Reply::Success(_) => Status::Success,
            Reply::Error(_) => Status::Error,
            Reply::Tables(_) => Status::Tables,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
