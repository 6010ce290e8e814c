//! Request definitions
//!
//! Represents requests from clients.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::store::{Key, Table, Value};

/// Operation kinds understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    ListTables = 0x01,
    ResetAll = 0x02,
    Get = 0x03,
    Set = 0x04,
    Delete = 0x05,
    Query = 0x06,
    GetBatch = 0x07,
    SetBatch = 0x08,
    DeleteBatch = 0x09,
    DeleteAll = 0x0A,
    ResetTable = 0x0B,
    TableSize = 0x0C,
}

impl Operation {
    /// Whether the operation addresses a single table
    pub fn is_per_table(self) -> bool {
        !matches!(self, Operation::ListTables | Operation::ResetAll)
    }
}

impl TryFrom<u8> for Operation {
    type Error = CacheError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0x01 => Operation::ListTables,
            0x02 => Operation::ResetAll,
            0x03 => Operation::Get,
            0x04 => Operation::Set,
            0x05 => Operation::Delete,
            0x06 => Operation::Query,
            0x07 => Operation::GetBatch,
            0x08 => Operation::SetBatch,
            0x09 => Operation::DeleteBatch,
            0x0A => Operation::DeleteAll,
            0x0B => Operation::ResetTable,
            0x0C => Operation::TableSize,
            other => return Err(CacheError::UnsupportedOperation(other)),
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ListTables => "LIST_TABLES",
            Operation::ResetAll => "RESET_ALL",
            Operation::Get => "GET",
            Operation::Set => "SET",
            Operation::Delete => "DELETE",
            Operation::Query => "QUERY",
            Operation::GetBatch => "GET_BATCH",
            Operation::SetBatch => "SET_BATCH",
            Operation::DeleteBatch => "DELETE_BATCH",
            Operation::DeleteAll => "DELETE_ALL",
            Operation::ResetTable => "RESET_TABLE",
            Operation::TableSize => "TABLE_SIZE",
        };
        f.write_str(name)
    }
}

/// Fields carried by a request; which ones matter depends on the operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Target table (empty for LIST_TABLES / RESET_ALL)
    pub table: String,

    /// Key for GET / SET / DELETE
    pub key: Option<Key>,

    /// Value for SET
    pub value: Value,

    /// Keys for GET_BATCH / DELETE_BATCH
    pub keys: Option<Vec<Key>>,

    /// Entries for SET_BATCH
    pub entries: Option<Table>,
}

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Raw operation code as received
    pub op: u8,

    /// Request fields
    pub body: RequestBody,
}

impl Request {
    /// Build a request from a raw op code (may be unknown to the server)
    pub fn raw(op: u8, body: RequestBody) -> Self {
        Self { op, body }
    }

    fn with(op: Operation, body: RequestBody) -> Self {
        Self::raw(op as u8, body)
    }

    fn for_table(op: Operation, table: impl Into<String>) -> Self {
        Self::with(
            op,
            RequestBody {
                table: table.into(),
                ..RequestBody::default()
            },
        )
    }

    pub fn list_tables() -> Self {
        Self::with(Operation::ListTables, RequestBody::default())
    }

    pub fn reset_all() -> Self {
        Self::with(Operation::ResetAll, RequestBody::default())
    }

    pub fn get(table: impl Into<String>, key: impl Into<Key>) -> Self {
        let mut request = Self::for_table(Operation::Get, table);
        request.body.key = Some(key.into());
        request
    }

    pub fn set(table: impl Into<String>, key: impl Into<Key>, value: Value) -> Self {
        let mut request = Self::for_table(Operation::Set, table);
        request.body.key = Some(key.into());
        request.body.value = value;
        request
    }

    pub fn delete(table: impl Into<String>, key: impl Into<Key>) -> Self {
        let mut request = Self::for_table(Operation::Delete, table);
        request.body.key = Some(key.into());
        request
    }

    pub fn query(table: impl Into<String>) -> Self {
        Self::for_table(Operation::Query, table)
    }

    pub fn get_batch(table: impl Into<String>, keys: Vec<Key>) -> Self {
        let mut request = Self::for_table(Operation::GetBatch, table);
        request.body.keys = Some(keys);
        request
    }

    pub fn set_batch(table: impl Into<String>, entries: Table) -> Self {
        let mut request = Self::for_table(Operation::SetBatch, table);
        request.body.entries = Some(entries);
        request
    }

    pub fn delete_batch(table: impl Into<String>, keys: Vec<Key>) -> Self {
        let mut request = Self::for_table(Operation::DeleteBatch, table);
        request.body.keys = Some(keys);
        request
    }

    pub fn delete_all(table: impl Into<String>) -> Self {
        Self::for_table(Operation::DeleteAll, table)
    }

    pub fn reset_table(table: impl Into<String>) -> Self {
        Self::for_table(Operation::ResetTable, table)
    }

    pub fn table_size(table: impl Into<String>) -> Self {
        Self::for_table(Operation::TableSize, table)
    }

    /// Resolve the op code to a known operation
    pub fn operation(&self) -> Result<Operation, CacheError> {
        Operation::try_from(self.op)
    }
}
