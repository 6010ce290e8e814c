//! TCP Client
//!
//! Blocking client speaking the framed protocol, one request at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{CacheError, Result};
use crate::protocol::{read_reply, write_request, Reply, Request, RequestBody};
use crate::store::{Key, Table, Value};

/// Connection to a cache server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Limit how long a call waits for its reply
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send a request and wait for its reply, whatever its kind
    pub fn request(&mut self, request: &Request) -> Result<Reply> {
        write_request(&mut self.writer, request)?;
        read_reply(&mut self.reader)
    }

    /// Send a request with a raw op code
    pub fn call(&mut self, op: u8, body: RequestBody) -> Result<Reply> {
        self.request(&Request::raw(op, body))
    }

    // =========================================================================
    // Typed Operations
    // =========================================================================

    pub fn list_tables(&mut self) -> Result<BTreeSet<String>> {
        match self.request(&Request::list_tables())? {
            Reply::Tables(names) => Ok(names),
            other => Err(unexpected(other)),
        }
    }

    pub fn reset_all(&mut self) -> Result<()> {
        self.count(&Request::reset_all()).map(|_| ())
    }

    /// Outer `None` when the key is not present
    pub fn get(&mut self, table: &str, key: impl Into<Key>) -> Result<Option<Value>> {
        match self.request(&Request::get(table, key))? {
            Reply::Payload(value) => Ok(value),
            other => Err(unexpected(other)),
        }
    }

    pub fn set(&mut self, table: &str, key: impl Into<Key>, value: Value) -> Result<()> {
        self.count(&Request::set(table, key, value)).map(|_| ())
    }

    pub fn delete(&mut self, table: &str, key: impl Into<Key>) -> Result<u64> {
        self.count(&Request::delete(table, key))
    }

    pub fn query(&mut self, table: &str) -> Result<Table> {
        let entries = self.batch(&Request::query(table))?;
        Ok(entries
            .into_iter()
            .map(|(key, value)| (key, value.flatten()))
            .collect())
    }

    pub fn get_batch(&mut self, table: &str, keys: Vec<Key>) -> Result<BTreeMap<Key, Option<Value>>> {
        self.batch(&Request::get_batch(table, keys))
    }

    pub fn set_batch(&mut self, table: &str, entries: Table) -> Result<()> {
        self.count(&Request::set_batch(table, entries)).map(|_| ())
    }

    pub fn delete_batch(&mut self, table: &str, keys: Vec<Key>) -> Result<u64> {
        self.count(&Request::delete_batch(table, keys))
    }

    pub fn delete_all(&mut self, table: &str) -> Result<u64> {
        self.count(&Request::delete_all(table))
    }

    pub fn reset_table(&mut self, table: &str) -> Result<()> {
        self.count(&Request::reset_table(table)).map(|_| ())
    }

    pub fn table_size(&mut self, table: &str) -> Result<u64> {
        self.count(&Request::table_size(table))
    }

    fn count(&mut self, request: &Request) -> Result<u64> {
        match self.request(request)? {
            Reply::Success(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    fn batch(&mut self, request: &Request) -> Result<BTreeMap<Key, Option<Value>>> {
        match self.request(request)? {
            Reply::Batch(entries) => Ok(entries),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: Reply) -> CacheError {
    match reply {
        Reply::Error(message) => CacheError::Remote(message),
        other => CacheError::Protocol(format!("unexpected {:?} reply", other.status())),
    }
}
