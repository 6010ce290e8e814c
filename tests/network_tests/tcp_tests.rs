//! TCP Tests
//!
//! End-to-end tests: `Client` -> `TcpEndpoint` -> `CacheServer` and back.

use std::collections::BTreeMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;

use tablecache::network::{Client, TcpEndpoint};
use tablecache::protocol::{read_reply, write_request, Reply, Request, RequestBody};
use tablecache::{CacheError, CacheServer, Config, Registry, ServerState, Table};

// =============================================================================
// Helper Functions
// =============================================================================

struct Running {
    server: Arc<CacheServer>,
    addr: SocketAddr,
    handle: thread::JoinHandle<tablecache::Result<()>>,
}

impl Running {
    fn client(&self) -> Client {
        let mut client = Client::connect(&self.addr.to_string()).unwrap();
        client.set_timeout(Some(Duration::from_secs(5))).unwrap();
        client
    }

    fn shutdown(self) {
        self.server.stop();
        self.handle.join().unwrap().unwrap();
        assert_eq!(self.server.state(), ServerState::Stopped);
    }
}

fn start(config: Config) -> Running {
    let registry = Registry::with_config(config);
    let server = registry.get_or_create("127.0.0.1:0");

    let (tx, rx) = channel::bounded(1);
    let runner = Arc::clone(&server);
    let handle = thread::spawn(move || {
        runner.run_with(|addr, config| {
            let endpoint = TcpEndpoint::bind(addr, config)?;
            let _ = tx.send(endpoint.local_addr());
            Ok(endpoint)
        })
    });
    let addr = rx.recv_timeout(Duration::from_secs(5)).unwrap();

    Running { server, addr, handle }
}

fn default_config() -> Config {
    Config::builder().poll_interval_ms(10).build()
}

fn v(s: &str) -> Option<Vec<u8>> {
    Some(s.as_bytes().to_vec())
}

// =============================================================================
// End-to-end Tests
// =============================================================================

#[test]
fn test_tcp_basic_operations() {
    let running = start(default_config());
    let mut client = running.client();

    client.set("users", b"1".to_vec(), v("alice")).unwrap();
    assert_eq!(client.get("users", b"1".to_vec()).unwrap(), Some(v("alice")));
    assert_eq!(client.table_size("users").unwrap(), 1);
    assert_eq!(client.delete("users", b"1".to_vec()).unwrap(), 1);
    assert_eq!(client.table_size("users").unwrap(), 0);
    assert!(!client.list_tables().unwrap().contains("users"));

    running.shutdown();
}

#[test]
fn test_tcp_batch_operations() {
    let running = start(default_config());
    let mut client = running.client();

    let mut entries = Table::new();
    entries.insert(b"k1".to_vec(), v("v1"));
    entries.insert(b"k2".to_vec(), None);
    client.set_batch("t", entries.clone()).unwrap();

    assert_eq!(client.query("t").unwrap(), entries);

    let got = client
        .get_batch("t", vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()])
        .unwrap();
    let mut expected = BTreeMap::new();
    expected.insert(b"k1".to_vec(), Some(v("v1")));
    expected.insert(b"k2".to_vec(), Some(None));
    expected.insert(b"k3".to_vec(), None);
    assert_eq!(got, expected);

    assert_eq!(client.delete_batch("t", vec![b"k1".to_vec()]).unwrap(), 1);
    assert_eq!(client.delete_all("t").unwrap(), 1);

    running.shutdown();
}

#[test]
fn test_tcp_defaults_and_resets() {
    let running = start(default_config());
    let mut defaults = Table::new();
    defaults.insert(b"mode".to_vec(), v("fast"));
    running.server.set_table_default("config", defaults);

    let mut client = running.client();
    assert_eq!(client.table_size("config").unwrap(), 0);

    client.reset_all().unwrap();
    assert_eq!(client.get("config", b"mode".to_vec()).unwrap(), Some(v("fast")));

    client.set("config", b"mode".to_vec(), v("slow")).unwrap();
    client.reset_table("config").unwrap();
    assert_eq!(client.get("config", b"mode".to_vec()).unwrap(), Some(v("fast")));

    running.shutdown();
}

#[test]
fn test_tcp_error_replies() {
    let running = start(default_config());
    let mut client = running.client();

    match client.get("", b"1".to_vec()) {
        Err(CacheError::Remote(message)) => assert_eq!(message, "table name cannot be empty"),
        other => panic!("Expected remote error, got {:?}", other),
    }

    let reply = client.call(0xAB, RequestBody::default()).unwrap();
    assert_eq!(reply, Reply::error("operation 171 is not supported"));

    // Still serving
    assert_eq!(client.table_size("t").unwrap(), 0);

    running.shutdown();
}

#[test]
fn test_tcp_many_clients_share_state() {
    let running = start(default_config());

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let mut client = running.client();
            thread::spawn(move || {
                for j in 0..25u8 {
                    client.set("shared", vec![i, j], Some(vec![j])).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut client = running.client();
    assert_eq!(client.table_size("shared").unwrap(), 100);

    running.shutdown();
}

#[test]
fn test_tcp_client_disconnect_does_not_stop_server() {
    let running = start(default_config());

    {
        let mut client = running.client();
        client.set("t", b"a".to_vec(), v("1")).unwrap();
    }
    {
        // Half a header, then hang up
        let mut raw = TcpStream::connect(running.addr).unwrap();
        raw.write_all(&[0x03, 0x00]).unwrap();
    }

    let mut client = running.client();
    assert_eq!(client.get("t", b"a".to_vec()).unwrap(), Some(v("1")));
    assert!(running.server.is_running());

    running.shutdown();
}

#[test]
fn test_tcp_half_closed_client_still_gets_replies() {
    let running = start(default_config());

    for _ in 0..20 {
        let mut raw = TcpStream::connect(running.addr).unwrap();
        raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

        write_request(&mut raw, &Request::table_size("t")).unwrap();
        raw.shutdown(Shutdown::Write).unwrap();

        assert_eq!(read_reply(&mut raw).unwrap(), Reply::Success(0));
    }

    running.shutdown();
}

#[test]
fn test_tcp_pipelined_requests_answered_after_half_close() {
    let running = start(default_config());
    let mut raw = TcpStream::connect(running.addr).unwrap();
    raw.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    write_request(&mut raw, &Request::set("t", b"a".to_vec(), v("1"))).unwrap();
    write_request(&mut raw, &Request::set("t", b"b".to_vec(), v("2"))).unwrap();
    write_request(&mut raw, &Request::table_size("t")).unwrap();
    raw.shutdown(Shutdown::Write).unwrap();

    assert_eq!(read_reply(&mut raw).unwrap(), Reply::Success(0));
    assert_eq!(read_reply(&mut raw).unwrap(), Reply::Success(0));
    assert_eq!(read_reply(&mut raw).unwrap(), Reply::Success(2));

    // Every reply written, so the server closes its side
    assert!(read_reply(&mut raw).is_err());

    running.shutdown();
}

#[test]
fn test_tcp_oversized_frame_closes_connection() {
    let running = start(Config::builder().poll_interval_ms(10).max_frame_size(64).build());

    let mut client = running.client();
    let result = client.set("t", b"k".to_vec(), Some(vec![0u8; 1024]));
    assert!(result.is_err());

    let mut client = running.client();
    assert_eq!(client.table_size("t").unwrap(), 0);

    running.shutdown();
}

#[test]
fn test_tcp_stop_releases_connections() {
    let running = start(default_config());
    let mut client = running.client();
    client.set("t", b"a".to_vec(), v("1")).unwrap();

    let server = Arc::clone(&running.server);
    running.shutdown();
    assert_eq!(server.state(), ServerState::Stopped);

    // The connection was shut down by the server
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if client.table_size("t").is_err() {
            break;
        }
        assert!(Instant::now() < deadline, "connection still served after stop");
        thread::sleep(Duration::from_millis(10));
    }
}
