//! Server Tests
//!
//! End-to-end tests that speak raw RESP over TCP.

use std::io::{BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use respkv::network::{Server, ShutdownHandle};
use respkv::protocol::RespReader;
use respkv::{AofSyncStrategy, Config, Engine, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
    engine: Arc<Engine>,
}

impl TestServer {
    fn start(config: Config) -> Self {
        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Server::bind(config, Arc::clone(&engine)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            shutdown,
            handle: Some(handle),
            engine,
        }
    }

    fn in_memory() -> Self {
        Self::start(
            Config::builder()
                .aof_enabled(false)
                .listen_addr("127.0.0.1:0")
                .build(),
        )
    }

    fn connect(&self) -> Client {
        Client::connect(self.addr)
    }

    fn stop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Client {
    stream: TcpStream,
    reader: RespReader<BufReader<TcpStream>>,
}

impl Client {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = RespReader::new(BufReader::new(stream.try_clone().unwrap()));
        Self { stream, reader }
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    fn read_reply(&mut self) -> Value {
        self.reader.read_value().unwrap().expect("connection closed")
    }

    fn call(&mut self, parts: &[&str]) -> Value {
        self.send_raw(&Value::request(parts).marshal());
        self.read_reply()
    }

    /// True once the server has closed its side
    fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 64];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    }
}

// =============================================================================
// Request/Reply Tests
// =============================================================================

#[test]
fn test_ping_over_tcp() {
    let server = TestServer::in_memory();
    let mut client = server.connect();

    client.send_raw(b"*1\r\n$4\r\nPING\r\n");

    assert_eq!(client.read_reply(), Value::SimpleString("PONG".into()));
}

#[test]
fn test_replies_are_byte_exact() {
    let server = TestServer::in_memory();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    stream
        .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .unwrap();
    let mut reply = [0u8; 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"+OK\r\n");

    stream.write_all(b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n").unwrap();
    let mut reply = [0u8; 5];
    stream.read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"$-1\r\n");
}

#[test]
fn test_session() {
    let server = TestServer::in_memory();
    let mut client = server.connect();

    assert_eq!(client.call(&["SET", "foo", "bar"]), Value::ok());
    assert_eq!(client.call(&["GET", "foo"]), Value::bulk("bar"));
    assert_eq!(client.call(&["RPUSH", "l", "a", "b", "c"]), Value::Integer(3));
    assert_eq!(
        client.call(&["LRANGE", "l", "0", "-1"]),
        Value::Array(vec![Value::bulk("a"), Value::bulk("b"), Value::bulk("c")])
    );
    assert_eq!(client.call(&["INCR", "n"]), Value::Integer(1));
}

#[test]
fn test_pipelined_requests() {
    let server = TestServer::in_memory();
    let mut client = server.connect();

    let mut batch = Vec::new();
    for _ in 0..10 {
        batch.extend_from_slice(&Value::request(&["INCR", "n"]).marshal());
    }
    client.send_raw(&batch);

    for i in 1..=10 {
        assert_eq!(client.read_reply(), Value::Integer(i));
    }
}

#[test]
fn test_command_errors_keep_connection_open() {
    let server = TestServer::in_memory();
    let mut client = server.connect();

    assert!(client.call(&["NOPE"]).is_error());
    assert!(client.call(&["GET"]).is_error());

    assert_eq!(client.call(&["PING"]), Value::SimpleString("PONG".into()));
}

#[test]
fn test_clients_share_state() {
    let server = TestServer::in_memory();
    let mut writer = server.connect();
    let mut reader = server.connect();

    writer.call(&["HSET", "h", "f", "v"]);

    assert_eq!(reader.call(&["HGET", "h", "f"]), Value::bulk("v"));
    assert_eq!(server.engine.snapshot().hget(b"h", b"f").map(|v| v.to_vec()), Some(b"v".to_vec()));
}

#[test]
fn test_concurrent_clients() {
    let server = TestServer::in_memory();
    let addr = server.addr;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(move || {
                let mut client = Client::connect(addr);
                for _ in 0..100 {
                    assert!(!client.call(&["INCR", "shared"]).is_error());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut client = server.connect();
    assert_eq!(client.call(&["GET", "shared"]), Value::bulk("400"));
}

// =============================================================================
// Protocol Error Tests
// =============================================================================

#[test]
fn test_malformed_frame_closes_connection() {
    let server = TestServer::in_memory();
    let mut client = server.connect();

    client.send_raw(b"$abc\r\n");

    match client.read_reply() {
        Value::Error(e) => assert!(e.starts_with("ERR Protocol error"), "{}", e),
        other => panic!("expected an error reply, got {:?}", other),
    }
    assert!(client.is_closed());

    // The server itself keeps serving
    let mut other = server.connect();
    assert_eq!(other.call(&["PING"]), Value::SimpleString("PONG".into()));
}

// =============================================================================
// Server Lifecycle Tests
// =============================================================================

#[test]
fn test_connection_limit() {
    let server = TestServer::start(
        Config::builder()
            .aof_enabled(false)
            .listen_addr("127.0.0.1:0")
            .max_connections(1)
            .build(),
    );

    let mut first = server.connect();
    assert_eq!(first.call(&["PING"]), Value::SimpleString("PONG".into()));

    let mut second = server.connect();
    assert_eq!(
        second.read_reply(),
        Value::error("ERR max number of clients reached")
    );
    assert!(second.is_closed());

    assert_eq!(first.call(&["PING"]), Value::SimpleString("PONG".into()));
}

#[test]
fn test_bind_failure_is_network_error() {
    let server = TestServer::in_memory();
    let config = Config::builder()
        .aof_enabled(false)
        .listen_addr(server.addr.to_string())
        .build();

    let result = Server::bind(config, Arc::new(Engine::in_memory()));

    assert!(matches!(result, Err(respkv::KvError::Network(_))));
}

#[test]
fn test_shutdown_stops_accept_loop() {
    let mut server = TestServer::in_memory();
    let mut client = server.connect();
    assert_eq!(client.call(&["PING"]), Value::SimpleString("PONG".into()));

    server.stop();

    assert!(server.handle.is_none());
}

#[test]
fn test_writes_survive_server_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .aof_sync_strategy(AofSyncStrategy::EveryWrite)
        .listen_addr("127.0.0.1:0")
        .build();

    {
        let server = TestServer::start(config.clone());
        let mut client = server.connect();
        assert_eq!(client.call(&["SET", "k", "v"]), Value::ok());
        assert_eq!(client.call(&["LPUSH", "l", "x"]), Value::Integer(1));
    }

    let server = TestServer::start(config);
    let mut client = server.connect();
    assert_eq!(client.call(&["GET", "k"]), Value::bulk("v"));
    assert_eq!(client.call(&["LPOP", "l"]), Value::bulk("x"));
}

#[test]
fn test_shutdown_releases_engine_for_close() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .aof_sync_strategy(AofSyncStrategy::Periodic)
        .listen_addr("127.0.0.1:0")
        .build();

    let engine = Arc::new(Engine::open(config.clone()).unwrap());
    let server = Server::bind(config.clone(), Arc::clone(&engine)).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let handle = thread::spawn(move || server.run().unwrap());

    {
        let mut client = Client::connect(addr);
        assert_eq!(client.call(&["SET", "k", "v"]), Value::ok());
    }

    // Same path a Ctrl+C takes in the server binary
    shutdown.shutdown();
    handle.join().unwrap();

    // The closed connection's thread may still be unwinding
    let mut engine = engine;
    let mut attempts = 0;
    let engine = loop {
        match Arc::try_unwrap(engine) {
            Ok(engine) => break engine,
            Err(shared) => {
                attempts += 1;
                assert!(attempts < 500, "engine still shared after shutdown");
                engine = shared;
                thread::sleep(Duration::from_millis(10));
            }
        }
    };
    assert!(engine.aof().unwrap().flusher_running());
    engine.close().unwrap();

    let reopened = Engine::open(config).unwrap();
    assert_eq!(reopened.execute(&Value::request(&["GET", "k"])), Value::bulk("v"));
}
