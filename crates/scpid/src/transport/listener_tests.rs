//! Tests for the socket listener.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use scpi_config::SocketEndpoint;

use super::{ConnectionHandler, CountingHandler, ListenerError, SocketListener};

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn tcp_listener_accepts_connections() {
    let listener =
        SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let (count, handler) = CountingHandler::new();
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener.start(handler).expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[test]
fn connections_are_served_on_numbered_threads() {
    let listener =
        SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", 0)).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let (count, handler) = CountingHandler::new();
    let handle = listener
        .start(Arc::clone(&handler) as Arc<dyn ConnectionHandler>)
        .expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    assert!(wait_for_count(&count, 1), "expected first connection");
    TcpStream::connect(addr).expect("connect second client");
    assert!(wait_for_count(&count, 2), "expected second connection");

    assert_eq!(handler.thread_names(), vec!["scpi-conn-1", "scpi-conn-2"]);
    handle.shutdown();
    handle.join().expect("join listener");
}

#[test]
fn occupied_ports_report_the_configured_endpoint() {
    let occupant = TcpListener::bind("127.0.0.1:0").expect("bind occupant");
    let port = occupant.local_addr().expect("occupant address").port();

    let error = SocketListener::bind(&SocketEndpoint::tcp("127.0.0.1", port))
        .expect_err("bind should fail");
    let expected = format!("tcp://127.0.0.1:{port}");
    match &error {
        ListenerError::Bind { endpoint, .. } => assert_eq!(endpoint, &expected),
        other => panic!("expected a bind failure, got {other:?}"),
    }
    assert!(error.to_string().contains(&expected));
}

#[cfg(unix)]
#[fixture]
fn socket_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn unix_listener_replaces_stale_sockets(socket_dir: tempfile::TempDir) {
    let path = socket_dir.path().join("scpid.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    let (count, handler) = CountingHandler::new();
    let handle = listener.start(handler).expect("start listener");

    std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    assert!(wait_for_count(&count, 1), "expected one connection");

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(!path.exists(), "listener should remove its socket on shutdown");
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_live_sockets(socket_dir: tempfile::TempDir) {
    let path = socket_dir.path().join("scpid.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_regular_files(socket_dir: tempfile::TempDir) {
    let path = socket_dir.path().join("scpid.sock");
    std::fs::write(&path, b"not a socket").expect("write file");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = SocketListener::bind(&endpoint).expect_err("bind should fail");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
}
