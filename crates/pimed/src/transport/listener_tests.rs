//! Tests for the socket listener.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use pime_config::SocketEndpoint;

use super::listener::SocketListener;
use super::{ConnectionHandler, ConnectionStream, ListenerError};
use crate::tests::support::PeerRecorder;

#[fixture]
fn recorder() -> Arc<PeerRecorder> {
    PeerRecorder::new()
}

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn wait_for_peers(recorder: &PeerRecorder, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if recorder.connections() >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[rstest]
fn tcp_listener_serves_every_host_connection(
    tcp_endpoint: SocketEndpoint,
    recorder: Arc<PeerRecorder>,
) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener
        .local_addr()
        .expect("listener should report local address");
    let handle = listener
        .start(Arc::clone(&recorder) as Arc<dyn ConnectionHandler>)
        .expect("start listener");

    let first = TcpStream::connect(addr).expect("connect first host");
    let second = TcpStream::connect(addr).expect("connect second host");

    assert!(wait_for_peers(&recorder, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
    let mut peers = recorder.peers();
    peers.sort();
    let mut expected = [first, second].map(|host| {
        format!("tcp:{}", host.local_addr().expect("host address"))
    });
    expected.sort();
    assert_eq!(peers, expected);
}

#[cfg(unix)]
#[fixture]
fn unix_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn unix_listener_cleans_stale_socket_files(
    unix_tempdir: tempfile::TempDir,
    recorder: Arc<PeerRecorder>,
) {
    let path = unix_tempdir.path().join("pimed.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_string());
    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    let handle = listener
        .start(Arc::clone(&recorder) as Arc<dyn ConnectionHandler>)
        .expect("start listener");

    std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    assert!(wait_for_peers(&recorder, 1), "expected the unix host to be served");
    assert_eq!(recorder.peers(), ["unix"]);

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(
        !path.exists(),
        "listener should remove unix socket on shutdown"
    );
}

#[cfg(unix)]
#[rstest]
fn unix_listener_rejects_in_use_socket(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("pimed.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_string());
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::UnixInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_to_replace_regular_files(unix_tempdir: tempfile::TempDir) {
    let path = unix_tempdir.path().join("pimed.sock");
    std::fs::write(&path, b"not a socket").expect("write placeholder");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_string());
    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");

    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    assert!(path.exists(), "regular file must be left in place");
}

struct EchoNameHandler;

impl ConnectionHandler for EchoNameHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let name = std::thread::current().name().unwrap_or_default().to_owned();
        let mut byte = [0_u8; 1];
        if stream.read_exact(&mut byte).is_ok() {
            let _ = stream.write_all(name.as_bytes());
        }
    }
}

#[rstest]
fn each_connection_runs_on_its_own_named_worker(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let handle = listener
        .start(Arc::new(EchoNameHandler))
        .expect("start listener");

    let mut names = Vec::new();
    for _ in 0..2 {
        let mut client = TcpStream::connect(addr).expect("connect client");
        client.write_all(b"x").expect("send byte");
        let mut name = String::new();
        client.read_to_string(&mut name).expect("read worker name");
        names.push(name);
    }

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(names.iter().all(|name| name.starts_with("pimed-connection-")));
    assert_ne!(names[0], names[1]);
}
