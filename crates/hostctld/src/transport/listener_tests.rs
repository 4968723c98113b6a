//! Tests for the scripting control socket.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use hostctl_config::{Dialect, ReplyOrder, SocketEndpoint};

use super::listener::{AcceptMode, ControlListener};
use super::{ChannelConnectionHandler, ConnectionHandler, ControlSocketError, CountingHandler};
use crate::channel::{ChannelContext, ChannelSettings};
use crate::health::StructuredHealthReporter;
use crate::session::PlaceholderSession;

#[derive(Clone)]
struct ScriptCounter {
    count: Arc<AtomicUsize>,
    handler: Arc<CountingHandler>,
}

#[fixture]
fn script_counter() -> ScriptCounter {
    let (count, handler) = CountingHandler::new();
    ScriptCounter { count, handler }
}

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

fn channel_handler() -> Arc<dyn ConnectionHandler> {
    let session = Arc::new(PlaceholderSession::new());
    let context = ChannelContext::new(
        session.clone(),
        session,
        Arc::new(StructuredHealthReporter::new()),
    );
    Arc::new(ChannelConnectionHandler::new(
        context,
        ChannelSettings::new(Dialect::Run, ReplyOrder::Completion),
    ))
}

#[rstest]
fn continuous_socket_serves_every_script(
    tcp_endpoint: SocketEndpoint,
    script_counter: ScriptCounter,
) {
    let listener = ControlListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener
        .local_addr()
        .expect("assigned port");
    let ScriptCounter { count, handler } = script_counter;
    let handler: Arc<dyn ConnectionHandler> = handler;
    let handle = listener
        .start(handler, AcceptMode::Continuous, || {})
        .expect("start listener");

    TcpStream::connect(addr).expect("first script connects");
    TcpStream::connect(addr).expect("second script connects");

    assert!(
        wait_until(|| count.load(Ordering::SeqCst) >= 2),
        "both scripts should be served"
    );
    handle.shutdown();
    handle.join().expect("join listener");
}

#[rstest]
fn single_script_socket_stops_after_its_script(
    tcp_endpoint: SocketEndpoint,
    script_counter: ScriptCounter,
) {
    let listener = ControlListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let exited = Arc::new(AtomicBool::new(false));
    let exit_flag = Arc::clone(&exited);
    let handle = listener
        .start(script_counter.handler, AcceptMode::Once, move || {
            exit_flag.store(true, Ordering::SeqCst);
        })
        .expect("start listener");

    let client = TcpStream::connect(addr).expect("connect client");
    assert!(!handle.is_finished());
    drop(client);

    assert!(wait_until(|| exited.load(Ordering::SeqCst)), "listener should stop");
    assert!(handle.is_finished());
    assert_eq!(script_counter.count.load(Ordering::SeqCst), 1);
    handle.join().expect("join listener");
}

#[rstest]
fn socket_channels_reply_with_run_results(tcp_endpoint: SocketEndpoint) {
    let listener = ControlListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    let (done, finished) = mpsc::channel();
    let handle = listener
        .start(channel_handler(), AcceptMode::Once, move || {
            let _sent = done.send(());
        })
        .expect("start listener");

    let mut client = TcpStream::connect(addr).expect("connect client");
    client
        .write_all(b"{\"run\":{\"actions\":{\"action\":\"Echo\",\"args\":[\"hi\"]}}}\n")
        .expect("write request");
    client.shutdown(Shutdown::Write).expect("half-close");
    let mut replies = String::new();
    client.read_to_string(&mut replies).expect("read replies");

    let reply: hostctl_wire::RunResult =
        serde_json::from_str(replies.trim_end()).expect("run-result");
    assert_eq!(reply.run_result.text, vec!["hi"]);
    finished
        .recv_timeout(Duration::from_secs(2))
        .expect("once listener finishes");
    handle.join().expect("join listener");
}

#[cfg(unix)]
#[fixture]
fn scratch_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
#[rstest]
fn leftover_socket_file_is_replaced_and_removed(scratch_dir: tempfile::TempDir) {
    let path = scratch_dir.path().join("hostctl.sock");
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("leave a socket file behind");
    }
    assert!(path.exists(), "leftover socket file is present");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let listener = ControlListener::bind(&endpoint).expect("bind new listener");
    let (_, handler) = CountingHandler::new();
    let handle = listener
        .start(handler, AcceptMode::Continuous, || {})
        .expect("start listener");

    drop(std::os::unix::net::UnixStream::connect(&path).expect("connect unix client"));

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(
        !path.exists(),
        "socket file should be gone after shutdown"
    );
}

#[cfg(unix)]
#[rstest]
fn live_socket_file_is_not_taken_over(scratch_dir: tempfile::TempDir) {
    let path = scratch_dir.path().join("hostctl.sock");
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("another emulator listens");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = ControlListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ControlSocketError::SocketBusy { .. }));
}

#[cfg(unix)]
#[rstest]
fn regular_file_is_not_taken_over(scratch_dir: tempfile::TempDir) {
    let path = scratch_dir.path().join("hostctl.sock");
    std::fs::write(&path, "not a socket").expect("write placeholder");

    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path"));
    let error = ControlListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ControlSocketError::NotASocket { .. }));
    assert!(path.is_file(), "regular file must be left alone");
}

#[rstest]
fn tcp_address_reports_the_assigned_port(tcp_endpoint: SocketEndpoint) {
    let listener = ControlListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("local address");
    assert_ne!(addr.port(), 0);
    assert_eq!(listener.address(), format!("tcp://{addr}"));
}
