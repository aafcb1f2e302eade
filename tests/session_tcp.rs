//! End-to-end sessions over a loopback TCP socket.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use dqmwatch::{MonitorView, PackageSelection, SessionEnd, SessionEvent, SessionHandle, SessionState};
use dqmwatch_types::{Axis, BinStorage, HistogramPackage};
use dqmwatch_wire::protocol::server::ServerSession;
use dqmwatch_wire::protocol::UpdateHeader;
use tokio::sync::mpsc;

fn server_packages() -> Vec<HistogramPackage> {
    vec![
        HistogramPackage::builder("CDC")
            .histogram_1d("h1", "hits", BinStorage::Float, Axis::new(4, 0.0, 4.0))
            .build(),
        HistogramPackage::builder("ECL")
            .histogram_1d("energy", "E", BinStorage::Double, Axis::new(8, 0.0, 4.0))
            .build(),
    ]
}

fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn publish(server: &mut ServerSession<TcpStream>, header: UpdateHeader, bins: &[f64]) {
    let cdc = server.package_mut("CDC").unwrap();
    cdc.get_mut(0).unwrap().apply_in_range(bins).unwrap();
    server.update(header).unwrap();
}

fn next(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    events.blocking_recv().expect("session ended early")
}

#[test]
fn test_streaming_session_and_close() {
    let (listener, addr) = listen();
    let (done_tx, done_rx) = std_mpsc::channel::<()>();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut server = ServerSession::new(stream, server_packages());
        server.handshake().unwrap();
        assert_eq!(server.selected().collect::<Vec<_>>(), vec!["CDC"]);

        publish(&mut server, UpdateHeader::new(1, 1, 0), &[1.0, 2.0, 3.0, 4.0]);
        publish(&mut server, UpdateHeader::new(1, 1, 0), &[2.0, 4.0, 6.0, 8.0]);
        publish(&mut server, UpdateHeader::new(1, 2, 0), &[0.0, 0.0, 1.0, 0.0]);

        // Hold the connection open until the client has closed
        done_rx.recv().ok();
        server.frames()
    });

    let selection = PackageSelection::Only(vec!["CDC".to_string()]);
    let (handle, mut events) = SessionHandle::connect(addr.as_str(), selection, 16).unwrap();
    let mut view = MonitorView::new();

    match next(&mut events) {
        SessionEvent::PackageList(names) => assert_eq!(names, vec!["CDC", "ECL"]),
        other => panic!("expected package list, got {}", other.kind()),
    }
    match next(&mut events) {
        SessionEvent::Configured(packages) => {
            assert_eq!(packages.len(), 1);
            assert_eq!(packages[0].name(), "CDC");
            assert_eq!(packages[0].total_entries(), 0.0);
        }
        other => panic!("expected configured, got {}", other.kind()),
    }

    let first = next(&mut events);
    view.apply(&first);
    match &first {
        SessionEvent::Update { new_run, packages, .. } => {
            assert!(*new_run);
            let h1 = packages[0].by_name("h1").unwrap();
            assert_eq!(h1.tmp().unwrap().entries(), 10.0);
            assert!(h1.diff().is_none());
        }
        other => panic!("expected update, got {}", other.kind()),
    }

    let second = next(&mut events);
    view.apply(&second);
    match &second {
        SessionEvent::Update { new_run, packages, .. } => {
            assert!(!*new_run);
            let h1 = packages[0].by_name("h1").unwrap();
            assert_eq!(&h1.diff().unwrap().contents()[1..5], &[1.0, 2.0, 3.0, 4.0]);
            assert_eq!(&h1.tmp().unwrap().contents()[1..5], &[2.0, 4.0, 6.0, 8.0]);
        }
        other => panic!("expected update, got {}", other.kind()),
    }

    let third = next(&mut events);
    view.apply(&third);
    match &third {
        SessionEvent::Update { header, new_run, packages } => {
            assert_eq!(header.run, 2);
            assert!(*new_run);
            let h1 = packages[0].by_name("h1").unwrap();
            assert_eq!(h1.in_range_contents().collect::<Vec<_>>(), vec![0.0, 0.0, 1.0, 0.0]);
            assert!(h1.diff().is_none());
        }
        other => panic!("expected update, got {}", other.kind()),
    }
    assert_eq!(view.updates, 3);
    assert_eq!(view.summary().unwrap().packages[0].entries, 1.0);
    assert_eq!(handle.state(), SessionState::Streaming);

    handle.close();
    match next(&mut events) {
        SessionEvent::Reset { .. } => {}
        other => panic!("expected reset, got {}", other.kind()),
    }
    assert!(events.blocking_recv().is_none());
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(handle.dropped_updates(), 0);
    assert!(matches!(handle.join().unwrap(), SessionEnd::Closed));

    done_tx.send(()).unwrap();
    assert_eq!(server.join().unwrap(), 3);
}

#[test]
fn test_server_leaving_between_frames_is_clean() {
    let (listener, addr) = listen();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut server = ServerSession::new(stream, server_packages());
        server.handshake().unwrap();
        publish(&mut server, UpdateHeader::new(3, 7, 1), &[1.0, 0.0, 0.0, 0.0]);
    });

    let (handle, mut events) = SessionHandle::connect(addr.as_str(), PackageSelection::All, 16).unwrap();
    let mut kinds = Vec::new();
    while let Some(event) = events.blocking_recv() {
        kinds.push(event.kind());
    }
    server.join().unwrap();

    assert_eq!(kinds, vec!["package_list", "configured", "update", "reset"]);
    assert!(matches!(handle.join().unwrap(), SessionEnd::Closed));
}

#[test]
fn test_garbage_during_handshake_is_error() {
    let (listener, addr) = listen();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // Opcode 3 (update) before any list
        stream.write_all(&[0, 0, 0, 3]).unwrap();
        stream.flush().unwrap();
        stream
    });

    let (handle, mut events) = SessionHandle::connect(addr.as_str(), PackageSelection::All, 16).unwrap();
    match next(&mut events) {
        SessionEvent::Reset { reason } => assert!(reason.contains("not expected")),
        other => panic!("expected reset, got {}", other.kind()),
    }
    assert_eq!(handle.state(), SessionState::Error);
    assert!(matches!(handle.join().unwrap(), SessionEnd::Failed(_)));

    // The failed session must have closed its end of the connection
    let mut stream = server.join().unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_failed_session_closes_socket_while_handle_lives() {
    let (listener, addr) = listen();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(&[0, 0, 0, 2]).unwrap();
        stream.flush().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut buf = [0u8; 16];
        stream.read(&mut buf).unwrap()
    });

    let (handle, mut events) = SessionHandle::connect(addr.as_str(), PackageSelection::All, 16).unwrap();
    match next(&mut events) {
        SessionEvent::Reset { .. } => {}
        other => panic!("expected reset, got {}", other.kind()),
    }
    // The handle is still alive here; the peer must already see EOF.
    assert_eq!(server.join().unwrap(), 0);
    assert_eq!(handle.state(), SessionState::Error);
}
