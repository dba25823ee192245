//! Tests for the listener's connect and error hooks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tricep_core::LifecycleState;
use tricep_net::memory::{MemoryServer, MemorySocket};
use tricep_net::{
    Connector, ErrorHook, Listener, ListenerOptions, ListenerSettings, SocketError, SocketEvent,
    SocketFlags,
};

fn counting_listener(
    on_error: Option<ErrorHook>,
) -> (Listener<MemoryServer<u32>>, MemoryServer<u32>, Arc<Mutex<Vec<u32>>>) {
    let server = MemoryServer::new(SocketFlags::default());
    let accepted: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let accepted_clone = accepted.clone();

    let listener = Listener::start(
        server.clone(),
        ListenerSettings::new("localhost", 8080),
        Arc::new(move |conn: u32| accepted_clone.lock().push(conn)),
        on_error,
    );
    (listener, server, accepted)
}

#[test]
fn test_listener_listens_once_with_settings() {
    let (listener, server, _) = counting_listener(None);

    assert_eq!(server.listen_count(), 1);
    assert_eq!(server.last_settings(), Some(ListenerSettings::new("localhost", 8080)));
    assert_eq!(listener.settings().bind_addr(), "localhost:8080");
    assert_eq!(listener.state(), LifecycleState::Active);
    assert!(!listener.on_error().is_set());
}

#[test]
fn test_each_accept_invokes_hook() {
    let (_listener, server, accepted) = counting_listener(None);

    server.accept(1).unwrap();
    server.accept(2).unwrap();
    server.accept(3).unwrap();

    assert_eq!(*accepted.lock(), vec![1, 2, 3]);
}

#[test]
fn test_listener_error_with_hook() {
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_clone = errors.clone();
    let hook: ErrorHook = Arc::new(move |_: SocketError| {
        errors_clone.fetch_add(1, Ordering::SeqCst);
    });

    let (listener, server, _) = counting_listener(Some(hook));

    assert!(server.fail(SocketError::bind("localhost:8080", "address in use")).is_ok());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(listener.state(), LifecycleState::Active);

    // Still accepting after a handled error.
    assert!(server.accept(7).is_ok());
}

#[test]
fn test_listener_error_without_hook_is_raised() {
    let (listener, server, _) = counting_listener(None);

    let err = SocketError::Accept("too many open files".into());
    assert_eq!(server.fail(err.clone()), Err(err));
    assert_eq!(listener.state(), LifecycleState::Fatal);
}

#[test]
fn test_options_resolve_per_field() {
    let flags = SocketFlags {
        allow_half_open: true,
        pause_on_connect: false,
    };
    let settings = ListenerOptions {
        port: Some(4000),
        ..Default::default()
    }
    .resolve(flags);

    let server = MemoryServer::<u32>::new(flags);
    let listener = Listener::start(server.clone(), settings, Arc::new(|_: u32| {}), None);

    let used = server.last_settings().unwrap();
    assert_eq!(used.port, 4000);
    assert_eq!(used.host, "0.0.0.0");
    assert!(!used.exclusive);
    assert_eq!(used.backlog, 511);
    assert!(used.flags.allow_half_open);
    assert_eq!(listener.server().flags(), flags);
}

#[test]
fn test_accepted_socket_adopted_into_connector() {
    let server = MemoryServer::<MemorySocket>::default();
    let peers: Arc<Mutex<Vec<Connector<MemorySocket>>>> = Arc::new(Mutex::new(Vec::new()));
    let peers_clone = peers.clone();

    let _listener = Listener::start(
        server.clone(),
        ListenerSettings::default(),
        Arc::new(move |socket: MemorySocket| {
            let peer = Connector::adopt(socket);
            peer.connect(None, None);
            peers_clone.lock().push(peer);
        }),
        None,
    );

    let socket = MemorySocket::new();
    server.accept(socket.clone()).unwrap();
    assert_eq!(peers.lock().len(), 1);

    let received = Arc::new(AtomicUsize::new(0));
    let received_clone = received.clone();
    peers.lock()[0].on_data.set(move |data| {
        received_clone.fetch_add(data.len(), Ordering::SeqCst);
    });

    socket.emit(SocketEvent::Connect).unwrap();
    socket.emit(SocketEvent::Data("ping".into())).unwrap();
    assert_eq!(received.load(Ordering::SeqCst), 4);
}

#[test]
fn test_accept_before_listen() {
    let server = MemoryServer::<u32>::default();
    assert_eq!(server.accept(1), Err(SocketError::NotConnected));
}
