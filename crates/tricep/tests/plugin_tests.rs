//! Tests for listener registration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use tricep::memory::{MemoryServer, MemorySocket, MemoryTransport};
use tricep::plugin::{ListenerHost, PluginOptions, register};
use tricep::{
    ConnectionOptions, Connector, CreateOptions, LifecycleState, Listener, ListenerOptions,
    ListenerSettings, SocketError, SocketFlags, TcpServer, TcpTransport,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Register on a fresh memory transport and return what the host received.
fn register_with(
    options: PluginOptions<MemorySocket>,
) -> (MemoryTransport, Option<Arc<Listener<MemoryServer>>>) {
    init_tracing();
    let transport = MemoryTransport::new();
    let mut host: Option<Arc<Listener<MemoryServer>>> = None;

    let err = register(&mut host, &transport, options, |err| err);
    assert!(err.is_none());

    (transport, host)
}

#[test]
fn test_register_with_defaults() {
    let (transport, host) = register_with(PluginOptions::new());

    assert!(host.is_some());
    let server = transport.last_server().unwrap();
    assert_eq!(server.listen_count(), 1);
    assert_eq!(server.last_settings(), Some(ListenerSettings::default()));
    assert_eq!(server.flags(), SocketFlags::default());
}

#[test]
fn test_register_with_empty_create_options() {
    let (transport, host) = register_with(PluginOptions::new().create(CreateOptions::default()));

    assert!(host.is_some());
    assert_eq!(transport.last_server().unwrap().flags(), SocketFlags::default());
}

#[test]
fn test_register_with_null_create_fields() {
    let create: CreateOptions =
        serde_json::from_str(r#"{ "allow_half_open": null, "pause_on_connect": null }"#).unwrap();
    let (transport, host) = register_with(PluginOptions::new().create(create));

    assert!(host.is_some());
    assert_eq!(transport.last_server().unwrap().flags(), SocketFlags::default());
}

#[test]
fn test_register_with_create_options() {
    let create = CreateOptions {
        allow_half_open: Some(true),
        pause_on_connect: Some(true),
    };
    let (transport, host) = register_with(PluginOptions::new().create(create));

    let expected = SocketFlags {
        allow_half_open: true,
        pause_on_connect: true,
    };
    let server = transport.last_server().unwrap();
    assert_eq!(server.flags(), expected);
    assert_eq!(server.last_settings().map(|s| s.flags), Some(expected));
    assert_eq!(host.unwrap().settings().flags, expected);
}

#[test]
fn test_register_with_empty_server_options() {
    let (transport, host) = register_with(PluginOptions::new().server(ListenerOptions::default()));

    assert!(host.is_some());
    assert_eq!(
        transport.last_server().unwrap().last_settings(),
        Some(ListenerSettings::default())
    );
}

#[test]
fn test_register_with_null_server_fields() {
    let server: ListenerOptions =
        serde_json::from_str(r#"{ "port": null, "host": null, "exclusive": null }"#).unwrap();
    let (transport, host) = register_with(PluginOptions::new().server(server));

    assert!(host.is_some());
    assert_eq!(
        transport.last_server().unwrap().last_settings(),
        Some(ListenerSettings::default())
    );
}

#[test]
fn test_register_with_server_options() {
    let server = ListenerOptions {
        exclusive: Some(true),
        ..ListenerOptions::new("localhost", 8080)
    };
    let (transport, _) = register_with(PluginOptions::new().server(server));

    let settings = transport.last_server().unwrap().last_settings().unwrap();
    assert_eq!(settings.bind_addr(), "localhost:8080");
    assert!(settings.exclusive);
}

#[test]
fn test_register_without_connect_hook_drops_connections() {
    let (transport, host) = register_with(PluginOptions::new());

    assert!(transport.last_server().unwrap().accept(MemorySocket::new()).is_ok());
    assert_eq!(host.unwrap().state(), LifecycleState::Active);
}

#[test]
fn test_register_with_hooks() {
    let (transport, host) = register_with(
        PluginOptions::new()
            .on_connect(|_| {})
            .on_error(|_| {}),
    );

    assert!(transport.last_server().is_some());
    assert!(host.unwrap().on_error().is_set());
}

#[test]
fn test_fake_client_connection() {
    init_tracing();
    let transport = MemoryTransport::new();
    let mut host: Option<Arc<Listener<MemoryServer>>> = None;

    let peers = Arc::new(AtomicUsize::new(0));
    let peers_clone = peers.clone();
    let options = PluginOptions::new()
        .server(ListenerOptions::new("localhost", 8080))
        .on_connect(move |socket: MemorySocket| {
            peers_clone.fetch_add(1, Ordering::SeqCst);
            Connector::adopt(socket).connect(None, None);
        });

    let placeholder = MemorySocket::new();
    let accepted = register(&mut host, &transport, options, |err| {
        assert!(err.is_none());
        let server = transport.last_server().unwrap();
        server.accept(placeholder.clone())
    });

    assert!(accepted.is_ok());
    assert_eq!(peers.load(Ordering::SeqCst), 1);
    // The hook received the very connection that was accepted.
    assert_eq!(placeholder.connect_count(), 1);
    assert!(host.is_some());
}

#[test]
fn test_listener_error_routed_to_hook() {
    init_tracing();
    let transport = MemoryTransport::new();
    let mut host: Option<Arc<Listener<MemoryServer>>> = None;

    let seen = Arc::new(AtomicBool::new(false));
    let seen_clone = seen.clone();
    let options = PluginOptions::new()
        .server(ListenerOptions::new("localhost", 8080))
        .on_error(move |_| seen_clone.store(true, Ordering::SeqCst));

    let outcome = register(&mut host, &transport, options, |err| {
        assert!(err.is_none());
        let server = transport.last_server().unwrap();
        server.fail(SocketError::Accept("boom".into()))
    });

    assert!(outcome.is_ok());
    assert!(seen.load(Ordering::SeqCst));

    let listener = host.unwrap();
    assert!(listener.on_error().is_set());
    assert_eq!(listener.state(), LifecycleState::Active);
}

#[test]
fn test_listener_error_raised_through_register() {
    init_tracing();
    let transport = MemoryTransport::new();
    let mut host: Option<Arc<Listener<MemoryServer>>> = None;

    let options = PluginOptions::new().server(ListenerOptions::new("localhost", 8080));

    let outcome = register(&mut host, &transport, options, |err| {
        assert!(err.is_none());
        let server = transport.last_server().unwrap();
        server.fail(SocketError::Accept("boom".into()))
    });

    assert_eq!(outcome, Err(SocketError::Accept("boom".into())));
    assert_eq!(host.unwrap().state(), LifecycleState::Fatal);
}

#[derive(Default)]
struct App {
    tricep: Option<Arc<Listener<MemoryServer>>>,
    registrations: usize,
}

impl ListenerHost<MemoryServer> for App {
    fn decorate(&mut self, listener: Arc<Listener<MemoryServer>>) {
        self.tricep = Some(listener);
        self.registrations += 1;
    }
}

#[test]
fn test_custom_host() {
    let transport = MemoryTransport::new();
    let mut app = App::default();

    register(&mut app, &transport, PluginOptions::new(), |_| ());
    register(&mut app, &transport, PluginOptions::new(), |_| ());

    assert_eq!(app.registrations, 2);
    assert!(app.tricep.is_some());
}

#[tokio::test]
async fn test_register_over_tcp() {
    init_tracing();
    let mut host: Option<Arc<Listener<TcpServer>>> = None;

    let accepted = Arc::new(AtomicUsize::new(0));
    let accepted_clone = accepted.clone();
    let options = PluginOptions::new()
        .server(ListenerOptions::new("127.0.0.1", 0))
        .on_connect(move |_socket| {
            accepted_clone.fetch_add(1, Ordering::SeqCst);
        });

    register(&mut host, &TcpTransport, options, |err| assert!(err.is_none()));
    let listener = host.expect("registration should expose the listener");

    let mut port = None;
    for _ in 0..100 {
        port = listener.server().local_addr().map(|addr| addr.port());
        if port.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let port = port.expect("listener should bind");

    let client = Connector::new(Some(ConnectionOptions::new("127.0.0.1", port)));
    let errors: Arc<Mutex<Vec<SocketError>>> = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = errors.clone();
    client.on_error.set(move |err| errors_clone.lock().push(err));
    client.connect(None, None);

    for _ in 0..100 {
        if accepted.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert!(errors.lock().is_empty());
}
