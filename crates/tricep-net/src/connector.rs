//! Outbound connection with reassignable handler slots.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tricep_core::logging::targets;
use tricep_core::{ErrorSlot, HandlerSlot, Lifecycle, LifecycleState};

use crate::config::{ConnectionOptions, ConnectionSettings};
use crate::error::{Result, SocketError};
use crate::tcp::TcpSocket;
use crate::transport::{RawSocket, SocketEvent};

/// One-shot callback passed to [`Connector::connect`], run after `on_connect`.
pub type ConnectListener = Box<dyn FnOnce() + Send + 'static>;

/// A single connection session with four handler slots.
///
/// `on_data`, `on_connect` and `on_disconnect` start out as no-ops.
/// `on_error` starts out *unset*: an error arriving while it is unset is
/// raised out of the dispatch call instead of being delivered, and the
/// connector becomes [`LifecycleState::Fatal`].
///
/// Slots are read when an event fires, so handlers may be bound or replaced
/// at any time, including after [`connect`](Self::connect).
///
/// # Example
///
/// ```ignore
/// use tricep_net::{ConnectionOptions, Connector};
///
/// let client = Connector::new(Some(ConnectionOptions::new("127.0.0.1", 8080)));
///
/// client.on_connect.set(|()| println!("connected"));
/// client.on_data.set(|bytes| println!("received {} bytes", bytes.len()));
/// client.on_error.set(|err| eprintln!("socket error: {err}"));
///
/// client.connect(None, None);
/// ```
pub struct Connector<S: RawSocket = TcpSocket> {
    socket: S,
    settings: Option<ConnectionSettings>,
    lifecycle: Arc<Lifecycle>,

    /// Invoked with every received chunk.
    pub on_data: Arc<HandlerSlot<Bytes>>,
    /// Invoked once the connection is established.
    pub on_connect: Arc<HandlerSlot<()>>,
    /// Invoked when the connection closes.
    pub on_disconnect: Arc<HandlerSlot<()>>,
    /// Invoked with transport errors. Unset means errors are fatal.
    pub on_error: Arc<ErrorSlot<SocketError>>,
}

impl Connector<TcpSocket> {
    /// Create a connector backed by a tokio TCP socket.
    ///
    /// See [`with_socket`](Self::with_socket) for how `settings` is stored.
    pub fn new(settings: Option<ConnectionOptions>) -> Self {
        Self::with_socket(TcpSocket::new(), settings)
    }
}

impl<S: RawSocket> Connector<S> {
    /// Create a connector around an existing raw socket.
    ///
    /// `None` leaves the stored settings unset. Options with any field
    /// missing are replaced wholesale by [`ConnectionSettings::default`].
    pub fn with_socket(socket: S, settings: Option<ConnectionOptions>) -> Self {
        Self {
            socket,
            settings: settings.map(resolve_logged),
            lifecycle: Arc::new(Lifecycle::new()),
            on_data: Arc::new(HandlerSlot::new()),
            on_connect: Arc::new(HandlerSlot::new()),
            on_disconnect: Arc::new(HandlerSlot::new()),
            on_error: Arc::new(ErrorSlot::new()),
        }
    }

    /// Wrap a connection a listener has already accepted.
    ///
    /// Call [`connect`](Self::connect) afterwards to wire the handlers; the
    /// connect event then fires straight away since the stream is live.
    pub fn adopt(socket: S) -> Self {
        Self::with_socket(socket, None)
    }

    /// Issue the connect and wire the socket's events to the handler slots.
    ///
    /// Destination precedence: `settings` (resolved all-or-nothing), then the
    /// settings stored at construction, then the transport's defaults. The
    /// optional `listener` runs after `on_connect` when the connection is up.
    ///
    /// Returns immediately; never fails. Failures arrive as error events.
    pub fn connect(&self, settings: Option<ConnectionOptions>, listener: Option<ConnectListener>) {
        let target = settings.map(resolve_logged).or_else(|| self.settings.clone());

        let dispatcher = SocketDispatcher::new(
            self.on_data.clone(),
            self.on_connect.clone(),
            self.on_disconnect.clone(),
            self.on_error.clone(),
            listener,
            self.lifecycle.clone(),
        );

        let state = self.lifecycle.activate();
        tracing::debug!(
            target: targets::CONNECTOR,
            target_addr = ?target.as_ref().map(ConnectionSettings::address),
            %state,
            "issuing connect"
        );
        self.socket.connect(target.as_ref(), dispatcher);
    }

    /// Send bytes to the peer.
    pub fn write(&self, data: impl Into<Bytes>) -> Result<()> {
        self.socket.write(data.into())
    }

    /// Close the write side.
    pub fn end(&self) {
        self.socket.end();
    }

    /// Settings recorded at construction, if any.
    pub fn settings(&self) -> Option<&ConnectionSettings> {
        self.settings.as_ref()
    }

    /// The underlying raw socket.
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.get()
    }
}

impl<S: RawSocket + std::fmt::Debug> std::fmt::Debug for Connector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("socket", &self.socket)
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("on_error", &self.on_error)
            .finish()
    }
}

fn resolve_logged(options: ConnectionOptions) -> ConnectionSettings {
    if !options.is_complete() {
        tracing::debug!(
            target: targets::CONNECTOR,
            port = ?options.port,
            host = ?options.host,
            "incomplete connection settings, substituting defaults"
        );
    }
    options.resolve()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pending,
    Connected,
    Closed,
}

struct DispatchInner {
    on_data: Arc<HandlerSlot<Bytes>>,
    on_connect: Arc<HandlerSlot<()>>,
    on_disconnect: Arc<HandlerSlot<()>>,
    on_error: Arc<ErrorSlot<SocketError>>,
    listener: Mutex<Option<ConnectListener>>,
    phase: Mutex<Phase>,
    lifecycle: Arc<Lifecycle>,
}

/// Routes one connection's raw events to a connector's handler slots.
///
/// Created by every [`Connector::connect`] call and handed to the raw
/// socket. Cheap to clone. Enforces the per-connection ordering: `Connect`
/// is delivered at most once, and nothing but errors is delivered after
/// `Close`.
#[derive(Clone)]
pub struct SocketDispatcher {
    inner: Arc<DispatchInner>,
}

impl SocketDispatcher {
    fn new(
        on_data: Arc<HandlerSlot<Bytes>>,
        on_connect: Arc<HandlerSlot<()>>,
        on_disconnect: Arc<HandlerSlot<()>>,
        on_error: Arc<ErrorSlot<SocketError>>,
        listener: Option<ConnectListener>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                on_data,
                on_connect,
                on_disconnect,
                on_error,
                listener: Mutex::new(listener),
                phase: Mutex::new(Phase::Pending),
                lifecycle,
            }),
        }
    }

    /// Deliver one event.
    ///
    /// Returns `Err` carrying the undelivered error only when an error event finds
    /// `on_error` unset; the event source should treat that as fatal.
    pub fn dispatch(&self, event: SocketEvent) -> Result<()> {
        let inner = &self.inner;
        match event {
            SocketEvent::Connect => {
                {
                    let mut phase = inner.phase.lock();
                    if *phase != Phase::Pending {
                        tracing::trace!(target: targets::CONNECTOR, phase = ?*phase, "dropping repeated connect");
                        return Ok(());
                    }
                    *phase = Phase::Connected;
                }
                tracing::debug!(target: targets::CONNECTOR, "connected");
                inner.on_connect.invoke(());
                let listener = inner.listener.lock().take();
                if let Some(listener) = listener {
                    listener();
                }
            }
            SocketEvent::Data(payload) => {
                if *inner.phase.lock() == Phase::Closed {
                    tracing::trace!(target: targets::CONNECTOR, len = payload.len(), "dropping data after close");
                    return Ok(());
                }
                tracing::trace!(target: targets::CONNECTOR, len = payload.len(), "data");
                inner.on_data.invoke(payload);
            }
            SocketEvent::Close => {
                {
                    let mut phase = inner.phase.lock();
                    if *phase == Phase::Closed {
                        return Ok(());
                    }
                    *phase = Phase::Closed;
                }
                tracing::debug!(target: targets::CONNECTOR, "disconnected");
                inner.on_disconnect.invoke(());
            }
            SocketEvent::Error(err) => {
                if let Err(err) = inner.on_error.invoke(err) {
                    tracing::error!(target: targets::CONNECTOR, error = %err, "unhandled socket error");
                    inner.lifecycle.fail();
                    return Err(err);
                }
                tracing::warn!(target: targets::CONNECTOR, "socket error delivered to handler");
            }
        }
        Ok(())
    }

    /// Shorthand for dispatching [`SocketEvent::Connect`].
    pub fn connected(&self) -> Result<()> {
        self.dispatch(SocketEvent::Connect)
    }

    /// Shorthand for dispatching [`SocketEvent::Data`].
    pub fn data(&self, payload: impl Into<Bytes>) -> Result<()> {
        self.dispatch(SocketEvent::Data(payload.into()))
    }

    /// Shorthand for dispatching [`SocketEvent::Close`].
    pub fn closed(&self) -> Result<()> {
        self.dispatch(SocketEvent::Close)
    }

    /// Shorthand for dispatching [`SocketEvent::Error`].
    pub fn error(&self, err: SocketError) -> Result<()> {
        self.dispatch(SocketEvent::Error(err))
    }
}

impl std::fmt::Debug for SocketDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketDispatcher")
            .field("phase", &*self.inner.phase.lock())
            .finish()
    }
}
