//! Listening endpoint with a connect hook and an optional error hook.

use std::sync::Arc;

use tricep_core::logging::targets;
use tricep_core::{Callback, ErrorSlot, Lifecycle, LifecycleState};

use crate::config::ListenerSettings;
use crate::error::{Result, SocketError};
use crate::tcp::TcpServer;
use crate::transport::{RawServer, ServerEvent};

/// Hook invoked with each accepted connection.
pub type ConnectHook<C> = Arc<dyn Fn(C) + Send + Sync>;

/// Hook invoked with listener-level errors.
pub type ErrorHook = Callback<SocketError>;

/// A bound, accepting endpoint.
///
/// The listener starts listening as soon as it is built and lives as long as
/// its owner. Every accepted connection is handed to the `on_connect` hook.
/// Listener-level errors go to `on_error` when one was supplied; otherwise
/// they are raised out of the event source and the listener becomes
/// [`LifecycleState::Fatal`].
///
/// # Example
///
/// ```ignore
/// use tricep_net::{Connector, Listener, ListenerSettings};
///
/// let listener = Listener::bind(
///     ListenerSettings::new("0.0.0.0", 8080),
///     |socket| {
///         let peer = Connector::adopt(socket);
///         peer.on_data.set(|bytes| println!("{} bytes", bytes.len()));
///         peer.connect(None, None);
///     },
///     None,
/// );
/// ```
pub struct Listener<S: RawServer = TcpServer> {
    settings: ListenerSettings,
    server: S,
    lifecycle: Arc<Lifecycle>,
    on_connect: ConnectHook<S::Connection>,
    on_error: Arc<ErrorSlot<SocketError>>,
}

impl Listener<TcpServer> {
    /// Start a tokio TCP listener.
    pub fn bind<F>(settings: ListenerSettings, on_connect: F, on_error: Option<ErrorHook>) -> Self
    where
        F: Fn(crate::tcp::TcpSocket) + Send + Sync + 'static,
    {
        let server = TcpServer::new(settings.flags);
        Self::start(server, settings, Arc::new(on_connect), on_error)
    }
}

impl<S: RawServer> Listener<S> {
    /// Start listening on an existing raw server.
    pub fn start(
        server: S,
        settings: ListenerSettings,
        on_connect: ConnectHook<S::Connection>,
        on_error: Option<ErrorHook>,
    ) -> Self {
        let listener = Self {
            settings,
            server,
            lifecycle: Arc::new(Lifecycle::new()),
            on_connect,
            on_error: Arc::new(ErrorSlot::from_option(on_error)),
        };

        let dispatcher = ServerDispatcher {
            on_connect: listener.on_connect.clone(),
            on_error: listener.on_error.clone(),
            lifecycle: listener.lifecycle.clone(),
        };

        listener.lifecycle.activate();
        tracing::debug!(
            target: targets::LISTENER,
            addr = %listener.settings.bind_addr(),
            exclusive = listener.settings.exclusive,
            error_handler = listener.on_error.is_set(),
            "listening"
        );
        listener.server.listen(&listener.settings, dispatcher);
        listener
    }

    /// The merged settings in use.
    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    /// The underlying raw server.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// The error slot. Unset when no error hook was supplied.
    pub fn on_error(&self) -> &ErrorSlot<SocketError> {
        &self.on_error
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.get()
    }
}

impl<S: RawServer> std::fmt::Debug for Listener<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("bind_addr", &self.settings.bind_addr())
            .field("state", &self.state())
            .field("on_error", &self.on_error)
            .finish()
    }
}

/// Routes a raw server's events to a listener's hooks.
pub struct ServerDispatcher<C> {
    on_connect: ConnectHook<C>,
    on_error: Arc<ErrorSlot<SocketError>>,
    lifecycle: Arc<Lifecycle>,
}

impl<C> Clone for ServerDispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            on_connect: self.on_connect.clone(),
            on_error: self.on_error.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<C> ServerDispatcher<C> {
    /// Deliver one event.
    ///
    /// Returns `Err` carrying the undelivered error only when an error event finds
    /// no error hook; the event source should treat that as fatal.
    pub fn dispatch(&self, event: ServerEvent<C>) -> Result<()> {
        match event {
            ServerEvent::Connection(conn) => {
                tracing::debug!(target: targets::LISTENER, "accepted connection");
                (self.on_connect)(conn);
                Ok(())
            }
            ServerEvent::Error(err) => match self.on_error.invoke(err) {
                Ok(()) => {
                    tracing::warn!(target: targets::LISTENER, "listener error delivered to handler");
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(target: targets::LISTENER, error = %err, "unhandled listener error");
                    self.lifecycle.fail();
                    Err(err)
                }
            },
        }
    }

    /// Shorthand for dispatching [`ServerEvent::Connection`].
    pub fn accepted(&self, conn: C) -> Result<()> {
        self.dispatch(ServerEvent::Connection(conn))
    }

    /// Shorthand for dispatching [`ServerEvent::Error`].
    pub fn error(&self, err: SocketError) -> Result<()> {
        self.dispatch(ServerEvent::Error(err))
    }
}

impl<C> std::fmt::Debug for ServerDispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDispatcher")
            .field("on_error", &self.on_error)
            .finish()
    }
}
