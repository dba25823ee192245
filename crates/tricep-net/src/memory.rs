//! In-process transport with hand-injected events.
//!
//! Nothing touches the network. Connect and listen calls are recorded, and
//! the test (or simulation) raises events itself through [`MemorySocket::emit`]
//! and [`MemoryServer::accept`] / [`MemoryServer::fail`], receiving the same
//! `Result` a real transport would see from the dispatcher.
//!
//! ```
//! use tricep_net::memory::MemorySocket;
//! use tricep_net::{Connector, SocketError, SocketEvent};
//!
//! let socket = MemorySocket::new();
//! let client = Connector::with_socket(socket.clone(), None);
//! client.connect(None, None);
//!
//! // No error handler bound: the error comes back out.
//! let raised = socket.emit(SocketEvent::Error(SocketError::Io("reset".into())));
//! assert!(raised.is_err());
//! ```

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::config::{ConnectionSettings, ListenerSettings, SocketFlags};
use crate::connector::SocketDispatcher;
use crate::error::{Result, SocketError};
use crate::listener::ServerDispatcher;
use crate::transport::{RawServer, RawSocket, SocketEvent, Transport};

#[derive(Default)]
struct SocketState {
    connects: Vec<Option<ConnectionSettings>>,
    events: Option<SocketDispatcher>,
    written: Vec<Bytes>,
    ended: bool,
}

/// A raw socket whose events are raised by hand.
///
/// Clones share state, so a test can keep a handle while a connector owns
/// another.
#[derive(Clone, Default)]
pub struct MemorySocket {
    state: Arc<Mutex<SocketState>>,
}

impl MemorySocket {
    /// Create an unconnected socket.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `connect` was called.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects.len()
    }

    /// The target passed to the most recent `connect`, if any call was made.
    pub fn last_target(&self) -> Option<Option<ConnectionSettings>> {
        self.state.lock().connects.last().cloned()
    }

    /// Raise an event on the most recent connection wiring.
    ///
    /// Returns the dispatcher's result, or [`SocketError::NotConnected`] if
    /// `connect` was never called.
    pub fn emit(&self, event: SocketEvent) -> Result<()> {
        let events = self.state.lock().events.clone();
        match events {
            Some(events) => events.dispatch(event),
            None => Err(SocketError::NotConnected),
        }
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<Bytes> {
        self.state.lock().written.clone()
    }

    /// Whether `end` was called.
    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }
}

impl RawSocket for MemorySocket {
    fn connect(&self, target: Option<&ConnectionSettings>, events: SocketDispatcher) {
        let mut state = self.state.lock();
        state.connects.push(target.cloned());
        state.events = Some(events);
        state.ended = false;
    }

    fn write(&self, data: Bytes) -> Result<()> {
        let mut state = self.state.lock();
        if state.events.is_none() {
            return Err(SocketError::NotConnected);
        }
        if state.ended {
            return Err(SocketError::Closed);
        }
        state.written.push(data);
        Ok(())
    }

    fn end(&self) {
        self.state.lock().ended = true;
    }
}

impl std::fmt::Debug for MemorySocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySocket")
            .field("connect_count", &self.connect_count())
            .finish()
    }
}

struct ServerState<C> {
    listens: Vec<ListenerSettings>,
    events: Option<ServerDispatcher<C>>,
}

/// A raw server whose connections and errors are raised by hand.
///
/// `C` is whatever stands in for an accepted connection.
pub struct MemoryServer<C = MemorySocket> {
    flags: SocketFlags,
    state: Arc<Mutex<ServerState<C>>>,
}

impl<C> Clone for MemoryServer<C> {
    fn clone(&self) -> Self {
        Self {
            flags: self.flags,
            state: self.state.clone(),
        }
    }
}

impl<C> Default for MemoryServer<C> {
    fn default() -> Self {
        Self::new(SocketFlags::default())
    }
}

impl<C> MemoryServer<C> {
    /// Create a server with the given creation flags.
    pub fn new(flags: SocketFlags) -> Self {
        Self {
            flags,
            state: Arc::new(Mutex::new(ServerState {
                listens: Vec::new(),
                events: None,
            })),
        }
    }

    /// Flags the server was created with.
    pub fn flags(&self) -> SocketFlags {
        self.flags
    }

    /// How many times `listen` was called.
    pub fn listen_count(&self) -> usize {
        self.state.lock().listens.len()
    }

    /// Settings passed to the most recent `listen`.
    pub fn last_settings(&self) -> Option<ListenerSettings> {
        self.state.lock().listens.last().cloned()
    }

    /// Simulate an accepted connection.
    pub fn accept(&self, conn: C) -> Result<()> {
        self.dispatcher()?.accepted(conn)
    }

    /// Simulate a listener-level error.
    pub fn fail(&self, err: SocketError) -> Result<()> {
        self.dispatcher()?.error(err)
    }

    fn dispatcher(&self) -> Result<ServerDispatcher<C>> {
        self.state.lock().events.clone().ok_or(SocketError::NotConnected)
    }
}

impl<C: Send + 'static> RawServer for MemoryServer<C> {
    type Connection = C;

    fn listen(&self, settings: &ListenerSettings, events: ServerDispatcher<C>) {
        let mut state = self.state.lock();
        state.listens.push(settings.clone());
        state.events = Some(events);
    }
}

impl<C> std::fmt::Debug for MemoryServer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryServer")
            .field("flags", &self.flags)
            .field("listen_count", &self.listen_count())
            .finish()
    }
}

/// Factory for memory sockets and servers that remembers what it made.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    sockets: Arc<Mutex<Vec<MemorySocket>>>,
    servers: Arc<Mutex<Vec<MemoryServer>>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently created socket.
    pub fn last_socket(&self) -> Option<MemorySocket> {
        self.sockets.lock().last().cloned()
    }

    /// The most recently created server.
    pub fn last_server(&self) -> Option<MemoryServer> {
        self.servers.lock().last().cloned()
    }
}

impl Transport for MemoryTransport {
    type Socket = MemorySocket;
    type Server = MemoryServer;

    fn create_socket(&self) -> MemorySocket {
        let socket = MemorySocket::new();
        self.sockets.lock().push(socket.clone());
        socket
    }

    fn create_server(&self, flags: SocketFlags) -> MemoryServer {
        let server = MemoryServer::new(flags);
        self.servers.lock().push(server.clone());
        server
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("sockets", &self.sockets.lock().len())
            .field("servers", &self.servers.lock().len())
            .finish()
    }
}
