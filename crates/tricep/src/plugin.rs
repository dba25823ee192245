//! Registering a listener with a host application.
//!
//! [`register`] builds a [`Listener`] from [`PluginOptions`], hands it to the
//! host through [`ListenerHost::decorate`] and then runs the completion
//! callback. Whatever the callback returns is returned from `register`, so an
//! error the callback raises reaches the caller unchanged.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tricep::memory::{MemoryServer, MemorySocket, MemoryTransport};
//! use tricep::plugin::{PluginOptions, register};
//! use tricep::{Listener, ListenerOptions};
//!
//! let transport = MemoryTransport::new();
//! let mut host: Option<Arc<Listener<MemoryServer>>> = None;
//!
//! let options = PluginOptions::new()
//!     .server(ListenerOptions::new("localhost", 8080))
//!     .on_connect(|_peer: MemorySocket| {});
//!
//! register(&mut host, &transport, options, |err| assert!(err.is_none()));
//! assert!(host.is_some());
//! ```

use std::sync::Arc;

use tricep_core::logging::targets;
use tricep_net::{
    ConnectHook, CreateOptions, ErrorHook, Listener, ListenerOptions, RawServer, SocketError,
    Transport,
};

/// Options accepted by [`register`].
///
/// `C` is the transport's accepted-connection type.
pub struct PluginOptions<C> {
    /// Raw-socket creation flags, forwarded to the server factory.
    pub create: Option<CreateOptions>,
    /// Listen address, port and exclusivity.
    pub server: Option<ListenerOptions>,
    /// Invoked once per accepted connection.
    pub on_connect: Option<ConnectHook<C>>,
    /// When present, listener errors are routed here instead of being raised.
    pub on_error: Option<ErrorHook>,
}

impl<C> Default for PluginOptions<C> {
    fn default() -> Self {
        Self {
            create: None,
            server: None,
            on_connect: None,
            on_error: None,
        }
    }
}

impl<C> PluginOptions<C> {
    /// Empty options; everything falls back to defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the creation flags.
    pub fn create(mut self, create: CreateOptions) -> Self {
        self.create = Some(create);
        self
    }

    /// Set the listen options.
    pub fn server(mut self, server: ListenerOptions) -> Self {
        self.server = Some(server);
        self
    }

    /// Set the connect hook.
    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(C) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    /// Set the listener error hook.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(SocketError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

impl<C> Clone for PluginOptions<C> {
    fn clone(&self) -> Self {
        Self {
            create: self.create,
            server: self.server.clone(),
            on_connect: self.on_connect.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<C> std::fmt::Debug for PluginOptions<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginOptions")
            .field("create", &self.create)
            .field("server", &self.server)
            .field("on_connect", &self.on_connect.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Something that can be given a reference to a running listener.
pub trait ListenerHost<S: RawServer> {
    /// Take a reference to the constructed listener.
    fn decorate(&mut self, listener: Arc<Listener<S>>);
}

/// The simplest host: a slot holding the most recently registered listener.
impl<S: RawServer> ListenerHost<S> for Option<Arc<Listener<S>>> {
    fn decorate(&mut self, listener: Arc<Listener<S>>) {
        *self = Some(listener);
    }
}

/// Build a listener on `transport`, expose it on `host`, then run `done`.
///
/// Absent `create` and `server` options (or absent fields within them) fall
/// back to defaults. Registration itself cannot fail: `done` always receives
/// `None`. Its return value is passed through.
pub fn register<T, H, F, R>(
    host: &mut H,
    transport: &T,
    options: PluginOptions<<T::Server as RawServer>::Connection>,
    done: F,
) -> R
where
    T: Transport,
    H: ListenerHost<T::Server> + ?Sized,
    F: FnOnce(Option<SocketError>) -> R,
{
    let PluginOptions {
        create,
        server,
        on_connect,
        on_error,
    } = options;

    let flags = create.unwrap_or_default().resolve();
    let settings = server.unwrap_or_default().resolve(flags);
    let on_connect = on_connect
        .unwrap_or_else(|| Arc::new(drop_connection::<<T::Server as RawServer>::Connection>));

    let raw = transport.create_server(flags);
    let listener = Listener::start(raw, settings, on_connect, on_error);
    tracing::debug!(
        target: targets::PLUGIN,
        addr = %listener.settings().bind_addr(),
        "registered listener"
    );

    host.decorate(Arc::new(listener));
    done(None)
}

fn drop_connection<C>(_conn: C) {
    tracing::debug!(target: targets::PLUGIN, "no connect hook registered, dropping connection");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_empty() {
        let options = PluginOptions::<()>::new();
        assert!(options.create.is_none());
        assert!(options.server.is_none());
        assert!(options.on_connect.is_none());
        assert!(options.on_error.is_none());
    }

    #[test]
    fn test_builder_sets_fields() {
        let options = PluginOptions::<()>::new()
            .create(CreateOptions {
                allow_half_open: Some(true),
                pause_on_connect: None,
            })
            .server(ListenerOptions::new("localhost", 8080))
            .on_connect(|()| {})
            .on_error(|_| {});

        let flags = options.create.map(CreateOptions::resolve);
        assert_eq!(flags.map(|f| f.allow_half_open), Some(true));
        assert_eq!(options.server.as_ref().and_then(|s| s.port), Some(8080));
        assert!(options.on_connect.is_some());
        assert!(options.on_error.is_some());
    }

    #[test]
    fn test_debug_hides_hooks() {
        let options = PluginOptions::<()>::new().on_error(|_| {});
        let debug = format!("{:?}", options);
        assert!(debug.contains("on_error: true"));
        assert!(debug.contains("on_connect: false"));
    }
}
