//! Settings for connectors and listeners.
//!
//! Each component comes in two shapes: an *options* struct as the caller
//! supplies it (every field optional, `null` in JSON/TOML meaning "use the
//! default"), and a resolved *settings* struct the component actually uses.
//!
//! The two components resolve their options differently:
//!
//! - [`ConnectionOptions::resolve`] is all-or-nothing. If any field is
//!   missing, the whole object is replaced by [`ConnectionSettings::default`];
//!   fields are never merged one by one.
//! - [`ListenerOptions::resolve`] and [`CreateOptions::resolve`] fall back per
//!   field.

use serde::{Deserialize, Serialize};

/// Port used when no connection or listen port is given.
pub const DEFAULT_PORT: u16 = 9876;
/// Host a connector dials by default.
pub const DEFAULT_HOST: &str = "localhost";
/// Address a listener binds by default.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
/// Pending-connection queue length used by default.
pub const DEFAULT_BACKLOG: u32 = 511;

/// Where a connector connects to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Remote port.
    pub port: u16,
    /// Remote address or hostname.
    pub host: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Create connection settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            port,
            host: host.into(),
        }
    }

    /// Get the address string (host:port).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection settings as supplied by a caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Remote port.
    pub port: Option<u16>,
    /// Remote address or hostname.
    pub host: Option<String>,
}

impl ConnectionOptions {
    /// Create fully-populated options.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            port: Some(port),
            host: Some(host.into()),
        }
    }

    /// Whether every required field is present.
    pub fn is_complete(&self) -> bool {
        self.port.is_some() && self.host.is_some()
    }

    /// Resolve into usable settings.
    ///
    /// Both fields present yields exactly those values. Anything less yields
    /// [`ConnectionSettings::default`] in its entirety, even when one of the
    /// fields was supplied.
    ///
    /// Silent; callers log the substitution under their own target.
    pub fn resolve(self) -> ConnectionSettings {
        match (self.port, self.host) {
            (Some(port), Some(host)) => ConnectionSettings { port, host },
            _ => ConnectionSettings::default(),
        }
    }
}

impl From<ConnectionSettings> for ConnectionOptions {
    fn from(settings: ConnectionSettings) -> Self {
        Self {
            port: Some(settings.port),
            host: Some(settings.host),
        }
    }
}

/// Per-connection behavior flags applied by a server to every socket it accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketFlags {
    /// Keep the write side open after the peer ends its side.
    ///
    /// When `false` the write side is shut down as soon as the peer's end of
    /// stream is read.
    pub allow_half_open: bool,
    /// Hold accepted sockets paused: no data is read until resumed.
    pub pause_on_connect: bool,
}

/// Raw-socket creation flags as supplied by a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    /// See [`SocketFlags::allow_half_open`].
    pub allow_half_open: Option<bool>,
    /// See [`SocketFlags::pause_on_connect`].
    pub pause_on_connect: Option<bool>,
}

impl CreateOptions {
    /// Resolve field by field.
    pub fn resolve(self) -> SocketFlags {
        let defaults = SocketFlags::default();
        SocketFlags {
            allow_half_open: self.allow_half_open.unwrap_or(defaults.allow_half_open),
            pause_on_connect: self.pause_on_connect.unwrap_or(defaults.pause_on_connect),
        }
    }
}

/// Configuration for a listening endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSettings {
    /// Port to listen on. `0` asks the system for a free port.
    pub port: u16,
    /// Address to bind.
    pub host: String,
    /// Do not share the listening handle with sibling worker processes.
    ///
    /// The tokio transport never shares its port: a second listener on a port
    /// already in use fails to bind either way.
    pub exclusive: bool,
    /// Pending-connection queue length.
    pub backlog: u32,
    /// Flags applied to accepted sockets.
    pub flags: SocketFlags,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_LISTEN_HOST.to_string(),
            exclusive: false,
            backlog: DEFAULT_BACKLOG,
            flags: SocketFlags::default(),
        }
    }
}

impl ListenerSettings {
    /// Create listener settings for an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            port,
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set port exclusivity.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Set the connection backlog size.
    pub fn backlog(mut self, size: u32) -> Self {
        self.backlog = size;
        self
    }

    /// Set the flags applied to accepted sockets.
    pub fn flags(mut self, flags: SocketFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Keep accepted sockets writable after the peer ends.
    pub fn allow_half_open(mut self, enabled: bool) -> Self {
        self.flags.allow_half_open = enabled;
        self
    }

    /// Hold accepted sockets paused until resumed.
    pub fn pause_on_connect(mut self, enabled: bool) -> Self {
        self.flags.pause_on_connect = enabled;
        self
    }

    /// Get the bind address string (host:port).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Listen options as supplied by a caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerOptions {
    /// Port to listen on.
    pub port: Option<u16>,
    /// Address to bind.
    pub host: Option<String>,
    /// See [`ListenerSettings::exclusive`].
    pub exclusive: Option<bool>,
    /// Pending-connection queue length.
    pub backlog: Option<u32>,
}

impl ListenerOptions {
    /// Create options for an address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            port: Some(port),
            host: Some(host.into()),
            ..Default::default()
        }
    }

    /// Resolve field by field, attaching the given socket flags.
    pub fn resolve(self, flags: SocketFlags) -> ListenerSettings {
        let defaults = ListenerSettings::default();
        ListenerSettings {
            port: self.port.unwrap_or(defaults.port),
            host: self.host.unwrap_or(defaults.host),
            exclusive: self.exclusive.unwrap_or(defaults.exclusive),
            backlog: self.backlog.unwrap_or(defaults.backlog),
            flags,
        }
    }
}
