//! File-based configuration.
//!
//! A [`TricepConfig`] collects the three option groups an application
//! usually wants to keep outside the code: raw-socket creation flags, the
//! listen address, and the address a client dials. Every field may be
//! omitted or `null`; the usual resolution rules apply afterwards.
//!
//! ```toml
//! [create]
//! allow_half_open = true
//!
//! [server]
//! host = "127.0.0.1"
//! port = 9000
//! exclusive = true
//!
//! [client]
//! host = "127.0.0.1"
//! port = 9000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tricep_core::logging::targets;
use tricep_net::{
    ConnectionOptions, ConnectionSettings, CreateOptions, ListenerOptions, ListenerSettings,
};

use crate::error::{ConfigError, ConfigResult};
use crate::plugin::PluginOptions;

/// Serializable Tricep configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TricepConfig {
    /// Raw-socket creation flags.
    pub create: Option<CreateOptions>,
    /// Listen options.
    pub server: Option<ListenerOptions>,
    /// Where a client connects to.
    pub client: Option<ConnectionOptions>,
}

impl TricepConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a configuration file.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        tracing::debug!(target: targets::CONFIG, path = %path.display(), is_json, "loading config");
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Plugin options carrying this configuration's `create` and `server`
    /// groups. Hooks are left for the caller to attach.
    pub fn plugin_options<C>(&self) -> PluginOptions<C> {
        PluginOptions {
            create: self.create,
            server: self.server.clone(),
            on_connect: None,
            on_error: None,
        }
    }

    /// The listener settings `register` would produce from this configuration.
    pub fn listener_settings(&self) -> ListenerSettings {
        let flags = self.create.unwrap_or_default().resolve();
        self.server.clone().unwrap_or_default().resolve(flags)
    }

    /// Client options to pass to `Connector::new`.
    pub fn client_options(&self) -> Option<ConnectionOptions> {
        self.client.clone()
    }

    /// The address a connector built from this configuration would store.
    pub fn client_settings(&self) -> Option<ConnectionSettings> {
        let client = self.client.clone()?;
        if !client.is_complete() {
            tracing::debug!(
                target: targets::CONFIG,
                port = ?client.port,
                host = ?client.host,
                "incomplete client settings, substituting defaults"
            );
        }
        Some(client.resolve())
    }
}
