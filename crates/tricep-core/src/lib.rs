//! Core systems for Tricep.
//!
//! This crate holds the pieces every Tricep component shares:
//!
//! - **Handler slots**: reassignable callbacks with a no-op default
//!   ([`HandlerSlot`]) or an explicit "unset" state ([`ErrorSlot`])
//! - **Lifecycle**: the `Idle -> Active -> Fatal` state machine
//! - **Logging**: `tracing` target names
//!
//! # Example
//!
//! ```
//! use tricep_core::{ErrorSlot, HandlerSlot};
//!
//! let on_connect = HandlerSlot::<()>::new();
//! on_connect.set(|()| println!("connected"));
//! on_connect.invoke(());
//!
//! // An unset error slot refuses the error.
//! let on_error = ErrorSlot::<&str>::new();
//! assert!(on_error.invoke("refused").is_err());
//! ```

pub mod logging;
pub mod slot;
mod state;

pub use slot::{Callback, ErrorSlot, HandlerSlot};
pub use state::{Lifecycle, LifecycleState};
