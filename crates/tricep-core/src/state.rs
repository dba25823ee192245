//! Lifecycle state shared by connectors and listeners.

use parking_lot::Mutex;

/// Where a connector or listener is in its lifecycle.
///
/// ```text
/// IDLE --connect/listen--> ACTIVE --unhandled error--> FATAL
/// ```
///
/// There is no way back to `Idle`; reconnecting means calling `connect`
/// again or building a fresh instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, nothing issued to the transport yet.
    #[default]
    Idle,
    /// A connect or listen call has been issued.
    Active,
    /// An error reached an unset error slot and was raised.
    Fatal,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Thread-safe holder for a [`LifecycleState`] enforcing its transitions.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Lifecycle {
    /// Start in `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// `Idle -> Active`. A fatal instance stays fatal.
    pub fn activate(&self) -> LifecycleState {
        let mut state = self.state.lock();
        if *state == LifecycleState::Idle {
            *state = LifecycleState::Active;
        }
        *state
    }

    /// Enter `Fatal`. Terminal.
    pub fn fail(&self) {
        *self.state.lock() = LifecycleState::Fatal;
    }

    /// Whether the instance has failed fatally.
    pub fn is_fatal(&self) -> bool {
        self.get() == LifecycleState::Fatal
    }
}
