//! MCP lifecycle state machine.
//!
//! The server moves strictly forward through
//! UNINITIALIZED → INITIALIZING → INITIALIZED → SHUTDOWN; back-transitions
//! are rejected. State reads happen on every router entry; writes happen
//! only in `initialize`, `notifications/initialized`, and `shutdown`, and
//! are serialized through the lock so readers always observe a published
//! value.

use crate::error::ServerError;
use crate::messages;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

/// Lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Initializing,
    Initialized,
    Shutdown,
}

impl ServerState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The lifecycle cell plus the write-once client capability slot.
#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<ServerState>,
    client_capabilities: Mutex<Option<Value>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ServerState::Uninitialized),
            client_capabilities: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    /// Check whether `method` is allowed in the current state.
    ///
    /// `ping` is allowed in every state except SHUTDOWN; `initialize` only
    /// before any handshake; `notifications/initialized` only mid-handshake;
    /// everything else only once initialized.
    pub fn permits(&self, method: &str) -> Result<(), ServerError> {
        let state = self.state();

        if state == ServerState::Shutdown {
            return Err(ServerError::lifecycle(messages::error_message(
                "shuttingDown",
                &[],
            )));
        }

        match method {
            "ping" => Ok(()),
            "initialize" => match state {
                ServerState::Uninitialized => Ok(()),
                _ => Err(ServerError::lifecycle(messages::error_message(
                    "alreadyInitialized",
                    &[],
                ))),
            },
            "notifications/initialized" => match state {
                ServerState::Initializing => Ok(()),
                _ => Err(ServerError::lifecycle(messages::error_message(
                    "notInitialized",
                    &[],
                ))),
            },
            _ => match state {
                ServerState::Initialized => Ok(()),
                _ => Err(ServerError::lifecycle(messages::error_message(
                    "notInitialized",
                    &[],
                ))),
            },
        }
    }

    /// UNINITIALIZED → INITIALIZING. Atomic check-and-set.
    pub fn begin_initialize(&self) -> Result<(), ServerError> {
        let mut state = self.state.write();
        if *state != ServerState::Uninitialized {
            return Err(ServerError::lifecycle(messages::error_message(
                "alreadyInitialized",
                &[],
            )));
        }
        *state = ServerState::Initializing;
        Ok(())
    }

    /// INITIALIZING → INITIALIZED. Atomic check-and-set.
    pub fn complete_initialize(&self) -> Result<(), ServerError> {
        let mut state = self.state.write();
        if *state != ServerState::Initializing {
            return Err(ServerError::lifecycle(messages::error_message(
                "notInitialized",
                &[],
            )));
        }
        *state = ServerState::Initialized;
        Ok(())
    }

    /// Any state → SHUTDOWN. Terminal and idempotent.
    pub fn shutdown(&self) {
        *self.state.write() = ServerState::Shutdown;
    }

    /// Store the client capability object from `initialize`. Written once;
    /// used for logging only.
    pub fn set_client_capabilities(&self, capabilities: Value) {
        *self.client_capabilities.lock() = Some(capabilities);
    }

    /// The stored client capabilities, if any.
    pub fn client_capabilities(&self) -> Option<Value> {
        self.client_capabilities.lock().clone()
    }
}
