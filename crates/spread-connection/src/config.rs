//! Connection configuration and lifecycle state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConnectionConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Connection`](crate::Connection).
///
/// Sensible defaults are provided: create one with
/// `ConnectionConfig::default()` and override just the fields you need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// How long `connect()` waits for the handshake before failing with
    /// a timeout. Default: 10 seconds.
    pub timeout: Duration,

    /// Whether an unsolicited close triggers reconnection. Default: `true`.
    pub auto_reconnect: bool,

    /// Fixed delay before each reconnect attempt. Default: 1 second.
    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            auto_reconnect: true,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The lifecycle state of a connection.
///
/// ```text
/// Disconnected ──connect()──→ Connecting ──handshake──→ Connected
///       ↑                         │                         │
///       └────── timeout/fail ─────┘            close() / remote close
///                                                           │
///                                                           ▼
///                          Connecting ←─(auto-reconnect)── Closed ←── Closing
/// ```
///
/// - **Disconnected**: no link yet, or the last attempt failed.
/// - **Connecting**: a dial is in flight.
/// - **Connected**: the link is open; frames flow both ways.
/// - **Closing**: `close()` was called; queued frames are being flushed.
/// - **Closed**: the link is gone. Unless the user closed it, a
///   reconnect attempt is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

impl ConnectionState {
    /// Returns `true` while frames can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Why a link ended, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// WebSocket close code (1000 normal, 1006 abnormal, ...).
    pub code: u16,
    /// Human-readable reason; may be empty.
    pub reason: String,
}
