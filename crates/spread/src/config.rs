//! Client configuration.

use serde::{Deserialize, Serialize};
use spread_connection::ConnectionConfig;

/// Everything a [`SpreadClient`](crate::SpreadClient) needs besides the URL.
///
/// Deserializable, so it can be loaded from a config file; missing fields
/// take their defaults.
///
/// ```
/// use spread::ClientConfig;
///
/// let config: ClientConfig =
///     serde_json::from_str(r#"{"request_state": false}"#).unwrap();
/// assert!(!config.request_state);
/// assert!(config.connection.auto_reconnect);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout and reconnect settings for the underlying connection.
    pub connection: ConnectionConfig,

    /// Whether to ask peers for their full state after every (re)connect.
    /// Default: `true`.
    pub request_state: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            request_state: true,
        }
    }
}
