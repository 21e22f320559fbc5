//! Error types for tcp-lite.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures surfaced as error values by [`SocketClient`](crate::SocketClient).
///
/// Once a session is underway, receive and send failures are not reported
/// here: they tear the session down and show up as
/// [`ReadOutcome::Closed`](crate::ReadOutcome::Closed) or a `false` write.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The transport handle could not be allocated.
    #[error("create socket failed: {0}")]
    Creation(#[source] std::io::Error),

    /// The connection attempt to `address:port` failed.
    #[error("connect {address}:{port} failed")]
    Connect {
        /// Target address as given by the caller.
        address: String,
        /// Target port.
        port: u16,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// The operation requires an established session.
    #[error("not connected")]
    NotConnected,

    /// The scratch buffer for a read could not be allocated.
    #[error("nomem while read ({0} bytes)")]
    OutOfMemory(usize),
}

impl ClientError {
    pub(crate) fn connect(address: impl Into<String>, port: u16, source: std::io::Error) -> Self {
        Self::Connect {
            address: address.into(),
            port,
            source,
        }
    }
}
