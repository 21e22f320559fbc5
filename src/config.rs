use std::time::Duration;

/// Default size of the scratch buffer used by [`SocketClient::read`](crate::SocketClient::read).
pub const DEFAULT_READ_SIZE: usize = 8192;

/// Tunables applied to a [`SocketClient`](crate::SocketClient) when it is created and connected.
///
/// ```rust
/// use std::time::Duration;
/// use tcp_lite::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_connect_timeout(Duration::from_secs(3))
///     .with_write_deadline(Duration::from_secs(10));
/// assert_eq!(config.read_buffer_size, 8192);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Number of bytes requested by a plain `read()`.
    pub read_buffer_size: usize,
    /// Upper bound on a single connect attempt. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Upper bound on the total time spent inside one `write()` call.
    /// Each send is bounded by the time left, so a write returns shortly
    /// after the deadline even while blocked on a full send buffer.
    /// `None` retries until the payload is sent or a fatal error occurs.
    pub write_deadline: Option<Duration>,
    /// Sets `TCP_NODELAY` once connected.
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_SIZE,
            connect_timeout: None,
            write_deadline: None,
            nodelay: false,
        }
    }
}

impl ClientConfig {
    /// Sets the default read size. Zero falls back to [`DEFAULT_READ_SIZE`].
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = if size == 0 { DEFAULT_READ_SIZE } else { size };
        self
    }

    /// Bounds each connect attempt.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Bounds the total duration of each write. A zero deadline means no deadline.
    pub fn with_write_deadline(mut self, deadline: Duration) -> Self {
        self.write_deadline = if deadline.is_zero() { None } else { Some(deadline) };
        self
    }

    /// Enables or disables `TCP_NODELAY`.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}
