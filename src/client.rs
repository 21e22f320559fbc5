use std::io::{ErrorKind, Read, Result as IoResult};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Instant;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::readiness::ReadinessProbe;

/// What a single [`SocketClient::read`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes received by one receive call, verbatim.
    Data(Vec<u8>),
    /// Nothing was ready to be received. The session is still up.
    NoData,
    /// The peer closed or reset the connection, or the transport failed.
    /// The handle has been closed and the client is no longer connected.
    Closed,
}

impl ReadOutcome {
    /// Returns the received bytes, if any.
    pub fn into_data(self) -> Option<Vec<u8>> {
        match self {
            ReadOutcome::Data(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// The OS socket plus the poller it is registered with.
///
/// Dropping it deregisters the socket and then closes the descriptor.
struct Transport {
    socket: Socket,
    probe: ReadinessProbe,
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.probe.deregister(&self.socket);
    }
}

/// A blocking IPv4 TCP client with a non-blocking read.
///
/// The socket is allocated by [`create`](SocketClient::create) and owned by the
/// client for its whole life. It is never re-allocated: once closed, by
/// [`disconnect`](SocketClient::disconnect) or by a fatal read or write, the
/// client cannot connect again.
///
/// # Example
///
/// ```rust,no_run
/// use tcp_lite::{ReadOutcome, SocketClient};
///
/// let mut client = SocketClient::create()?;
/// client.connect("127.0.0.1", 7890)?;
/// assert!(client.write(b"hello"));
///
/// loop {
///     match client.read()? {
///         ReadOutcome::Data(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
///         ReadOutcome::NoData => tcp_lite::sleep(10),
///         ReadOutcome::Closed => break,
///     }
/// }
/// # Ok::<(), tcp_lite::ClientError>(())
/// ```
pub struct SocketClient {
    id: Uuid,
    transport: Option<Transport>,
    connected: bool,
    scratch: Vec<u8>,
    config: ClientConfig,
}

impl SocketClient {
    /// Allocates a socket with the default configuration.
    pub fn create() -> Result<SocketClient> {
        Self::with_config(ClientConfig::default())
    }

    /// Allocates a socket with the given configuration.
    pub fn with_config(mut config: ClientConfig) -> Result<SocketClient> {
        if config.read_buffer_size == 0 {
            config.read_buffer_size = crate::config::DEFAULT_READ_SIZE;
        }
        config.write_deadline = config.write_deadline.filter(|d| !d.is_zero());
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(ClientError::Creation)?;
        #[cfg(target_vendor = "apple")]
        socket.set_nosigpipe(true).map_err(ClientError::Creation)?;
        let probe = ReadinessProbe::register(&socket).map_err(ClientError::Creation)?;

        let id = Uuid::new_v4();
        log::debug!("[{id}] Socket created");
        Ok(SocketClient {
            id,
            transport: Some(Transport { socket, probe }),
            connected: false,
            scratch: vec![0u8; config.read_buffer_size],
            config,
        })
    }

    /// Connects to `address:port`. `address` must be a dotted IPv4 literal, no
    /// name resolution is performed.
    ///
    /// On failure the connected flag is left as it was: a disconnected client
    /// may try again unless its handle was already closed, and a connected
    /// one (the OS refuses a second connect) keeps its current session.
    pub fn connect(&mut self, address: &str, port: u16) -> Result<()> {
        let ip: Ipv4Addr = address.parse().map_err(|_| {
            ClientError::connect(
                address,
                port,
                std::io::Error::new(ErrorKind::InvalidInput, "not an IPv4 address literal"),
            )
        })?;
        let Some(transport) = self.transport.as_ref() else {
            return Err(ClientError::connect(
                address,
                port,
                std::io::Error::new(ErrorKind::NotConnected, "socket already closed"),
            ));
        };

        let target = SockAddr::from(SocketAddrV4::new(ip, port));
        let attempt = match self.config.connect_timeout {
            Some(timeout) => transport.socket.connect_timeout(&target, timeout),
            None => transport.socket.connect(&target),
        };
        if let Err(e) = attempt {
            log::debug!("[{}] Connect to {address}:{port} failed: {e}", self.id);
            return Err(ClientError::connect(address, port, e));
        }

        if self.config.nodelay {
            if let Err(e) = transport.socket.set_tcp_nodelay(true) {
                log::warn!("[{}] Failed to set TCP_NODELAY: {e}", self.id);
            }
        }
        self.connected = true;
        log::debug!("[{}] Connected to {address}:{port}", self.id);
        Ok(())
    }

    /// Returns whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Reads up to the configured read size. See [`read_up_to`](Self::read_up_to).
    pub fn read(&mut self) -> Result<ReadOutcome> {
        self.read_up_to(self.config.read_buffer_size)
    }

    /// Checks for data without blocking and, if some is ready, performs a
    /// single receive of at most `max_bytes`. Zero means the configured size.
    ///
    /// Fails with [`ClientError::NotConnected`] when there is no session.
    /// A receive of zero bytes or a receive error ends the session and
    /// yields [`ReadOutcome::Closed`].
    pub fn read_up_to(&mut self, max_bytes: usize) -> Result<ReadOutcome> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        let max = if max_bytes == 0 { self.config.read_buffer_size } else { max_bytes };
        let Some(transport) = self.transport.as_mut() else {
            self.connected = false;
            return Err(ClientError::NotConnected);
        };

        match transport.probe.data_ready(&transport.socket) {
            Ok(true) => {}
            Ok(false) => return Ok(ReadOutcome::NoData),
            Err(e) => {
                log::warn!("[{}] Readiness check failed: {e}", self.id);
                self.close();
                return Ok(ReadOutcome::Closed);
            }
        }

        let mut large = Vec::new();
        let buf = if max <= self.scratch.len() {
            &mut self.scratch[..max]
        } else {
            large
                .try_reserve_exact(max)
                .map_err(|_| ClientError::OutOfMemory(max))?;
            large.resize(max, 0);
            large.as_mut_slice()
        };

        let received = loop {
            match (&transport.socket).read(buf) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        match received {
            Ok(n) if n > 0 => {
                log::debug!("[{}] Read {n} bytes", self.id);
                Ok(ReadOutcome::Data(buf[..n].to_vec()))
            }
            Ok(_) => {
                log::debug!("[{}] Connection closed by remote peer", self.id);
                self.close();
                Ok(ReadOutcome::Closed)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(ReadOutcome::NoData),
            Err(e) => {
                log::warn!("[{}] Receive failed: {e}", self.id);
                self.close();
                Ok(ReadOutcome::Closed)
            }
        }
    }

    /// Sends the whole of `data`, resending the unsent remainder after
    /// partial sends and retrying interrupted calls.
    ///
    /// Returns `false` when not connected, or when the transport fails, in
    /// which case the handle is closed and the session ends. With a
    /// [`write_deadline`](ClientConfig::write_deadline) configured, running
    /// past it counts as a transport failure.
    pub fn write(&mut self, data: &[u8]) -> bool {
        if !self.connected {
            log::debug!("[{}] Write attempted while not connected", self.id);
            return false;
        }
        let Some(transport) = self.transport.as_ref() else {
            self.connected = false;
            return false;
        };
        if data.is_empty() {
            return true;
        }

        let deadline = self.config.write_deadline;
        let started = Instant::now();
        let mut sent = 0;
        let failure = loop {
            if let Some(d) = deadline {
                let remaining = d.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    break std::io::Error::new(
                        ErrorKind::TimedOut,
                        format!("write deadline exceeded after {sent} of {} bytes", data.len()),
                    );
                }
                // A blocked send must not outlive the deadline.
                if let Err(e) = transport.socket.set_write_timeout(Some(remaining)) {
                    break e;
                }
            }
            match send(&transport.socket, &data[sent..]) {
                Ok(0) => break std::io::Error::from(ErrorKind::WriteZero),
                Ok(n) => {
                    sent += n;
                    if sent == data.len() {
                        log::debug!("[{}] Wrote {sent} bytes", self.id);
                        return true;
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e)
                    if deadline.is_some()
                        && matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    continue;
                }
                Err(e) => break e,
            }
        };

        log::warn!("[{}] Send failed, closing socket: {failure}", self.id);
        self.close();
        false
    }

    /// Closes the socket and ends the session, whether or not one was established.
    pub fn disconnect(&mut self) {
        if self.transport.is_some() {
            log::debug!("[{}] Disconnecting", self.id);
        }
        self.close();
    }

    /// Identifier used to tag this client's log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the configuration the client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the address of the connected peer.
    pub fn peer_addr(&self) -> IoResult<SocketAddr> {
        self.open_socket()?
            .peer_addr()?
            .as_socket()
            .ok_or_else(|| std::io::Error::from(ErrorKind::AddrNotAvailable))
    }

    /// Returns the local address of the socket.
    pub fn local_addr(&self) -> IoResult<SocketAddr> {
        self.open_socket()?
            .local_addr()?
            .as_socket()
            .ok_or_else(|| std::io::Error::from(ErrorKind::AddrNotAvailable))
    }

    fn open_socket(&self) -> IoResult<&Socket> {
        self.transport
            .as_ref()
            .map(|t| &t.socket)
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotConnected, "socket closed"))
    }

    fn close(&mut self) {
        self.transport = None;
        self.connected = false;
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if self.transport.is_some() {
            log::debug!("[{}] Releasing socket still open at drop", self.id);
        }
        self.close();
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn send(socket: &Socket, buf: &[u8]) -> IoResult<usize> {
    socket.send_with_flags(buf, libc::MSG_NOSIGNAL)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn send(socket: &Socket, buf: &[u8]) -> IoResult<usize> {
    socket.send(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use std::net::TcpListener;

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn fresh_client_is_not_connected() {
        let client = SocketClient::create().unwrap();
        assert!(!client.is_connected());
        assert!(client.peer_addr().is_err());
    }

    #[test]
    fn read_before_connect_is_an_error() {
        let mut client = SocketClient::create().unwrap();
        assert!(matches!(client.read(), Err(ClientError::NotConnected)));
    }

    #[test]
    fn write_before_connect_fails_softly() {
        let mut client = SocketClient::create().unwrap();
        assert!(!client.write(b"payload"));
        assert!(!client.is_connected());
    }

    #[test]
    fn non_numeric_address_is_rejected() {
        let mut client = SocketClient::create().unwrap();
        let err = client.connect("localhost", 80).unwrap_err();
        assert_eq!(err.to_string(), "connect localhost:80 failed");
        assert!(!client.is_connected());
    }

    #[test]
    fn connect_while_connected_fails_and_keeps_session() {
        let (first, first_port) = listener();
        let (_second, second_port) = listener();
        let mut client = SocketClient::create().unwrap();
        client.connect("127.0.0.1", first_port).unwrap();
        let (mut peer, _) = first.accept().unwrap();

        let err = client.connect("127.0.0.1", second_port).unwrap_err();
        assert!(matches!(err, ClientError::Connect { port, .. } if port == second_port));
        assert!(client.is_connected());
        assert_eq!(client.peer_addr().unwrap().port(), first_port);

        assert!(client.connect("127.0.0.1", first_port).is_err());
        assert!(client.is_connected());

        assert!(client.write(b"still here"));
        let mut buf = [0u8; 10];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"still here");
    }

    #[test]
    fn zero_settings_are_normalized_at_creation() {
        let config = ClientConfig {
            read_buffer_size: 0,
            write_deadline: Some(std::time::Duration::ZERO),
            ..ClientConfig::default()
        };
        let client = SocketClient::with_config(config).unwrap();
        assert_eq!(client.config().read_buffer_size, crate::config::DEFAULT_READ_SIZE);
        assert_eq!(client.config().write_deadline, None);
    }

    #[test]
    fn closed_handle_cannot_reconnect() {
        let (listener, port) = listener();
        let mut client = SocketClient::create().unwrap();
        client.connect("127.0.0.1", port).unwrap();
        let _peer = listener.accept().unwrap();

        client.disconnect();
        assert!(!client.is_connected());
        assert!(matches!(
            client.connect("127.0.0.1", port),
            Err(ClientError::Connect { .. })
        ));
        // Disconnecting again is harmless.
        client.disconnect();
        assert!(!client.is_connected());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn handle_stays_usable_after_refused_connect() {
        let (closed, refused_port) = listener();
        drop(closed);

        let mut client = SocketClient::create().unwrap();
        assert!(client.connect("127.0.0.1", refused_port).is_err());
        assert!(!client.is_connected());

        let (listener, port) = listener();
        client.connect("127.0.0.1", port).unwrap();
        let _peer = listener.accept().unwrap();
        assert!(client.is_connected());
    }

    #[test]
    fn empty_write_succeeds_when_connected() {
        let (listener, port) = listener();
        let mut client = SocketClient::create().unwrap();
        client.connect("127.0.0.1", port).unwrap();
        let _peer = listener.accept().unwrap();
        assert!(client.write(&[]));
        assert!(client.is_connected());
    }
}
