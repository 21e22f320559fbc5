//! # tcp-lite - A Small Embeddable TCP Client
//!
//! tcp-lite provides a minimal IPv4 TCP client meant to be driven from a
//! scripting host or a simple event loop: allocate a socket, connect, poll
//! for incoming bytes without ever blocking on an idle peer, and write whole
//! payloads reliably.
//!
//! ## Key Features
//!
//! - **Readiness-Gated Reads**: `read` first checks, with a zero timeout,
//!   whether the socket has anything to receive. If not it returns
//!   [`ReadOutcome::NoData`] immediately, otherwise it performs a single
//!   receive and hands back the bytes untouched
//! - **Retrying Writes**: `write` keeps resending the unsent remainder until
//!   the whole payload is accepted by the transport, retrying interrupted
//!   calls. An optional deadline bounds the total time spent
//! - **Fail Quiet, Flip State**: once a session is up, a peer close or a
//!   transport error closes the socket and clears the connected flag instead
//!   of raising
//! - **Deterministic Cleanup**: the socket is closed by `disconnect` or, at
//!   the latest, when the client is dropped
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tcp_lite::{ReadOutcome, SocketClient};
//!
//! let mut client = SocketClient::create()?;
//! client.connect("127.0.0.1", 7890)?;
//!
//! if !client.write(b"GET\n") {
//!     println!("Session lost while writing");
//! }
//!
//! while client.is_connected() {
//!     match client.read()? {
//!         ReadOutcome::Data(bytes) => println!("Received {} bytes", bytes.len()),
//!         ReadOutcome::NoData => tcp_lite::sleep(10),
//!         ReadOutcome::Closed => println!("Connection closed by remote peer"),
//!     }
//! }
//! # Ok::<(), tcp_lite::ClientError>(())
//! ```
//!
//! ## Configuration
//!
//! [`ClientConfig`] sets the default read size (8192 bytes), an optional
//! connect timeout, an optional write deadline and `TCP_NODELAY`.
//!
//! ## Threading
//!
//! A client is meant to be used from one thread at a time. Every call runs
//! to completion on the calling thread; without a write deadline a peer that
//! never drains its receive buffer can stall `write` indefinitely.
//!
//! ## Logging
//!
//! Lifecycle and I/O events are emitted through the `log` facade, tagged
//! with the client's [`id`](SocketClient::id).

#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod readiness;

pub use client::*;
pub use config::*;
pub use error::*;

use std::time::Duration;

/// Suspends the calling thread for `ms` milliseconds.
pub fn sleep(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
