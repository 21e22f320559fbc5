use std::io::Result as IoResult;
use std::time::Duration;

use polling::{Event, Events, Poller};
use socket2::Socket;

const SOCKET_KEY: usize = 0;

/// Zero-timeout readability check for a single socket.
///
/// The socket is registered once with no interest. Every check re-arms the
/// readable interest (the poller runs in oneshot mode) and waits with a zero
/// timeout, so a call never blocks.
pub(crate) struct ReadinessProbe {
    poller: Poller,
    events: Events,
}

impl ReadinessProbe {
    /// Creates a poller and registers `socket` with it.
    ///
    /// [`deregister`](Self::deregister) must be called before `socket` is closed.
    pub(crate) fn register(socket: &Socket) -> IoResult<ReadinessProbe> {
        let poller = Poller::new()?;
        unsafe {
            poller.add(socket, Event::none(SOCKET_KEY))?;
        }
        Ok(ReadinessProbe {
            poller,
            events: Events::new(),
        })
    }

    /// Returns `true` if a receive on `socket` would not block.
    ///
    /// A peer that closed or reset the connection also reports ready: the
    /// following receive is what tells them apart from data.
    pub(crate) fn data_ready(&mut self, socket: &Socket) -> IoResult<bool> {
        self.events.clear();
        self.poller.modify(socket, Event::readable(SOCKET_KEY))?;
        self.poller.wait(&mut self.events, Some(Duration::ZERO))?;
        Ok(self
            .events
            .iter()
            .any(|e| e.key == SOCKET_KEY && e.readable))
    }

    pub(crate) fn deregister(&self, socket: &Socket) {
        if let Err(e) = self.poller.delete(socket) {
            log::debug!("Failed to deregister socket from poller: {e}");
        }
    }
}
