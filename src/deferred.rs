//! Deferred results
//!
//! Every map operation returns a [`Deferred`] right away; the reply arrives
//! later from a dispatch lane. `wait` is the one blocking adapter: it parks
//! the calling thread until the reply is in and returns the operation's
//! `Result`.
//!
//! Dropping or cancelling a deferred result only discards the reply. If the
//! request already reached the store, its effect stands.

use std::fmt;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{MapError, Result};
use crate::protocol::Reply;

type Then<T> = Box<dyn FnOnce(Reply) -> Result<T> + Send>;

/// The pending or completed result of one map operation
#[must_use = "a deferred result does nothing unless waited on or polled"]
pub struct Deferred<T> {
    state: State<T>,
}

enum State<T> {
    /// Resolved without a remote exchange
    Ready(Result<T>),
    /// Waiting for a reply, plus the decoding to apply to it
    Pending(Receiver<Result<Reply>>, Then<T>),
    /// Result already handed out
    Taken,
}

impl<T> Deferred<T> {
    pub(crate) fn pending(
        receiver: Receiver<Result<Reply>>,
        then: impl FnOnce(Reply) -> Result<T> + Send + 'static,
    ) -> Self {
        Self {
            state: State::Pending(receiver, Box::new(then)),
        }
    }

    /// An already-resolved result
    pub fn ready(result: Result<T>) -> Self {
        Self {
            state: State::Ready(result),
        }
    }

    /// An already-failed result
    pub fn failed(error: MapError) -> Self {
        Self::ready(Err(error))
    }

    /// Block until the result is available
    pub fn wait(self) -> Result<T> {
        match self.state {
            State::Ready(result) => result,
            State::Pending(receiver, then) => match receiver.recv() {
                Ok(reply) => reply.and_then(then),
                Err(_) => Err(lane_closed()),
            },
            State::Taken => Err(already_taken()),
        }
    }

    /// Block for at most `timeout`.
    ///
    /// `None` means the result is not in yet and the deferred stays pending;
    /// the remote operation is not affected by the timeout.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<T>> {
        match std::mem::replace(&mut self.state, State::Taken) {
            State::Ready(result) => Some(result),
            State::Pending(receiver, then) => match receiver.recv_timeout(timeout) {
                Ok(reply) => Some(reply.and_then(then)),
                Err(RecvTimeoutError::Timeout) => {
                    self.state = State::Pending(receiver, then);
                    None
                }
                Err(RecvTimeoutError::Disconnected) => Some(Err(lane_closed())),
            },
            State::Taken => Some(Err(already_taken())),
        }
    }

    /// Poll without blocking
    pub fn try_result(&mut self) -> Option<Result<T>> {
        match std::mem::replace(&mut self.state, State::Taken) {
            State::Ready(result) => Some(result),
            State::Pending(receiver, then) => match receiver.try_recv() {
                Ok(reply) => Some(reply.and_then(then)),
                Err(TryRecvError::Empty) => {
                    self.state = State::Pending(receiver, then);
                    None
                }
                Err(TryRecvError::Disconnected) => Some(Err(lane_closed())),
            },
            State::Taken => Some(Err(already_taken())),
        }
    }

    /// True once the result has been handed out by `try_result`/`wait_timeout`
    pub fn is_taken(&self) -> bool {
        matches!(self.state, State::Taken)
    }

    /// Discard the result. This is not a rollback.
    pub fn cancel(self) {
        if matches!(self.state, State::Pending(..)) {
            tracing::trace!("deferred result cancelled");
        }
    }
}

impl<T: 'static> Deferred<T> {
    /// Transform the successful value once it arrives
    pub fn map<U>(self, f: impl FnOnce(T) -> U + Send + 'static) -> Deferred<U> {
        self.and_then(move |value| Ok(f(value)))
    }

    /// Chain a fallible transformation onto the successful value
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U> + Send + 'static) -> Deferred<U> {
        let state = match self.state {
            State::Ready(result) => State::Ready(result.and_then(f)),
            State::Pending(receiver, then) => {
                State::Pending(receiver, Box::new(move |reply| then(reply).and_then(f)))
            }
            State::Taken => State::Taken,
        };
        Deferred { state }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Ready(_) => "ready",
            State::Pending(..) => "pending",
            State::Taken => "taken",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

fn lane_closed() -> MapError {
    MapError::Transport("executor shut down before the request completed".to_string())
}

fn already_taken() -> MapError {
    MapError::Transport("deferred result was already taken".to_string())
}
