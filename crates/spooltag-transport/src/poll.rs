//! Card presence wait.
//!
//! Two states: `Idle` and `WaitingForCard`. A wait keeps trying to connect
//! to the selected reader every poll interval until a card answers, the
//! reader goes away, or someone cancels. Cancellation flips the state back
//! to `Idle` and is noticed at the top of the next attempt, so it takes
//! effect within one interval.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::backend::CardConnection;
use crate::locator::ReaderLocator;
use crate::{Result, TransportError, POLL_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    WaitingForCard,
}

/// Cancellable card-presence wait. Clones share the same state.
#[derive(Debug, Clone)]
pub struct PollLoop {
    state: Arc<Mutex<PollState>>,
    interval: Duration,
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(PollState::Idle)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PollState {
        *self.lock()
    }

    /// Cancel an active wait. Returns false when nothing was waiting; a
    /// cancel issued while idle does not affect the next wait.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        let was_waiting = *state == PollState::WaitingForCard;
        *state = PollState::Idle;
        if was_waiting {
            tracing::debug!("card wait cancelled");
        }
        was_waiting
    }

    /// Block until a card is connected on the locator's current reader.
    ///
    /// Errors with `NoReader` when no reader is selected (at start or at any
    /// later attempt) and `Cancelled` after `cancel()`.
    pub fn wait_for_card(&self, locator: &ReaderLocator) -> Result<Box<dyn CardConnection>> {
        if locator.current().is_none() {
            return Err(TransportError::NoReader);
        }
        *self.lock() = PollState::WaitingForCard;
        tracing::info!("waiting for tag");

        let mut attempts: u64 = 0;
        loop {
            if self.state() != PollState::WaitingForCard {
                return Err(TransportError::Cancelled);
            }
            let Some(reader) = locator.current() else {
                *self.lock() = PollState::Idle;
                tracing::info!("reader disappeared while waiting for tag");
                return Err(TransportError::NoReader);
            };

            attempts += 1;
            match locator.backend().connect(&reader) {
                Ok(conn) => {
                    *self.lock() = PollState::Idle;
                    tracing::info!(reader = %reader, attempts, "tag connected");
                    return Ok(conn);
                }
                Err(e) => {
                    tracing::trace!(reader = %reader, attempts, error = %e, "no tag yet");
                }
            }
            std::thread::sleep(self.interval);
        }
    }
}

impl Default for PollLoop {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}
