//! Bounded FIFO between the reader and the worker pool.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::event::Event;

/// Returned by [`IntakeQueue::push`] once the queue has been closed.
///
/// The rejected event travels back to the caller, which drops it.
#[derive(Debug, Error)]
#[error("intake queue is closed")]
pub struct Closed(pub Event);

#[derive(Debug)]
struct State {
    events: VecDeque<Event>,
    closed: bool,
}

/// Single-producer, multi-consumer bounded queue.
///
/// Producers block while the queue is full and consumers block while it is
/// empty. Closing wakes both sides; buffered events are discarded rather than
/// handed to workers.
#[derive(Debug)]
pub struct IntakeQueue {
    capacity: usize,
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl IntakeQueue {
    /// Builds a queue holding at most `capacity` events (minimum one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(State {
                events: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an event, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] carrying the event when the queue was closed before
    /// space became available.
    pub fn push(&self, event: Event) -> Result<(), Closed> {
        let guard = self.lock();
        let mut state = self
            .not_full
            .wait_while(guard, |state| {
                !state.closed && state.events.len() >= self.capacity
            })
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Closed(event));
        }
        state.events.push_back(event);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest event, blocking until one arrives.
    ///
    /// Returns `None` once the queue is closed, even when events remain.
    pub fn pop(&self) -> Option<Event> {
        let guard = self.lock();
        let mut state = self
            .not_empty
            .wait_while(guard, |state| !state.closed && state.events.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        let event = state.events.pop_front();
        drop(state);
        self.not_full.notify_one();
        event
    }

    /// Closes the queue, wakes every waiter, and returns the number of
    /// buffered events that were discarded. Later calls return zero.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.closed = true;
        let dropped = state.events.len();
        state.events.clear();
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        dropped
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Returns `true` when no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of buffered events.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` after [`close`](Self::close).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
