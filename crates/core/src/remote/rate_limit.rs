//! Fixed-window rate limiting.

use super::error::RemoteError;
use gk_protocol::config_models::RateLimitSettings;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Fixed time-window limiter.
///
/// Up to `permit_limit` callers pass per window. Excess callers wait in a
/// queue of at most `queue_limit`, served oldest first as windows open;
/// callers beyond that are rejected with [`RemoteError::RateLimited`].
pub struct RateLimiter {
    permit_limit: u32,
    window: Duration,
    queue_limit: usize,
    state: Mutex<WindowState>,
    turn: Notify,
}

struct WindowState {
    window_start: Instant,
    used: u32,
    queue: VecDeque<u64>,
    next_ticket: u64,
}

impl WindowState {
    fn roll(&mut self, window: Duration) {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= window {
            self.window_start = now;
            self.used = 0;
        }
    }
}

impl From<&RateLimitSettings> for RateLimiter {
    fn from(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.permit_limit,
            Duration::from_millis(settings.window_ms),
            settings.queue_limit,
        )
    }
}

impl RateLimiter {
    pub fn new(permit_limit: u32, window: Duration, queue_limit: usize) -> Self {
        Self {
            permit_limit: permit_limit.max(1),
            window,
            queue_limit,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                used: 0,
                queue: VecDeque::new(),
                next_ticket: 0,
            }),
            turn: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a permit if one is free right now and nobody is queued.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();
        state.roll(self.window);
        if state.queue.is_empty() && state.used < self.permit_limit {
            state.used += 1;
            true
        } else {
            false
        }
    }

    /// Number of callers waiting for a permit.
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    /// Wait for a permit.
    ///
    /// # Errors
    ///
    /// [`RemoteError::RateLimited`] when the window is spent and the queue is full.
    pub async fn acquire(&self) -> Result<(), RemoteError> {
        let ticket = {
            let mut state = self.lock();
            state.roll(self.window);
            if state.queue.is_empty() && state.used < self.permit_limit {
                state.used += 1;
                return Ok(());
            }
            if state.queue.len() >= self.queue_limit {
                warn!(queue_limit = self.queue_limit, "rate limit queue full");
                return Err(RemoteError::RateLimited {
                    queue_limit: self.queue_limit,
                });
            }

            let ticket = state.next_ticket;
            state.next_ticket += 1;
            state.queue.push_back(ticket);
            debug!(ticket, queued = state.queue.len(), "rate limited, queueing");
            ticket
        };

        let _slot = QueueSlot {
            limiter: self,
            ticket,
        };

        loop {
            let notified = self.turn.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let deadline = {
                let mut state = self.lock();
                state.roll(self.window);
                if state.queue.front() == Some(&ticket) && state.used < self.permit_limit {
                    state.queue.pop_front();
                    state.used += 1;
                    drop(state);
                    self.turn.notify_waiters();
                    return Ok(());
                }
                state.window_start + self.window
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => {}
            }
        }
    }
}

/// Removes an abandoned ticket from the queue.
struct QueueSlot<'a> {
    limiter: &'a RateLimiter,
    ticket: u64,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        let mut state = self.limiter.lock();
        if let Some(position) = state.queue.iter().position(|t| *t == self.ticket) {
            state.queue.remove(position);
            drop(state);
            self.limiter.turn.notify_waiters();
        }
    }
}
