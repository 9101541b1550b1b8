//! Fixed-window limiter on round starts, keyed by user.
//!
//! Approximate by construction: a burst straddling a window edge can reach twice the limit.

use std::collections::HashMap;

use crashline_types::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    count: u32,
    reset_at: u64,
}

impl Window {
    fn expired(&self, now: u64) -> bool {
        now >= self.reset_at
    }
}

#[derive(Debug, Default)]
pub struct RateGate {
    windows: HashMap<UserId, Window>,
}

impl RateGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one attempt for `user`. Returns `true` when the attempt is blocked.
    ///
    /// A blocked attempt is not counted.
    pub fn check_and_increment(
        &mut self,
        user: &UserId,
        max_per_window: u32,
        window_ms: u64,
        now: u64,
    ) -> bool {
        match self.windows.get_mut(user) {
            Some(window) if !window.expired(now) => {
                if window.count >= max_per_window {
                    return true;
                }
                window.count += 1;
                false
            }
            _ => {
                self.windows.insert(
                    user.clone(),
                    Window {
                        count: 1,
                        reset_at: now.saturating_add(window_ms),
                    },
                );
                false
            }
        }
    }

    /// Milliseconds until `user`'s current window resets (zero if none is open).
    pub fn retry_after_ms(&self, user: &UserId, now: u64) -> u64 {
        self.windows
            .get(user)
            .map(|window| window.reset_at.saturating_sub(now))
            .unwrap_or(0)
    }

    /// Drop every elapsed window and return how many were removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.expired(now));
        before - self.windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
