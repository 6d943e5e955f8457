//! Process-wide notification throttle.
//!
//! One token shared by every metric kind: whichever alert reaches the throttle first
//! within a window is sent, the rest of that window's alerts are dropped.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleState {
    pub last_sent: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertThrottle {
    window: Duration,
}

impl AlertThrottle {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Take the token if the window since the last send has elapsed.
    ///
    /// A send exactly one window after the previous one is permitted.
    pub fn try_consume(&self, now: DateTime<Utc>, state: &mut ThrottleState) -> bool {
        let permitted = match state.last_sent {
            None => true,
            Some(last_sent) => now - last_sent >= self.window,
        };

        if permitted {
            state.last_sent = Some(now);
        }

        permitted
    }
}
