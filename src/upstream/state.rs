//! Upstream link state machine.
//!
//! ```text
//!  Disconnected ──begin_connect──▶ Connecting ──opened──▶ Connected
//!       ▲                              │                     │
//!       └──────────── lost (delay) ────┴─────────────────────┘
//!
//!  any state ──terminate──▶ Terminated (absorbing)
//! ```
//!
//! Pure bookkeeping: no I/O, no timers. The supervisor drives it and
//! performs the side effects each transition calls for.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::resilience::Backoff;

/// Observable state of one upstream link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Terminated,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// State and retry delay for one binding's upstream connection.
#[derive(Debug, Clone)]
pub struct UpstreamLink {
    state: LinkState,
    backoff: Backoff,
    retry_delay: Duration,
}

impl UpstreamLink {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: LinkState::Disconnected,
            retry_delay: backoff.reset(),
            backoff,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Delay that will be applied to the next failure.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Disconnected → Connecting. Returns false if no attempt may start.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != LinkState::Disconnected {
            return false;
        }
        self.state = LinkState::Connecting;
        true
    }

    /// Connecting → Connected; resets the retry delay.
    pub fn opened(&mut self) -> bool {
        if self.state != LinkState::Connecting {
            return false;
        }
        self.state = LinkState::Connected;
        self.retry_delay = self.backoff.reset();
        true
    }

    /// The socket closed, errored, or the attempt failed.
    ///
    /// Moves a live link back to Disconnected and returns how long to wait
    /// before the next attempt; the stored delay is grown for the failure
    /// after that. Returns `None` when no reconnect may be scheduled.
    pub fn lost(&mut self) -> Option<Duration> {
        match self.state {
            LinkState::Connecting | LinkState::Connected => {
                self.state = LinkState::Disconnected;
                let delay = self.retry_delay;
                self.retry_delay = self.backoff.next(delay);
                Some(delay)
            }
            LinkState::Disconnected | LinkState::Terminated => None,
        }
    }

    /// Any state → Terminated. Returns true only on the first call.
    pub fn terminate(&mut self) -> bool {
        if self.state == LinkState::Terminated {
            return false;
        }
        self.state = LinkState::Terminated;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> UpstreamLink {
        UpstreamLink::new(Backoff::default())
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_happy_path() {
        let mut link = link();
        assert_eq!(link.state(), LinkState::Disconnected);

        assert!(link.begin_connect());
        assert_eq!(link.state(), LinkState::Connecting);

        assert!(link.opened());
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[test]
    fn test_consecutive_failures_grow_delay() {
        let mut link = link();
        let mut delays = Vec::new();
        for _ in 0..3 {
            assert!(link.begin_connect());
            delays.push(link.lost().unwrap());
        }
        assert_eq!(delays, vec![ms(1_000), ms(2_000), ms(4_000)]);
    }

    #[test]
    fn test_delays_non_decreasing_and_bounded() {
        let mut link = link();
        let mut last = Duration::ZERO;
        for _ in 0..20 {
            link.begin_connect();
            let delay = link.lost().unwrap();
            assert!(delay >= last);
            assert!(delay <= Backoff::MAX_DELAY);
            last = delay;
        }
        assert_eq!(last, Backoff::MAX_DELAY);
    }

    #[test]
    fn test_success_resets_delay() {
        let mut link = link();
        for _ in 0..4 {
            link.begin_connect();
            link.lost();
        }
        assert_eq!(link.retry_delay(), ms(16_000));

        link.begin_connect();
        link.opened();
        assert_eq!(link.retry_delay(), ms(1_000));
        assert_eq!(link.lost(), Some(ms(1_000)));
    }

    #[test]
    fn test_terminated_is_absorbing() {
        let mut link = link();
        link.begin_connect();
        link.opened();

        assert!(link.terminate());
        assert!(!link.terminate());

        assert!(!link.begin_connect());
        assert!(!link.opened());
        assert_eq!(link.lost(), None);
        assert_eq!(link.state(), LinkState::Terminated);
    }

    #[test]
    fn test_terminate_while_disconnected() {
        let mut link = link();
        link.begin_connect();
        assert!(link.lost().is_some());
        assert!(link.terminate());
        assert!(!link.begin_connect());
    }

    #[test]
    fn test_lost_without_socket_schedules_nothing() {
        let mut link = link();
        assert_eq!(link.lost(), None);
        assert_eq!(link.retry_delay(), ms(1_000));
    }

    #[test]
    fn test_open_requires_connecting() {
        let mut link = link();
        assert!(!link.opened());
        assert_eq!(link.state(), LinkState::Disconnected);
    }
}
