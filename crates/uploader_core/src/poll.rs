//! Bookkeeping for one view's poll chain. The timer itself lives with
//! whoever executes `Effect::SchedulePoll`; this side only decides whether
//! a tick may fetch and how long to wait before the next one.

use std::time::Duration;

pub type ChainId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_retries: u32,
    pub max_backoff: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_retries: 500,
            max_backoff: Duration::from_secs(60),
            max_consecutive_failures: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFailure {
    Retry(Duration),
    /// The retry bound is spent; the chain ends quietly.
    Exhausted,
    /// Too many failures in a row.
    GiveUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollSession {
    chain: ChainId,
    retries: u32,
    consecutive_failures: u32,
    in_flight: bool,
    active: bool,
}

impl PollSession {
    /// Starts a fresh chain. Anything still addressed to the old chain id
    /// (timers, responses) is ignored from here on.
    pub fn restart(&mut self) -> ChainId {
        self.chain += 1;
        self.retries = 0;
        self.consecutive_failures = 0;
        self.in_flight = false;
        self.active = true;
        self.chain
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_current(&self, chain: ChainId) -> bool {
        self.active && self.chain == chain
    }

    /// Claims a tick for `chain`. Returns false when the tick is stale, a
    /// fetch is already outstanding or the retry bound is spent. At most one
    /// request is ever in flight and a chain never fetches more than
    /// `max_retries` times.
    pub fn begin_tick(&mut self, chain: ChainId, settings: &PollSettings) -> bool {
        if !self.is_current(chain) || self.in_flight {
            return false;
        }
        if self.retries >= settings.max_retries {
            self.active = false;
            return false;
        }
        self.retries += 1;
        self.in_flight = true;
        true
    }

    /// Records a successful fetch; returns the delay before the next tick
    /// or `None` once the retry bound is spent.
    pub fn on_success(&mut self, settings: &PollSettings) -> Option<Duration> {
        self.in_flight = false;
        self.consecutive_failures = 0;
        if self.retries < settings.max_retries {
            Some(settings.interval)
        } else {
            self.active = false;
            None
        }
    }

    pub fn on_failure(&mut self, settings: &PollSettings) -> AfterFailure {
        self.in_flight = false;
        self.consecutive_failures += 1;
        if self.consecutive_failures >= settings.max_consecutive_failures {
            self.active = false;
            return AfterFailure::GiveUp;
        }
        if self.retries >= settings.max_retries {
            self.active = false;
            return AfterFailure::Exhausted;
        }
        AfterFailure::Retry(backoff(settings, self.consecutive_failures))
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.in_flight = false;
    }
}

fn backoff(settings: &PollSettings, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    settings
        .interval
        .saturating_mul(1u32 << exponent)
        .min(settings.max_backoff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_retries: u32) -> PollSettings {
        PollSettings {
            max_retries,
            ..PollSettings::default()
        }
    }

    #[test]
    fn chain_runs_exactly_to_the_bound() {
        let settings = settings(3);
        let mut session = PollSession::default();
        let chain = session.restart();
        let mut fetches = 0;
        while session.begin_tick(chain, &settings) {
            fetches += 1;
            if session.on_success(&settings).is_none() {
                break;
            }
        }
        assert_eq!(fetches, 3);
        assert!(!session.is_active());
    }

    #[test]
    fn overlapping_ticks_are_refused() {
        let mut session = PollSession::default();
        let chain = session.restart();
        let settings = PollSettings::default();
        assert!(session.begin_tick(chain, &settings));
        assert!(!session.begin_tick(chain, &settings));
        assert_eq!(session.retries(), 1);
    }

    #[test]
    fn stale_chain_is_refused_after_restart() {
        let mut session = PollSession::default();
        let old = session.restart();
        let new = session.restart();
        assert_ne!(old, new);
        let settings = PollSettings::default();
        assert!(!session.begin_tick(old, &settings));
        assert!(session.begin_tick(new, &settings));
    }

    #[test]
    fn failures_back_off_then_give_up() {
        let settings = PollSettings {
            interval: Duration::from_secs(5),
            max_backoff: Duration::from_secs(15),
            max_consecutive_failures: 4,
            ..PollSettings::default()
        };
        let mut session = PollSession::default();
        let chain = session.restart();

        let mut delays = Vec::new();
        loop {
            assert!(session.begin_tick(chain, &settings));
            match session.on_failure(&settings) {
                AfterFailure::Retry(delay) => delays.push(delay),
                AfterFailure::GiveUp => break,
                AfterFailure::Exhausted => panic!("bound should not be reached"),
            }
        }
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(15)
            ]
        );
        assert!(!session.is_active());
    }

    #[test]
    fn success_resets_failure_streak() {
        let settings = PollSettings::default();
        let mut session = PollSession::default();
        let chain = session.restart();
        session.begin_tick(chain, &settings);
        session.on_failure(&settings);
        session.begin_tick(chain, &settings);
        assert_eq!(session.on_success(&settings), Some(settings.interval));
        session.begin_tick(chain, &settings);
        assert_eq!(
            session.on_failure(&settings),
            AfterFailure::Retry(settings.interval)
        );
    }

    #[test]
    fn zero_bound_never_fetches() {
        let settings = settings(0);
        let mut session = PollSession::default();
        let chain = session.restart();
        assert!(!session.begin_tick(chain, &settings));
        assert_eq!(session.retries(), 0);
        assert!(!session.is_active());
    }

    #[test]
    fn failure_on_the_last_allowed_fetch_ends_without_giving_up() {
        let settings = settings(2);
        let mut session = PollSession::default();
        let chain = session.restart();
        assert!(session.begin_tick(chain, &settings));
        assert_eq!(session.on_success(&settings), Some(settings.interval));
        assert!(session.begin_tick(chain, &settings));
        assert_eq!(session.on_failure(&settings), AfterFailure::Exhausted);
        assert!(!session.is_active());
    }
}
