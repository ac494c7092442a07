use easyapply_common::{ApplyError, BreakerScope, EngineSettings};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { since: Instant, cooldown: Duration },
    HalfOpen { probe_in_flight: bool },
}

impl CircuitState {
    pub fn label(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }
}

/// Consecutive step failures within one job.
#[derive(Debug, Clone)]
pub struct JobBreaker {
    threshold: u32,
    consecutive: u32,
    state: CircuitState,
}

impl JobBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
            state: CircuitState::Closed,
        }
    }

    /// Returns `true` when this failure opened the breaker.
    pub fn record_failure(&mut self, job_id: &str) -> bool {
        if self.is_open() {
            return false;
        }
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            self.state = CircuitState::Open {
                since: Instant::now(),
                cooldown: Duration::MAX,
            };
            warn!(
                target: "easyapply.breaker",
                scope = %BreakerScope::Job,
                job_id,
                failures = self.consecutive,
                "circuit opened"
            );
            return true;
        }
        false
    }

    pub fn record_success(&mut self) {
        if !self.is_open() {
            self.consecutive = 0;
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CircuitState::Open { .. })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }
}

/// How a job was let through the run breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    Normal,
    /// The single trial job allowed after a cooldown.
    Probe,
}

/// How a finished job affects the run breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobVerdict {
    Success,
    Failure,
    Neutral,
}

/// Consecutive whole-job failures across a run, with a half-open probe and
/// exponential cooldown.
#[derive(Debug, Clone)]
pub struct RunBreaker {
    threshold: u32,
    base_cooldown: Duration,
    max_cooldown: Duration,
    next_cooldown: Duration,
    consecutive: u32,
    state: CircuitState,
}

impl RunBreaker {
    pub fn new(threshold: u32, cooldown: Duration, max_cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            base_cooldown: cooldown,
            max_cooldown: max_cooldown.max(cooldown),
            next_cooldown: cooldown,
            consecutive: 0,
            state: CircuitState::Closed,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(
            settings.run_failure_threshold,
            settings.breaker_cooldown(),
            settings.max_breaker_cooldown(),
        )
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Ask to start a job at `now`.
    pub fn admit(&mut self, now: Instant) -> Result<Admission, ApplyError> {
        match self.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::Open { since, cooldown } => {
                let elapsed = now.saturating_duration_since(since);
                if elapsed >= cooldown {
                    self.transition(CircuitState::HalfOpen {
                        probe_in_flight: true,
                    });
                    Ok(Admission::Probe)
                } else {
                    Err(ApplyError::CircuitOpen {
                        scope: BreakerScope::Run,
                        retry_after: Some(cooldown - elapsed),
                    })
                }
            }
            CircuitState::HalfOpen { probe_in_flight } => {
                if probe_in_flight {
                    Err(ApplyError::CircuitOpen {
                        scope: BreakerScope::Run,
                        retry_after: None,
                    })
                } else {
                    self.state = CircuitState::HalfOpen {
                        probe_in_flight: true,
                    };
                    Ok(Admission::Probe)
                }
            }
        }
    }

    /// Fold a finished job into the breaker.
    pub fn record(&mut self, verdict: JobVerdict, now: Instant) {
        let half_open = matches!(self.state, CircuitState::HalfOpen { .. });
        match verdict {
            JobVerdict::Success => {
                self.consecutive = 0;
                if half_open {
                    self.next_cooldown = self.base_cooldown;
                    self.transition(CircuitState::Closed);
                }
            }
            JobVerdict::Failure => {
                self.consecutive += 1;
                if half_open {
                    self.next_cooldown = (self.next_cooldown * 2).min(self.max_cooldown);
                    self.open(now);
                } else if matches!(self.state, CircuitState::Closed)
                    && self.consecutive >= self.threshold
                {
                    self.open(now);
                }
            }
            JobVerdict::Neutral => {
                if half_open {
                    self.state = CircuitState::HalfOpen {
                        probe_in_flight: false,
                    };
                }
            }
        }
    }

    fn open(&mut self, now: Instant) {
        self.transition(CircuitState::Open {
            since: now,
            cooldown: self.next_cooldown,
        });
    }

    fn transition(&mut self, to: CircuitState) {
        let from = self.state;
        self.state = to;
        let cooldown_secs = match to {
            CircuitState::Open { cooldown, .. } => Some(cooldown.as_secs()),
            _ => None,
        };
        info!(
            target: "easyapply.breaker",
            scope = %BreakerScope::Run,
            from = from.label(),
            to = to.label(),
            consecutive_failures = self.consecutive,
            cooldown_secs,
            "circuit state changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOL: Duration = Duration::from_secs(300);

    fn breaker() -> RunBreaker {
        RunBreaker::new(2, COOL, Duration::from_secs(1000))
    }

    #[test]
    fn job_breaker_opens_at_threshold_and_resets_on_success() {
        let mut b = JobBreaker::new(3);
        assert!(!b.record_failure("j"));
        b.record_success();
        assert_eq!(b.consecutive_failures(), 0);
        assert!(!b.record_failure("j"));
        assert!(!b.record_failure("j"));
        assert!(b.record_failure("j"));
        assert!(b.is_open());
        b.record_success();
        assert!(b.is_open());
    }

    #[test]
    fn run_breaker_opens_and_rejects_until_cooldown() {
        let t0 = Instant::now();
        let mut b = breaker();
        b.record(JobVerdict::Failure, t0);
        assert_eq!(b.admit(t0).unwrap(), Admission::Normal);
        b.record(JobVerdict::Failure, t0);
        assert_eq!(b.state().label(), "open");

        match b.admit(t0 + Duration::from_secs(100)) {
            Err(ApplyError::CircuitOpen { scope, retry_after }) => {
                assert_eq!(scope, BreakerScope::Run);
                assert_eq!(retry_after, Some(Duration::from_secs(200)));
            }
            other => panic!("expected open circuit, got {other:?}"),
        }
    }

    #[test]
    fn half_open_admits_exactly_one_probe() {
        let t0 = Instant::now();
        let mut b = breaker();
        b.record(JobVerdict::Failure, t0);
        b.record(JobVerdict::Failure, t0);

        let later = t0 + COOL;
        assert_eq!(b.admit(later).unwrap(), Admission::Probe);
        assert!(b.admit(later).is_err());

        b.record(JobVerdict::Success, later);
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.admit(later).unwrap(), Admission::Normal);
    }

    #[test]
    fn failed_probe_doubles_cooldown_up_to_cap() {
        let t0 = Instant::now();
        let mut b = breaker();
        b.record(JobVerdict::Failure, t0);
        b.record(JobVerdict::Failure, t0);

        let mut now = t0;
        let mut cooldowns = Vec::new();
        for _ in 0..3 {
            let CircuitState::Open { since, cooldown } = b.state() else {
                panic!("breaker should be open");
            };
            cooldowns.push(cooldown);
            now = since + cooldown;
            assert_eq!(b.admit(now).unwrap(), Admission::Probe);
            b.record(JobVerdict::Failure, now);
        }
        assert_eq!(
            cooldowns,
            vec![COOL, Duration::from_secs(600), Duration::from_secs(1000)]
        );
        assert!(now > t0);
    }

    #[test]
    fn neutral_probe_releases_the_slot() {
        let t0 = Instant::now();
        let mut b = breaker();
        b.record(JobVerdict::Failure, t0);
        b.record(JobVerdict::Failure, t0);
        let later = t0 + COOL;
        b.admit(later).unwrap();
        b.record(JobVerdict::Neutral, later);
        assert_eq!(b.admit(later).unwrap(), Admission::Probe);
    }

    #[test]
    fn neutral_jobs_do_not_reset_the_failure_streak() {
        let t0 = Instant::now();
        let mut b = breaker();
        b.record(JobVerdict::Failure, t0);
        b.record(JobVerdict::Neutral, t0);
        b.record(JobVerdict::Failure, t0);
        assert_eq!(b.state().label(), "open");
    }
}
