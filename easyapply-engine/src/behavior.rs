//! Behavior Simulator: human-shaped pauses and incidental page activity.
//!
//! All timing randomness in the engine lives here. Content decisions never
//! consult it.
use easyapply_common::{ApplyError, EngineSettings};
use easyapply_drivers::Page;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Pauses never exceed this multiple of the base delay.
const MAX_DELAY_FACTOR: f64 = 5.0;
const VIEWPORT: (i64, i64) = (1280, 800);

pub struct BehaviorSimulator {
    base: Duration,
    sigma: f64,
    incidental_probability: f64,
    rng: StdRng,
    enabled: bool,
    cancel: CancellationToken,
}

impl BehaviorSimulator {
    /// Log-normal pacing around `settings.base_delay()`. Seeded when
    /// `settings.seed` is set.
    pub fn new(settings: &EngineSettings, cancel: CancellationToken) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            base: settings.base_delay(),
            sigma: finite_or_zero(settings.delay_sigma).max(0.0),
            incidental_probability: finite_or_zero(settings.incidental_action_probability)
                .clamp(0.0, 1.0),
            rng,
            enabled: true,
            cancel,
        }
    }

    /// No pauses and no incidental actions. [`suspend`](Self::suspend) still
    /// waits, so rate limiting keeps working.
    pub fn disabled(cancel: CancellationToken) -> Self {
        Self {
            base: Duration::ZERO,
            sigma: 0.0,
            incidental_probability: 0.0,
            rng: StdRng::seed_from_u64(0),
            enabled: false,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Draw the next pause: `exp(ln(base) + sigma * z)` with `z ~ N(0, 1)`,
    /// capped at a multiple of the base.
    pub fn next_delay(&mut self) -> Duration {
        if !self.enabled || self.base.is_zero() {
            return Duration::ZERO;
        }
        let base = self.base.as_secs_f64();
        let z = standard_normal(&mut self.rng);
        let secs = (base.ln() + self.sigma * z).exp();
        Duration::try_from_secs_f64(secs.min(base * MAX_DELAY_FACTOR)).unwrap_or(self.base)
    }

    /// Pause between filler operations, then maybe scroll or move the
    /// pointer. Incidental action failures are ignored.
    pub async fn pace(&mut self, page: &mut dyn Page) -> Result<(), ApplyError> {
        let delay = self.next_delay();
        self.suspend(delay).await?;

        if self.enabled && self.rng.gen_bool(self.incidental_probability) {
            let result = if self.rng.gen_bool(0.5) {
                let amount = self.rng.gen_range(100..=300);
                let dy = if self.rng.gen_bool(0.5) { amount } else { -amount };
                trace!(target: "easyapply.pace", dy, "incidental scroll");
                page.scroll_by(dy).await
            } else {
                let x = self.rng.gen_range(0..VIEWPORT.0);
                let y = self.rng.gen_range(0..VIEWPORT.1);
                trace!(target: "easyapply.pace", x, y, "incidental pointer move");
                page.move_pointer(x, y).await
            };
            if let Err(e) = result {
                debug!(target: "easyapply.pace", error = %e, "incidental action failed");
            }
        }
        Ok(())
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn suspend(&self, duration: Duration) -> Result<(), ApplyError> {
        if self.cancel.is_cancelled() {
            return Err(ApplyError::Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ApplyError::Cancelled),
            _ = sleep(duration) => Ok(()),
        }
    }
}

/// Box-Muller transform.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easyapply_drivers::fixture::{FixtureAction, FixturePage};
    use easyapply_drivers::PageSnapshot;

    fn settings(seed: u64) -> EngineSettings {
        EngineSettings {
            seed: Some(seed),
            base_delay_secs: 2.0,
            delay_sigma: 0.5,
            incidental_action_probability: 1.0,
            ..EngineSettings::default()
        }
    }

    #[test]
    fn seeded_delays_repeat() {
        let token = CancellationToken::new();
        let mut a = BehaviorSimulator::new(&settings(11), token.clone());
        let mut b = BehaviorSimulator::new(&settings(11), token);
        let xs: Vec<_> = (0..20).map(|_| a.next_delay()).collect();
        let ys: Vec<_> = (0..20).map(|_| b.next_delay()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn delays_are_centred_on_base_and_capped() {
        let mut sim = BehaviorSimulator::new(&settings(3), CancellationToken::new());
        let mut samples: Vec<f64> = (0..2001).map(|_| sim.next_delay().as_secs_f64()).collect();
        assert!(samples.iter().all(|s| *s > 0.0 && *s <= 10.0));
        samples.sort_by(|a, b| a.total_cmp(b));
        let median = samples[1000];
        assert!((1.6..2.5).contains(&median), "median {median}");
    }

    #[test]
    fn disabled_simulator_never_waits() {
        let mut sim = BehaviorSimulator::disabled(CancellationToken::new());
        assert_eq!(sim.next_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pace_performs_incidental_actions() {
        let mut sim = BehaviorSimulator::new(&settings(5), CancellationToken::new());
        let mut page = FixturePage::single(PageSnapshot::default());
        for _ in 0..5 {
            sim.pace(&mut page).await.unwrap();
        }
        assert_eq!(page.actions().len(), 5);
        assert!(page.actions().iter().all(|a| match a {
            FixtureAction::Scroll(dy) => (100..=300).contains(&dy.abs()),
            FixtureAction::Pointer(x, y) => *x < VIEWPORT.0 && *y < VIEWPORT.1,
            _ => false,
        }));
        assert_eq!(page.snapshot_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_finite_settings_degrade_to_no_pacing() {
        let settings = EngineSettings {
            seed: Some(1),
            base_delay_secs: f64::INFINITY,
            delay_sigma: f64::NAN,
            incidental_action_probability: f64::NAN,
            ..EngineSettings::default()
        };
        let mut sim = BehaviorSimulator::new(&settings, CancellationToken::new());
        assert_eq!(sim.next_delay(), Duration::ZERO);

        let mut page = FixturePage::single(PageSnapshot::default());
        sim.pace(&mut page).await.unwrap();
        assert!(page.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn suspend_is_interrupted_by_cancellation() {
        let token = CancellationToken::new();
        let sim = BehaviorSimulator::disabled(token.clone());
        let canceller = tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            token.cancel();
        });
        let started = tokio::time::Instant::now();
        let res = sim.suspend(Duration::from_secs(3600)).await;
        assert!(matches!(res, Err(ApplyError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(3600));
        canceller.await.unwrap();
    }
}
