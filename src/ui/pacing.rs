use std::time::Duration;

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use tokio::time::sleep;

/// A pause drawn uniformly from `min..=max` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRange {
    pub min: f64,
    pub max: f64,
}

impl PauseRange {
    pub const fn fixed(secs: f64) -> Self {
        Self { min: secs, max: secs }
    }

    pub const fn between(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn draw(&self, rng: &mut impl Rng) -> Duration {
        let secs = if self.max > self.min { rng.gen_range(self.min..=self.max) } else { self.min };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Timeouts and human-like pauses for one posting attempt.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub enabled: bool,
    pub wait_timeout: Duration,
    pub advance_timeout: Duration,
    pub notice_timeout: Duration,
    pub optional_timeout: Duration,
    pub settle: PauseRange,
    pub after_click: PauseRange,
    pub intercept_backoff: PauseRange,
    pub after_navigation: PauseRange,
    pub between_fields: PauseRange,
    pub after_login: PauseRange,
    pub after_upload: PauseRange,
    pub after_advance: PauseRange,
    pub before_share: PauseRange,
    pub after_share: PauseRange,
    pub keystroke: PauseRange,
    pub verify_delay: PauseRange,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            enabled: true,
            wait_timeout: Duration::from_secs(15),
            advance_timeout: Duration::from_secs(10),
            notice_timeout: Duration::from_secs(7),
            optional_timeout: Duration::from_secs(5),
            settle: PauseRange::fixed(1.0),
            after_click: PauseRange::fixed(2.0),
            intercept_backoff: PauseRange::fixed(1.0),
            after_navigation: PauseRange::between(2.0, 5.0),
            between_fields: PauseRange::between(1.0, 3.0),
            after_login: PauseRange::fixed(10.0),
            after_upload: PauseRange::between(5.0, 8.0),
            after_advance: PauseRange::between(3.0, 5.0),
            before_share: PauseRange::between(20.0, 35.0),
            after_share: PauseRange::between(85.0, 95.0),
            keystroke: PauseRange::between(0.05, 0.1),
            verify_delay: PauseRange::fixed(2.0),
        }
    }
}

impl Pacing {
    /// Keeps the timeouts but never sleeps.
    pub fn instant() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn from_config(human_pacing: bool) -> Self {
        if human_pacing {
            Self::default()
        } else {
            Self::instant()
        }
    }

    pub async fn pause(&self, range: PauseRange) {
        if !self.enabled {
            return;
        }
        let mut rng = StdRng::from_rng(OsRng).unwrap_or_else(|_| StdRng::from_entropy());
        sleep(range.draw(&mut rng)).await;
    }
}
