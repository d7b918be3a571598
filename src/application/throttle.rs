//! Randomized politeness delays
//!
//! Every network operation of a session is followed by a pause drawn from the
//! active [`DelayProfile`]. CI runs use a shorter profile.

use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

use crate::infrastructure::config::{DelayProfile, DelayRange};

/// Point in the session a pause belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseKind {
    /// Once, before the first request
    Startup,
    /// Between two listing pages of one endpoint
    ListingPage,
    /// After every detail page attempt
    Detail,
}

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, kind: PauseKind);
}

/// Sleeps a uniformly random duration within the profile's range
#[derive(Debug, Clone)]
pub struct RandomPacer {
    profile: DelayProfile,
}

impl RandomPacer {
    #[must_use]
    pub const fn new(profile: DelayProfile) -> Self {
        Self { profile }
    }

    const fn range(&self, kind: PauseKind) -> DelayRange {
        match kind {
            PauseKind::Startup => self.profile.startup,
            PauseKind::ListingPage => self.profile.listing_page,
            PauseKind::Detail => self.profile.detail,
        }
    }

    /// Draw a pause for `kind`
    #[must_use]
    pub fn draw(&self, kind: PauseKind) -> Duration {
        let range = self.range(kind);
        let (low, high) = if range.min_ms <= range.max_ms {
            (range.min_ms, range.max_ms)
        } else {
            (range.max_ms, range.min_ms)
        };
        Duration::from_millis(fastrand::u64(low..=high))
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self, kind: PauseKind) {
        let delay = self.draw(kind);
        trace!("Pausing {:?} for {} ms", kind, delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// Never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait]
impl Pacer for NoPause {
    async fn pause(&self, _kind: PauseKind) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::DelayConfig;

    #[test]
    fn draws_stay_within_the_profile() {
        let profile = DelayConfig::default().ci;
        let pacer = RandomPacer::new(profile);

        for _ in 0..200 {
            let detail = pacer.draw(PauseKind::Detail).as_millis();
            assert!((u128::from(profile.detail.min_ms)..=u128::from(profile.detail.max_ms)).contains(&detail));

            let startup = pacer.draw(PauseKind::Startup).as_millis();
            assert!(startup <= u128::from(profile.startup.max_ms));
        }
    }

    #[test]
    fn fixed_range_draws_exactly() {
        let fixed = DelayRange::new(3, 3);
        let pacer = RandomPacer::new(DelayProfile {
            startup: fixed,
            listing_page: fixed,
            detail: fixed,
        });
        assert_eq!(pacer.draw(PauseKind::ListingPage), Duration::from_millis(3));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_for_the_drawn_duration() {
        let fixed = DelayRange::new(1500, 1500);
        let pacer = RandomPacer::new(DelayProfile {
            startup: fixed,
            listing_page: fixed,
            detail: fixed,
        });

        let started = tokio::time::Instant::now();
        pacer.pause(PauseKind::Detail).await;
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
