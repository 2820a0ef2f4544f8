//! Optional jittered delay applied to every reply before delivery.

use rand::Rng;
use tokio::time::Duration;

use crate::config::ThrottleConfig;

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min_ms: u64,
    max_ms: u64,
}

impl Throttle {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms,
        }
    }

    pub fn from_config(cfg: Option<&ThrottleConfig>) -> Option<Self> {
        cfg.map(|c| Self::new(c.min_ms, c.max_ms))
    }

    /// Uniform draw in `[min_ms, max_ms]`.
    pub fn next_delay(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    pub async fn pause(&self) {
        let d = self.next_delay();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}
