use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// Cap on credential tests per organization and provider, so a settings
/// page cannot hammer vendor APIs.
pub struct VerifyRateLimiter {
    /// (organization_id, provider) -> (count, window_start)
    entries: DashMap<(Uuid, String), (u32, Instant)>,
    limit: u32,
    window: Duration,
}

const CLEANUP_THRESHOLD: usize = 10_000;

impl VerifyRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Check if a test is allowed. Returns Ok(()) or Err with retry-after seconds.
    pub fn check(&self, organization_id: Uuid, provider: &str) -> Result<(), u64> {
        if self.entries.len() > CLEANUP_THRESHOLD {
            self.cleanup();
        }

        let now = Instant::now();
        let mut entry = self
            .entries
            .entry((organization_id, provider.to_string()))
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed).max(1));
        }

        *count += 1;
        Ok(())
    }

    /// Remove entries whose window has passed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) <= window);
    }
}

impl Default for VerifyRateLimiter {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}
