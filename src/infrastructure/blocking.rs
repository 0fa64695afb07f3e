//! Block detection and adaptive back-off
//!
//! The aggregator serves an interstitial error page instead of content once
//! it decides to rate-limit a client. Naive retry amplifies that, so this
//! controller trades latency for completion rate: delays grow linearly with
//! consecutive blocks, and a short deterministic cooldown lets the rate
//! limit window roll over once the threshold is hit.

use tracing::warn;

use crate::infrastructure::config::BlockingPolicy;

/// Case-insensitive substring match of a page heading against the marker
/// list. Shared with code paths that classify pages while the guard itself
/// is behind a lock.
pub fn heading_matches(markers: &[String], heading: &str) -> bool {
    let lowered = heading.to_lowercase();
    markers.iter().any(|m| lowered.contains(&m.to_lowercase()))
}

#[derive(Debug)]
pub struct BlockGuard {
    policy: BlockingPolicy,
    consecutive: u32,
}

impl BlockGuard {
    pub fn new(policy: BlockingPolicy) -> Self {
        Self { policy, consecutive: 0 }
    }

    /// Classify a page heading. Matching is case-insensitive substring
    /// search over the configured marker list.
    pub fn is_block_heading(&self, heading: &str) -> bool {
        heading_matches(&self.policy.markers, heading)
    }

    /// Record a detected block page.
    pub fn record_block(&mut self) -> u32 {
        self.consecutive += 1;
        warn!("Block page detected ({} consecutive)", self.consecutive);
        self.consecutive
    }

    /// Any successful page resets the streak.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Delay to apply before the next product fetch.
    pub fn current_delay_ms(&self) -> u64 {
        self.policy.base_delay_ms + u64::from(self.consecutive) * self.policy.delay_increment_ms
    }

    /// When the streak has reached the threshold, returns the cooldown to
    /// sleep and resets the counter. The caller performs the actual sleep.
    pub fn take_cooldown(&mut self) -> Option<u64> {
        if self.consecutive >= self.policy.threshold {
            self.consecutive = 0;
            Some(self.policy.cooldown_ms)
        } else {
            None
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> BlockGuard {
        BlockGuard::new(BlockingPolicy::default())
    }

    #[test]
    fn markers_match_case_insensitively() {
        let g = guard();
        assert!(g.is_block_heading("403 Forbidden"));
        assert!(g.is_block_heading("ACCESS DENIED"));
        assert!(g.is_block_heading("An Error Occurred"));
        assert!(!g.is_block_heading("Lounge Chair 20156"));
    }

    #[test]
    fn streak_grows_the_delay_linearly() {
        let mut g = guard();
        assert_eq!(g.current_delay_ms(), 2_000);

        g.record_block();
        g.record_block();
        assert_eq!(g.consecutive(), 2);
        assert_eq!(g.current_delay_ms(), 2_000 + 2 * 3_000);

        g.record_success();
        assert_eq!(g.consecutive(), 0);
        assert_eq!(g.current_delay_ms(), 2_000);
    }

    #[test]
    fn threshold_triggers_cooldown_and_resets() {
        let mut g = guard();
        g.record_block();
        g.record_block();
        assert_eq!(g.take_cooldown(), None);

        g.record_block();
        assert_eq!(g.take_cooldown(), Some(15_000));
        assert_eq!(g.consecutive(), 0);
        assert_eq!(g.take_cooldown(), None);
    }
}
