//! Room lifecycle sweeper.
//!
//! Periodic reaper over the room registry, independent of message
//! traffic. The registry already destroys rooms eagerly when the last
//! member leaves, so the sweeper is a backstop that bounds memory growth
//! if eager reclamation is ever skipped. It runs from the driver's
//! `Tick` event and rate-limits itself — the runtime may tick as fast
//! as it likes.

use std::time::Duration;

use crate::registry::RoomRegistry;

/// Sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Minimum time between sweeps.
    pub interval: Duration,
    /// How long an empty room may linger before it is reaped.
    pub retention: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(30), retention: Duration::from_secs(300) }
    }
}

/// Interval-gated retention reaper.
///
/// Generic over `I` (instant type) to support virtual time in tests.
#[derive(Debug)]
pub struct Sweeper<I = std::time::Instant> {
    config: SweeperConfig,
    last_sweep: Option<I>,
}

impl<I> Sweeper<I>
where
    I: Copy + Ord + std::ops::Sub<Output = Duration>,
{
    /// Create a sweeper that has not run yet (first tick sweeps).
    #[must_use]
    pub fn new(config: SweeperConfig) -> Self {
        Self { config, last_sweep: None }
    }

    /// Run a sweep if the interval has elapsed.
    ///
    /// Returns `None` when skipped, otherwise the number of rooms
    /// reaped.
    pub fn on_tick(&mut self, registry: &mut RoomRegistry<I>, now: I) -> Option<usize> {
        if let Some(last) = self.last_sweep {
            if now - last < self.config.interval {
                return None;
            }
        }

        self.last_sweep = Some(now);
        Some(registry.sweep(now, self.config.retention))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Millisecond-based instant for virtual time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct AtMs(u64);

    impl std::ops::Sub for AtMs {
        type Output = Duration;

        fn sub(self, rhs: Self) -> Duration {
            Duration::from_millis(self.0 - rhs.0)
        }
    }

    fn sweeper(interval_ms: u64, retention_ms: u64) -> Sweeper<AtMs> {
        Sweeper::new(SweeperConfig {
            interval: Duration::from_millis(interval_ms),
            retention: Duration::from_millis(retention_ms),
        })
    }

    #[test]
    fn first_tick_sweeps_immediately() {
        let mut registry = RoomRegistry::new();
        let mut sweeper = sweeper(100, 50);

        assert_eq!(sweeper.on_tick(&mut registry, AtMs(0)), Some(0));
    }

    #[test]
    fn ticks_inside_the_interval_are_skipped() {
        let mut registry = RoomRegistry::new();
        let mut sweeper = sweeper(100, 50);

        sweeper.on_tick(&mut registry, AtMs(0));
        assert_eq!(sweeper.on_tick(&mut registry, AtMs(60)), None);
        assert_eq!(sweeper.on_tick(&mut registry, AtMs(99)), None);
        assert_eq!(sweeper.on_tick(&mut registry, AtMs(100)), Some(0));
    }

    #[test]
    fn occupied_rooms_survive_every_sweep() {
        let mut registry = RoomRegistry::new();
        registry.join("busy", 1, vec![0; 32], None, AtMs(0));
        let mut sweeper = sweeper(10, 10);

        assert_eq!(sweeper.on_tick(&mut registry, AtMs(1_000_000)), Some(0));
        assert!(registry.has_room("busy"));
    }
}
