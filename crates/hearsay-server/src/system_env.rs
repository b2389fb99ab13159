//! Production environment using system time and the OS RNG.

use std::time::Duration;

use hearsay_core::Environment;

/// Production [`Environment`]: `std::time::Instant` for monotonic time,
/// `tokio::time::sleep` for delays, `getrandom` for cryptographic
/// randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. Intentional: a relay without functioning
/// cryptographic randomness cannot mint unpredictable session ids, and
/// RNG failure indicates OS-level breakage no retry will fix.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable for a relay");
    }

    #[allow(clippy::expect_used)]
    fn wall_clock_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after the Unix epoch")
            .as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = env.now();

        assert!(t2 > t1);
    }

    #[test]
    fn random_bytes_differ_between_calls() {
        let env = SystemEnv::new();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);

        assert_ne!(a, b);
    }

    #[test]
    fn wall_clock_is_past_2023() {
        let env = SystemEnv::new();
        assert!(env.wall_clock_ms() > 1_672_531_200_000);
    }
}
