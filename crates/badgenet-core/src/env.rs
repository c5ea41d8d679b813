//! Environment abstraction for deterministic testing.
//!
//! Decouples the pumps from system resources (time, randomness). The
//! simulation harness supplies a virtual clock and a seeded RNG; production
//! uses real system resources.

use std::time::Duration;

/// Abstract environment providing time, sleeps, and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within one execution context
/// - `sleep()` is the only way pump code suspends on time
/// - Given the same seed, simulation implementations produce the same byte
///   sequence from `random_bytes()`
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulations use
    /// virtual time (e.g. `tokio::time::Instant` under a paused clock).
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Suspend the calling task for the given duration.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Uniform random duration in `[0, max)`, for transmit backoff.
    fn random_jitter(&self, max: Duration) -> Duration {
        let nanos = max.as_nanos().max(1) as u64;
        Duration::from_nanos(self.random_u64() % nanos)
    }
}

/// Production environment backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
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

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::thread_rng().fill_bytes(buffer);
    }
}
