//! Virtual-time environment with a seeded RNG.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use badgenet_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Simulation environment: tokio time (virtual under a paused clock) and
/// ChaCha8 randomness from a fixed seed.
///
/// Clones share the RNG, so one seed fixes the backoff sequence of every
/// node in the simulation.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Ok(mut rng) = self.rng.lock() {
            rng.fill_bytes(buffer);
        }
    }
}
