//! Uniform response selection among an intent's responses.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

pub struct ResponseSelector {
    rng: Mutex<StdRng>,
}

impl ResponseSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible selection for tests and `--seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::seeded)
    }

    /// One of `responses`, uniformly; `None` when there are none.
    pub fn choose(&self, responses: &[String]) -> Option<String> {
        match self.rng.lock() {
            Ok(mut rng) => responses.choose(&mut *rng).cloned(),
            // A poisoned lock still leaves a usable generator.
            Err(poisoned) => responses.choose(&mut *poisoned.into_inner()).cloned(),
        }
    }
}

impl Default for ResponseSelector {
    fn default() -> Self {
        Self::new()
    }
}
