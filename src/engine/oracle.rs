use crate::model::{RecordId, SimConfig, UploadStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of the simulated upload's randomness.
///
/// The simulator asks for one increment per tick and exactly one decision per
/// record, when its progress reaches 100.
pub trait ProgressOracle: Send + Sync {
    fn next_increment(&self, id: &RecordId) -> f64;
    fn decide(&self, id: &RecordId) -> UploadStatus;
}

/// Uniform increments in `[0, max_increment)` and a Bernoulli failure draw.
pub struct RandomOracle {
    rng: Mutex<StdRng>,
    max_increment: f64,
    failure_rate: f64,
}

impl RandomOracle {
    pub fn new(max_increment: f64, failure_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        // Out-of-domain bounds would panic inside `gen_range`/`gen_bool`.
        let max_increment = if max_increment.is_finite() {
            max_increment.max(0.0)
        } else {
            0.0
        };
        let failure_rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        Self {
            rng: Mutex::new(rng),
            max_increment,
            failure_rate,
        }
    }

    pub fn from_config(cfg: &SimConfig) -> Self {
        Self::new(cfg.max_increment, cfg.failure_rate, cfg.seed)
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned RNG is still a usable RNG.
        let mut guard = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl ProgressOracle for RandomOracle {
    fn next_increment(&self, _id: &RecordId) -> f64 {
        if self.max_increment <= 0.0 {
            return 0.0;
        }
        let max = self.max_increment;
        self.with_rng(|rng| rng.gen_range(0.0..max))
    }

    fn decide(&self, _id: &RecordId) -> UploadStatus {
        let p = self.failure_rate;
        if self.with_rng(|rng| rng.gen_bool(p)) {
            UploadStatus::Error
        } else {
            UploadStatus::Completed
        }
    }
}
