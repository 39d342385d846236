//! Profile generators shared by the benchmarks.

use std::time::Duration;

use loadramp_core::{BatchSchedule, Stage};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Seed used by every generator so runs are comparable.
pub const DEFAULT_SEED: u64 = 42;

/// Highest concurrency level generated profiles reach.
pub const MAX_LEVEL: u32 = 200;

/// Random literal profile with `stages` stages of 1 to 60 seconds each.
///
/// Levels move by at most a quarter of [`MAX_LEVEL`] per stage, which keeps
/// the batch stack deep enough to be interesting.
pub fn random_profile(stages: usize, seed: u64) -> Vec<Stage> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level: u32 = 0;
    let step = MAX_LEVEL / 4;

    (0..stages)
        .map(|_| {
            let low = level.saturating_sub(step);
            let high = (level + step).min(MAX_LEVEL);
            level = rng.gen_range(low..=high);
            Stage::ramp(level, Duration::from_secs(rng.gen_range(1..=60)))
        })
        .collect()
}

/// Saw-tooth profile: `teeth` rises to `peak` and falls back to zero.
pub fn sawtooth_profile(teeth: usize, peak: u32, period: Duration) -> Vec<Stage> {
    (0..teeth)
        .flat_map(|_| [Stage::ramp(peak, period), Stage::ramp(0, period)])
        .collect()
}

/// Staircase of `steps` rises of `height` threads, each held for `hold`.
pub fn staircase_profile(steps: usize, height: u32, ramp: Duration, hold: Duration) -> Vec<Stage> {
    (1..=steps)
        .flat_map(|step| {
            let level = height * step as u32;
            [Stage::ramp(level, ramp), Stage::ramp(level, hold)]
        })
        .collect()
}

/// Compiled schedule for `random_profile(stages, seed)`.
///
/// # Panics
///
/// Panics if decomposition fails, which generated profiles never trigger.
pub fn random_schedule(stages: usize, seed: u64) -> BatchSchedule {
    loadramp_compiler::BatchDecomposer::new()
        .decompose(&random_profile(stages, seed))
        .expect("generated profiles are literal")
}
