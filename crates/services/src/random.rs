//! Injectable randomness for item selection.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the selector's random draws.
pub trait RandomSource: Send {
    /// Uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`. Only called with `len > 0`.
    fn next_index(&mut self, len: usize) -> usize;
}

/// `true` with probability `p`.
pub fn chance(rng: &mut dyn RandomSource, p: f64) -> bool {
    rng.next_unit() < p
}

/// Uniformly chosen element, `None` for an empty slice.
pub fn choose<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = rng.next_index(items.len()).min(items.len() - 1);
    items.get(idx)
}

/// `StdRng`-backed source; seed it for reproducible runs.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    #[must_use]
    pub fn from_os_rng() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.0.random::<f64>()
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// Replays queued draws, then falls back to fixed values.
///
/// Once the unit queue is empty every draw returns `fallback_unit`
/// (default `0.99`, so probes never fire); index draws fall back to `0`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
    fallback_unit: f64,
}

impl Default for ScriptedRandom {
    fn default() -> Self {
        Self {
            units: VecDeque::new(),
            indices: VecDeque::new(),
            fallback_unit: 0.99,
        }
    }
}

impl ScriptedRandom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }

    #[must_use]
    pub fn with_fallback_unit(mut self, unit: f64) -> Self {
        self.fallback_unit = unit;
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0) % len.max(1)
    }
}
