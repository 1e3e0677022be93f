//! Pivot selection for partition resets
//!
//! The engine never draws randomness on its own; every reset asks a
//! [`PivotSource`] for a position inside the range. Seeding the source makes
//! a whole sort reproducible.

use crate::state::QuickSortState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Supplies the pivot position for a range `[low, high]`
pub trait PivotSource {
    /// Pick a position in `low..=high`
    fn pick(&mut self, low: u32, high: u32) -> u32;
}

impl<F> PivotSource for F
where
    F: FnMut(u32, u32) -> u32,
{
    fn pick(&mut self, low: u32, high: u32) -> u32 {
        self(low, high)
    }
}

/// Uniformly random pivot
#[derive(Debug, Clone)]
pub struct RandomPivot {
    rng: StdRng,
}

impl RandomPivot {
    /// Reproducible source
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded if a seed is given, entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Source for one `step` of a sort whose steps run in separate processes.
    ///
    /// The seed is folded with the position recorded in `state`, so resets at
    /// different points of the sort draw from different streams while a given
    /// state and seed always pick the same pivot.
    pub fn for_step(seed: Option<u64>, state: &QuickSortState) -> Self {
        match seed {
            Some(seed) => Self::seeded(step_seed(seed, state)),
            None => Self::from_entropy(),
        }
    }
}

fn step_seed(seed: u64, state: &QuickSortState) -> u64 {
    let pending = state.stack.get(..=state.top as usize).unwrap_or(&[]);
    [state.top, state.p, state.i, state.j]
        .iter()
        .chain(pending)
        .fold(mix(seed), |acc, &word| mix(acc ^ u64::from(word)))
}

/// splitmix64 finalizer
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

impl PivotSource for RandomPivot {
    fn pick(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}

/// Always the leftmost position
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPivot;

impl PivotSource for FirstPivot {
    fn pick(&mut self, low: u32, _high: u32) -> u32 {
        low
    }
}

/// Replays recorded offsets from `low`, then falls back to `low`.
///
/// Offsets that overshoot the range are clamped to `high`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPivot {
    offsets: Vec<u32>,
    next: usize,
}

impl ScriptedPivot {
    pub fn new(offsets: Vec<u32>) -> Self {
        Self { offsets, next: 0 }
    }

    /// Offsets not yet consumed
    pub fn remaining(&self) -> usize {
        self.offsets.len().saturating_sub(self.next)
    }
}

impl PivotSource for ScriptedPivot {
    fn pick(&mut self, low: u32, high: u32) -> u32 {
        let offset = self.offsets.get(self.next).copied().unwrap_or(0);
        self.next += 1;
        low.saturating_add(offset).min(high)
    }
}
