//! Driving a sort to completion
//!
//! The caller side of the protocol: answer each request with a comparator,
//! step, repeat. Progress can be checkpointed every few steps so a drive that
//! is interrupted picks up where the last checkpoint left off.

use crate::codec;
use crate::config::SortConfig;
use crate::engine::step;
use crate::error::{SortError, SortResult};
use crate::pivot::{PivotSource, RandomPivot};
use crate::state::{Phase, QuickSortState};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of a finished drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOutcome {
    /// Terminal state; `arr` holds the final order
    pub state: QuickSortState,
    /// Calls to `step` made by this drive
    pub steps: u64,
    /// Comparisons answered by this drive
    pub comparisons: u64,
}

impl DriveOutcome {
    pub fn order(&self) -> &[u32] {
        &self.state.arr
    }
}

/// Drives sorts according to a [`SortConfig`]
pub struct Driver {
    config: SortConfig,
}

impl Driver {
    pub fn new(config: SortConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Pivot source for this configuration
    pub fn pivots(&self) -> RandomPivot {
        RandomPivot::new(self.config.seed)
    }

    /// Resume from the configured checkpoint if it exists, else start fresh
    pub fn resume_or_new(&self, n: u32) -> SortResult<QuickSortState> {
        let Some(checkpoint) = &self.config.checkpoint else {
            return Ok(QuickSortState::new(n));
        };
        if !Path::new(checkpoint).exists() {
            return Ok(QuickSortState::new(n));
        }

        let state = codec::load(checkpoint)?;
        if state.n != n {
            return Err(SortError::invalid_state(&format!(
                "checkpoint {checkpoint} tracks {} elements, input has {n}",
                state.n
            )));
        }
        info!(checkpoint = %checkpoint, sorted = state.sorted, "resuming from checkpoint");
        Ok(state)
    }

    /// Answer and step until the sort is done.
    ///
    /// `compare(a, b)` orders element `a` against element `b`; the configured
    /// reverse flag is applied on top of it.
    pub fn drive<P, F>(
        &self,
        mut state: QuickSortState,
        pivots: &mut P,
        mut compare: F,
    ) -> SortResult<DriveOutcome>
    where
        P: PivotSource + ?Sized,
        F: FnMut(u32, u32) -> Ordering,
    {
        let interval = self.config.checkpoint_interval;
        let mut steps = 0u64;
        let mut comparisons = 0u64;

        while !state.sorted {
            if let Some(limit) = self.config.max_steps {
                if steps >= limit {
                    warn!(limit, "step limit reached, stopping drive");
                    self.checkpoint(&state)?;
                    return Err(SortError::step_limit_exceeded(limit));
                }
            }

            if let Phase::AwaitingComparison(request) = state.phase() {
                let ordering = compare(request.operand_id, request.pivot_id);
                let ordering = if self.config.reverse {
                    ordering.reverse()
                } else {
                    ordering
                };
                state.answer(ordering)?;
                comparisons += 1;
            }

            state = step(&state, pivots)?;
            steps += 1;

            if interval > 0 && steps % interval == 0 {
                self.checkpoint(&state)?;
            }
        }

        self.checkpoint(&state)?;
        debug!(n = state.n, steps, comparisons, "drive finished");
        Ok(DriveOutcome {
            state,
            steps,
            comparisons,
        })
    }

    /// Sort identifiers `0..n`, resuming from the checkpoint if configured
    pub fn sort_ids<F>(&self, n: u32, compare: F) -> SortResult<DriveOutcome>
    where
        F: FnMut(u32, u32) -> Ordering,
    {
        let state = self.resume_or_new(n)?;
        self.drive(state, &mut self.pivots(), compare)
    }

    /// Drive independent sorts in parallel, one state per job.
    ///
    /// `compare(job, a, b)` orders elements within job `job`. Results come
    /// back in job order.
    pub fn drive_many<F>(&self, counts: &[u32], compare: F) -> SortResult<Vec<SortResult<DriveOutcome>>>
    where
        F: Fn(usize, u32, u32) -> Ordering + Sync,
    {
        let threads = self.config.effective_thread_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SortError::thread_pool_error(&e.to_string()))?;
        debug!(jobs = counts.len(), threads, "driving sorts in parallel");

        let outcomes = pool.install(|| {
            counts
                .par_iter()
                .enumerate()
                .map(|(job, &n)| {
                    let driver = Driver::new(self.config.for_job(job));
                    let mut pivots = driver.pivots();
                    driver.drive(QuickSortState::new(n), &mut pivots, |a, b| compare(job, a, b))
                })
                .collect()
        });
        Ok(outcomes)
    }

    fn checkpoint(&self, state: &QuickSortState) -> SortResult<()> {
        match &self.config.checkpoint {
            Some(path) => codec::save(path, state),
            None => Ok(()),
        }
    }
}

/// Sort identifiers `0..n` with a fixed pivot seed and no checkpointing
pub fn sort_ids<F>(n: u32, seed: u64, compare: F) -> SortResult<Vec<u32>>
where
    F: FnMut(u32, u32) -> Ordering,
{
    let driver = Driver::new(SortConfig::new().with_seed(Some(seed)));
    Ok(driver.sort_ids(n, compare)?.state.arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SortConfigBuilder;
    use crate::pivot::FirstPivot;
    use tempfile::TempDir;

    const EXAMPLE: [f64; 5] = [4.8, 10.0, 1.0, 2.5, 5.0];

    fn by_example(a: u32, b: u32) -> Ordering {
        EXAMPLE[a as usize].total_cmp(&EXAMPLE[b as usize])
    }

    #[test]
    fn test_sort_ids_example() -> SortResult<()> {
        assert_eq!(sort_ids(5, 1, by_example)?, vec![2, 3, 0, 4, 1]);
        Ok(())
    }

    #[test]
    fn test_drive_counts_steps() -> SortResult<()> {
        let driver = Driver::new(SortConfig::new());
        let outcome = driver.drive(QuickSortState::new(5), &mut FirstPivot, by_example)?;
        assert_eq!(outcome.order(), &[2, 3, 0, 4, 1]);
        assert_eq!(outcome.steps, 11);
        assert_eq!(outcome.comparisons, 10);
        Ok(())
    }

    #[test]
    fn test_reverse_order() -> SortResult<()> {
        let driver = Driver::new(SortConfigBuilder::new().reverse().seed(2).build()?);
        let outcome = driver.sort_ids(5, by_example)?;
        assert_eq!(outcome.order(), &[1, 4, 0, 3, 2]);
        Ok(())
    }

    #[test]
    fn test_step_limit_then_resume() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let checkpoint = temp_dir.path().join("drive.bin").to_string_lossy().to_string();

        let limited = Driver::new(
            SortConfigBuilder::new()
                .seed(4)
                .checkpoint(checkpoint.clone())
                .max_steps(3)
                .build()?,
        );
        let err = limited.sort_ids(5, by_example).unwrap_err();
        assert!(matches!(err, SortError::StepLimitExceeded { limit: 3 }));

        let saved = codec::load(&checkpoint)?;
        assert!(!saved.sorted);

        let resumed = Driver::new(
            SortConfigBuilder::new()
                .seed(4)
                .checkpoint(checkpoint.clone())
                .checkpoint_interval(2)
                .build()?,
        );
        let outcome = resumed.sort_ids(5, by_example)?;
        assert_eq!(outcome.order(), &[2, 3, 0, 4, 1]);
        assert!(codec::load(&checkpoint)?.sorted);
        Ok(())
    }

    #[test]
    fn test_resume_rejects_size_mismatch() -> SortResult<()> {
        let temp_dir = TempDir::new()?;
        let checkpoint = temp_dir.path().join("other.bin");
        codec::save(&checkpoint, &QuickSortState::new(3))?;

        let driver = Driver::new(
            SortConfig::new().with_checkpoint(Some(checkpoint.to_string_lossy().to_string())),
        );
        assert!(driver.resume_or_new(5).unwrap_err().is_invalid_state());
        Ok(())
    }

    #[test]
    fn test_drive_many_in_parallel() -> SortResult<()> {
        let inputs: Vec<Vec<i64>> = vec![
            vec![5, 3, 9, 1],
            vec![2],
            (0..300).map(|x| (x * 7919) % 263).collect(),
        ];
        let counts: Vec<u32> = inputs.iter().map(|v| v.len() as u32).collect();

        let driver = Driver::new(SortConfigBuilder::new().seed(8).parallel_threads(2).build()?);
        let outcomes = driver.drive_many(&counts, |job, a, b| {
            inputs[job][a as usize].cmp(&inputs[job][b as usize])
        })?;

        assert_eq!(outcomes.len(), 3);
        for (job, outcome) in outcomes.into_iter().enumerate() {
            let outcome = outcome?;
            let sorted: Vec<i64> = outcome.order().iter().map(|&id| inputs[job][id as usize]).collect();
            let mut expected = inputs[job].clone();
            expected.sort();
            assert_eq!(sorted, expected);
        }
        Ok(())
    }
}
