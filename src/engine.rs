//! One-step transition engine
//!
//! Iterative quicksort turned inside out: instead of calling a comparator,
//! each [`step`] interprets the answer the caller stored in `c`, moves the
//! partition forward by one unit and leaves the next request behind.
//!
//! Partitioning keeps the pivot at `low` for the whole scan. The right
//! pointer walks down while its element is greater than the pivot, the left
//! pointer walks up while its element is less; when both have stopped with
//! `i < j` the two elements are swapped. Once the pointers meet or cross the
//! pivot is swapped into `j`, which is then final, and the two sides are
//! pushed as new ranges.

use crate::error::{SortError, SortResult};
use crate::pivot::PivotSource;
use crate::state::{Comparison, QuickSortState, Side};
use tracing::{debug, trace};

/// Advance `state` by one unit of work.
///
/// Fails on a structurally invalid state, on cursors that do not fit the
/// range on top of the stack, and when the caller has not answered the
/// pending comparison. A finished state is returned unchanged.
pub fn step<P>(state: &QuickSortState, pivots: &mut P) -> SortResult<QuickSortState>
where
    P: PivotSource + ?Sized,
{
    state.validate()?;
    if state.sorted {
        return Ok(state.clone());
    }

    let mut next = state.clone();

    if next.stack_is_empty() {
        if next.c.is_answered() {
            return Err(SortError::protocol_violation(
                "comparison result supplied before any request",
            ));
        }
        initialize(&mut next, pivots)?;
        return Ok(next);
    }

    if !next.c.is_answered() {
        return Err(SortError::protocol_violation(
            "requested comparison was not answered",
        ));
    }

    let (low, high) = current_range(&next)?;
    match next.l {
        Side::J => scan_right(&mut next, low, high, pivots)?,
        Side::I => scan_left(&mut next, low, high, pivots)?,
    }
    Ok(next)
}

impl QuickSortState {
    /// Method form of [`step`]
    pub fn step<P>(&self, pivots: &mut P) -> SortResult<Self>
    where
        P: PivotSource + ?Sized,
    {
        step(self, pivots)
    }
}

fn initialize<P>(state: &mut QuickSortState, pivots: &mut P) -> SortResult<()>
where
    P: PivotSource + ?Sized,
{
    // A single element is already in order, and one stack slot cannot hold a range.
    if state.n == 1 {
        state.sorted = true;
        debug!(n = state.n, "single element, nothing to sort");
        return Ok(());
    }

    let high = state.n - 1;
    state.push_range(0, high)?;
    debug!(n = state.n, "sort initialized");
    reset_partition(state, 0, high, pivots);
    Ok(())
}

/// Range on top of the stack, after checking every pending range fits the
/// array and every cursor lies inside the top one
fn current_range(state: &QuickSortState) -> SortResult<(u32, u32)> {
    let (low, high) = state
        .top_range()
        .ok_or_else(|| SortError::invalid_state("stack top does not address a range"))?;
    // Lower ranges become the top once a partition resolves.
    for pair in state.stack[..=state.top as usize].chunks_exact(2) {
        let (range_low, range_high) = (pair[0], pair[1]);
        if range_low > range_high || range_high >= state.n {
            return Err(SortError::invalid_state(&format!(
                "range ({range_low}, {range_high}) outside 0..{}",
                state.n
            )));
        }
    }
    if state.p != low {
        return Err(SortError::invalid_state(&format!(
            "pivot {} is not at range start {low}",
            state.p
        )));
    }
    let inside = |x: u32| (low..=high).contains(&x);
    if !inside(state.i) || !inside(state.j) {
        return Err(SortError::invalid_state(&format!(
            "scan pointers i={} j={} outside range ({low}, {high})",
            state.i, state.j
        )));
    }
    Ok((low, high))
}

fn scan_right<P>(state: &mut QuickSortState, low: u32, high: u32, pivots: &mut P) -> SortResult<()>
where
    P: PivotSource + ?Sized,
{
    // The pivot itself sits at `low`, so a consistent comparator stops there anyway.
    if state.c == Comparison::Greater && state.j > low {
        state.j -= 1;
        state.c = Comparison::NotCompared;
        trace!(j = state.j, "right scan continues");
        return Ok(());
    }

    if state.i >= state.j {
        return resolve_partition(state, low, high, pivots);
    }

    state.l = Side::I;
    state.i += 1;
    state.c = Comparison::NotCompared;
    trace!(i = state.i, j = state.j, "right scan stopped, scanning left");
    Ok(())
}

fn scan_left<P>(state: &mut QuickSortState, low: u32, high: u32, pivots: &mut P) -> SortResult<()>
where
    P: PivotSource + ?Sized,
{
    if state.c == Comparison::Less && state.i < high {
        state.i += 1;
        state.c = Comparison::NotCompared;
        trace!(i = state.i, "left scan continues");
        return Ok(());
    }

    if state.i >= state.j {
        return resolve_partition(state, low, high, pivots);
    }

    state.arr.swap(state.i as usize, state.j as usize);
    state.l = Side::J;
    state.j -= 1;
    state.c = Comparison::NotCompared;
    trace!(i = state.i, j = state.j, "swapped, scanning right");
    Ok(())
}

fn resolve_partition<P>(
    state: &mut QuickSortState,
    low: u32,
    high: u32,
    pivots: &mut P,
) -> SortResult<()>
where
    P: PivotSource + ?Sized,
{
    let split = state.j;
    state.arr.swap(low as usize, split as usize);
    state.pop_range();

    // Right side goes in first so the left side is refined next.
    if split + 1 < high {
        state.push_range(split + 1, high)?;
    }
    if split != 0 && split - 1 > low {
        state.push_range(low, split - 1)?;
    }
    debug!(low, high, split, depth = state.stack_depth(), "partition resolved");

    match state.top_range() {
        Some((next_low, next_high)) => reset_partition(state, next_low, next_high, pivots),
        None => {
            state.sorted = true;
            state.c = Comparison::NotCompared;
            debug!(n = state.n, "sort complete");
        }
    }
    Ok(())
}

fn reset_partition<P>(state: &mut QuickSortState, low: u32, high: u32, pivots: &mut P)
where
    P: PivotSource + ?Sized,
{
    let pivot = pivots.pick(low, high).clamp(low, high);
    state.arr.swap(low as usize, pivot as usize);
    state.p = low;
    state.i = low;
    state.j = high;
    state.l = Side::J;
    state.c = Comparison::NotCompared;
    trace!(low, high, pivot, "partition reset");
}
