//! Sort state carried between invocations
//!
//! A [`QuickSortState`] is the whole world of one resumable sort: the
//! permutation being ordered, an explicit stack of pending `(low, high)`
//! ranges, and the cursors of the partition currently being refined. It is
//! handed to the engine, which returns the next version, and it can be
//! checkpointed with the codec at any point in between.

use crate::error::{SortError, SortResult};
use std::cmp::Ordering;

/// Marks an empty range stack
pub const STACK_EMPTY: u32 = u32::MAX;

/// Which scan pointer the pending comparison concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left pointer `i`
    I,
    /// Right pointer `j`
    J,
}

impl Side {
    /// Wire encoding of this side
    pub fn code(self) -> u32 {
        match self {
            Side::I => 0,
            Side::J => 1,
        }
    }
}

impl TryFrom<u32> for Side {
    type Error = SortError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Side::I),
            1 => Ok(Side::J),
            _ => Err(SortError::invalid_state(&format!(
                "scan side code {code} out of range"
            ))),
        }
    }
}

/// Outcome of comparing the scanned operand against the pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// No answer yet; the caller owes one
    NotCompared,
    Less,
    Greater,
    Equal,
}

impl Comparison {
    /// Wire encoding of this result
    pub fn code(self) -> u32 {
        match self {
            Comparison::NotCompared => 0,
            Comparison::Less => 1,
            Comparison::Greater => 2,
            Comparison::Equal => 3,
        }
    }

    pub fn is_answered(self) -> bool {
        self != Comparison::NotCompared
    }
}

impl TryFrom<u32> for Comparison {
    type Error = SortError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Comparison::NotCompared),
            1 => Ok(Comparison::Less),
            2 => Ok(Comparison::Greater),
            3 => Ok(Comparison::Equal),
            _ => Err(SortError::invalid_state(&format!(
                "comparison code {code} out of range"
            ))),
        }
    }
}

impl From<Ordering> for Comparison {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Comparison::Less,
            Ordering::Greater => Comparison::Greater,
            Ordering::Equal => Comparison::Equal,
        }
    }
}

/// The comparison the caller must perform before the next step.
///
/// The caller orders `operand_id` against `pivot_id` with its own comparator
/// and records the result with [`QuickSortState::answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub side: Side,
    /// Position of the scanned element (`i` or `j`)
    pub operand: u32,
    /// Position of the pivot
    pub pivot: u32,
    /// Element identifier stored at `operand`
    pub operand_id: u32,
    /// Element identifier stored at `pivot`
    pub pivot_id: u32,
}

/// Protocol phase, derived from the flat fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fresh state; the first step needs no comparison
    Init,
    /// A comparison has been requested and not answered yet
    AwaitingComparison(ComparisonRequest),
    /// The caller answered; the next step interprets the result
    HaveResult(ComparisonRequest, Comparison),
    /// `arr` is in its final order
    Done,
}

/// Complete, self-contained progress record of one resumable sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickSortState {
    /// Set once `arr` is fully ordered
    pub sorted: bool,
    /// Element count, fixed for the lifetime of the sort
    pub n: u32,
    /// Permutation of opaque element identifiers being sorted
    pub arr: Vec<u32>,
    /// Pending ranges as alternating `low`, `high` slots
    pub stack: Vec<u32>,
    /// Highest occupied stack slot, or [`STACK_EMPTY`]
    pub top: u32,
    /// Pivot position
    pub p: u32,
    /// Left scan pointer
    pub i: u32,
    /// Right scan pointer
    pub j: u32,
    /// Pointer the next comparison concerns
    pub l: Side,
    /// Result of the last requested comparison
    pub c: Comparison,
}

impl QuickSortState {
    /// Fresh state over the identity permutation `0..n`
    pub fn new(n: u32) -> Self {
        Self::from_order((0..n).collect())
    }

    /// Fresh state over a caller-supplied initial order
    pub fn from_order(arr: Vec<u32>) -> Self {
        let n = arr.len() as u32;
        Self {
            sorted: false,
            n,
            stack: vec![0; arr.len()],
            arr,
            top: STACK_EMPTY,
            p: 0,
            i: 0,
            j: 0,
            l: Side::I,
            c: Comparison::NotCompared,
        }
    }

    /// Reset all progress but keep the current order of `arr`
    pub fn restart(&mut self) {
        let arr = std::mem::take(&mut self.arr);
        *self = Self::from_order(arr);
    }

    /// Check the structural invariants: `n > 0` and both sequences sized `n`.
    ///
    /// Phase consistency is the engine's business, not checked here.
    pub fn validate(&self) -> SortResult<()> {
        if self.n == 0 {
            return Err(SortError::invalid_state("element count is zero"));
        }
        if self.arr.len() != self.n as usize {
            return Err(SortError::invalid_state(&format!(
                "arr holds {} elements, expected {}",
                self.arr.len(),
                self.n
            )));
        }
        if self.stack.len() != self.n as usize {
            return Err(SortError::invalid_state(&format!(
                "stack holds {} slots, expected {}",
                self.stack.len(),
                self.n
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn stack_is_empty(&self) -> bool {
        self.top == STACK_EMPTY
    }

    /// Number of ranges currently on the stack
    pub fn stack_depth(&self) -> usize {
        if self.stack_is_empty() {
            0
        } else {
            (self.top as usize + 1) / 2
        }
    }

    /// Range on top of the stack, if the stack holds a well-formed pair
    pub fn top_range(&self) -> Option<(u32, u32)> {
        if self.stack_is_empty() || self.top % 2 == 0 {
            return None;
        }
        let high = *self.stack.get(self.top as usize)?;
        let low = *self.stack.get(self.top as usize - 1)?;
        Some((low, high))
    }

    /// Push a range; fails if the stack has no room for two more slots
    pub fn push_range(&mut self, low: u32, high: u32) -> SortResult<()> {
        let next = self.top.wrapping_add(1) as usize;
        if next + 2 > self.stack.len() {
            return Err(SortError::invalid_state("range stack overflow"));
        }
        self.stack[next] = low;
        self.stack[next + 1] = high;
        self.top = (next + 1) as u32;
        Ok(())
    }

    /// Pop the top range
    pub fn pop_range(&mut self) -> Option<(u32, u32)> {
        let range = self.top_range()?;
        self.top = self.top.wrapping_sub(2);
        Some(range)
    }

    /// The comparison currently requested of the caller, if any
    pub fn request(&self) -> Option<ComparisonRequest> {
        if self.sorted || self.stack_is_empty() {
            return None;
        }
        let operand = match self.l {
            Side::I => self.i,
            Side::J => self.j,
        };
        Some(ComparisonRequest {
            side: self.l,
            operand,
            pivot: self.p,
            operand_id: *self.arr.get(operand as usize)?,
            pivot_id: *self.arr.get(self.p as usize)?,
        })
    }

    /// Explicit view of where the protocol stands
    pub fn phase(&self) -> Phase {
        if self.sorted {
            return Phase::Done;
        }
        match self.request() {
            None => Phase::Init,
            Some(request) if self.c.is_answered() => Phase::HaveResult(request, self.c),
            Some(request) => Phase::AwaitingComparison(request),
        }
    }

    /// Record the caller's answer to the pending request
    pub fn answer(&mut self, ordering: Ordering) -> SortResult<()> {
        match self.phase() {
            Phase::AwaitingComparison(_) => {
                self.c = Comparison::from(ordering);
                Ok(())
            }
            Phase::HaveResult(..) => Err(SortError::protocol_violation(
                "comparison already answered",
            )),
            Phase::Init | Phase::Done => Err(SortError::protocol_violation(
                "no comparison is pending",
            )),
        }
    }
}

/// Boolean form of [`QuickSortState::validate`]
pub fn validate(state: &QuickSortState) -> bool {
    state.is_valid()
}
