//! Resumable, externally-driven quicksort
//!
//! Sorting where the comparator lives with the caller. Each call to
//! [`step`] takes the complete [`QuickSortState`], does at most one unit of
//! work and returns the next state, which names the next comparison the caller
//! must answer. Between calls a state can be written to disk with
//! [`codec::save`] and read back with [`codec::load`], so a sort can be paused
//! across process restarts or network round-trips.
//!
//! ```
//! use restful_qsort::{step, Phase, QuickSortState, RandomPivot};
//!
//! let values: [f64; 5] = [4.8, 10.0, 1.0, 2.5, 5.0];
//! let mut pivots = RandomPivot::seeded(1);
//! let mut state = QuickSortState::new(values.len() as u32);
//! while !state.sorted {
//!     if let Phase::AwaitingComparison(req) = state.phase() {
//!         let ord = values[req.operand_id as usize].total_cmp(&values[req.pivot_id as usize]);
//!         state.answer(ord).unwrap();
//!     }
//!     state = step(&state, &mut pivots).unwrap();
//! }
//! assert_eq!(state.arr, vec![2, 3, 0, 4, 1]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod error;
pub mod config;

// Sort core
pub mod state;
pub mod pivot;
pub mod engine;
pub mod codec;

// Caller side
pub mod driver;
pub mod values;

// Re-export commonly used types
pub use error::{SortError, SortResult};
pub use config::{CompareMode, SortConfig};
pub use state::{validate, Comparison, ComparisonRequest, Phase, QuickSortState, Side, STACK_EMPTY};
pub use pivot::{FirstPivot, PivotSource, RandomPivot, ScriptedPivot};
pub use engine::step;
pub use codec::{load, save};
pub use driver::{DriveOutcome, Driver};

/// Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const SORT_FAILURE: i32 = 2;
