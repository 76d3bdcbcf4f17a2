//! Medium page module
//!
//! This module provides the medium-object page of a garbage-collected heap:
//! - In-place cell headers over a single slab
//! - Cursor-accelerated free-list allocation
//! - Mark-driven sweeping with free block coalescing
//! - Occupancy statistics (with the `tracking` feature)

pub mod cell;
pub mod medium_page;
#[cfg(feature = "tracking")]
pub mod stats;

pub use cell::Cell;
pub use medium_page::{Cells, MediumPage};
#[cfg(feature = "tracking")]
pub use stats::{PageStats, PageStatsReporter};
