//! Medium page allocator for a tracing garbage collector
//!
//! This crate implements the "medium" page of a size-class allocator:
//! - A fixed-size slab carved into cells with in-place headers
//! - A free-list allocator with a bounded, wrap-around cursor scan
//! - A mark-driven sweep that reclaims dead objects and coalesces free runs
//! - A diagnostic invariant checker
//!
//! Deciding when to create, sweep or destroy a page, and which page serves
//! which request, belongs to the caller.

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Size of one cell-unit in bytes. Block sizes and headers are measured in cells.
pub const CELL_SIZE: usize = 8;

/// Size of a medium page slab in bytes.
pub const MEDIUM_PAGE_SIZE: usize = 256 * 1024;

/// Number of cells in a default medium page.
pub const MEDIUM_PAGE_CELL_COUNT: usize = MEDIUM_PAGE_SIZE / CELL_SIZE;

/// Alignment requested from the [`PageProvider`] for every slab.
pub const MEDIUM_PAGE_ALIGN: usize = CELL_SIZE;

/// The error type used by page providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Invalid `size` or alignment. (e.g. zero-sized layout)
    InvalidParam,
    /// No enough memory to allocate.
    NoMemory,
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

pub mod mark;
pub use mark::MarkState;

pub mod provider;
pub use provider::{PageProvider, SystemPageProvider};

pub mod medium;
pub use medium::{Cell, Cells, MediumPage};
#[cfg(feature = "tracking")]
pub use medium::{PageStats, PageStatsReporter};
