//! Cell headers and views
//!
//! A block inside a medium page starts with a one-cell header recording the
//! block length in cells (header included) and whether the block is in use.
//! The payload starts right after the header.

use core::ptr::NonNull;

use crate::CELL_SIZE;

/// In-slab block header. Exactly one cell wide.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellHeader {
    is_allocated: u32,
    pub(crate) size: u32,
}

const _: () = assert!(core::mem::size_of::<CellHeader>() == CELL_SIZE);

impl CellHeader {
    pub const fn free(size: u32) -> Self {
        Self {
            is_allocated: 0,
            size,
        }
    }

    pub const fn allocated(size: u32) -> Self {
        Self {
            is_allocated: 1,
            size,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.is_allocated != 0
    }

    pub fn set_allocated(&mut self, allocated: bool) {
        self.is_allocated = allocated as u32;
    }
}

/// Read-only view of one block in a medium page.
///
/// A `Cell` is a snapshot: it does not borrow the page, and it is stale as
/// soon as the page is allocated from or swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    index: usize,
    size: u32,
    is_allocated: bool,
    data: NonNull<u8>,
}

impl Cell {
    pub(crate) fn new(index: usize, header: CellHeader, data: NonNull<u8>) -> Self {
        Self {
            index,
            size: header.size,
            is_allocated: header.is_allocated(),
            data,
        }
    }

    /// Slot index of the header within the page.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Block length in cells, header included. Zero only for the sentinel.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_allocated(&self) -> bool {
        self.is_allocated
    }

    /// Address of the first payload cell, the address the collector knows the object by.
    pub fn data(&self) -> NonNull<u8> {
        self.data
    }

    /// Number of payload cells available to the object.
    pub fn payload_cells(&self) -> u32 {
        self.size.saturating_sub(1)
    }

    /// Slot index of the following block, or the page's cell count for the last block.
    pub fn next_index(&self) -> usize {
        self.index + self.size as usize
    }
}
