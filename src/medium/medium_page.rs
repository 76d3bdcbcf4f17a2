//! Medium page implementation.
//!
//! A medium page is one contiguous slab of cells. Slot 0 holds a zero-sized
//! sentinel; from slot 1 on, the slab is a chain of blocks, each starting
//! with a one-cell header whose size (in cells, header included) leads to the
//! next header. The chain ends exactly at the end of the slab.

use core::alloc::Layout;
use core::ptr::NonNull;

#[cfg(feature = "log")]
use log::{debug, error, info};

use super::cell::{Cell, CellHeader};
#[cfg(feature = "tracking")]
use super::stats::{PageStats, PageStatsReporter};
use crate::mark::MarkState;
use crate::provider::PageProvider;
use crate::{CELL_SIZE, MEDIUM_PAGE_ALIGN, MEDIUM_PAGE_CELL_COUNT};

/// Slot of the zero-sized sentinel block.
const SENTINEL: usize = 0;

/// First slot of the block chain.
const FIRST_BLOCK: usize = 1;

/// Free-list page of `CELL_COUNT` cells.
///
/// # Concurrency
///
/// The page takes no locks. Allocation and sweeping both need `&mut self`,
/// so a page has a single mutator at a time, and the collector may only
/// sweep it while no allocation on it is in flight. Spreading allocation
/// across threads means giving each thread its own pages.
///
/// # Lifetime
///
/// The slab is released only by [`MediumPage::destroy`]. A page that is
/// dropped without being destroyed leaks its slab.
pub struct MediumPage<const CELL_COUNT: usize = MEDIUM_PAGE_CELL_COUNT> {
    cells: NonNull<CellHeader>,
    /// Block favored for the next allocation. Always a block boundary or the sentinel.
    cur_block: usize,
}

// SAFETY: the page exclusively owns its slab and every mutation goes through `&mut self`.
unsafe impl<const CELL_COUNT: usize> Send for MediumPage<CELL_COUNT> {}

impl<const CELL_COUNT: usize> MediumPage<CELL_COUNT> {
    /// Layout of the slab requested from the page provider.
    pub fn layout() -> Layout {
        Layout::from_size_align(CELL_COUNT * CELL_SIZE, MEDIUM_PAGE_ALIGN)
            .expect("Invalid medium page layout")
    }

    /// Create a page holding one free block that spans the whole slab.
    ///
    /// # Panics
    ///
    /// Panics if `cell_count` does not leave room for the sentinel, i.e. is
    /// not strictly below `CELL_COUNT`, or if the provider cannot supply a slab.
    pub fn create(cell_count: u32, provider: &mut dyn PageProvider) -> Self {
        info!("medium page: create({})", cell_count);
        assert!(
            CELL_COUNT >= 2 && CELL_COUNT <= u32::MAX as usize,
            "medium page must hold between 2 and u32::MAX cells"
        );
        assert!(
            (cell_count as usize) < CELL_COUNT,
            "cell_count is too large for medium page"
        );

        let slab = match provider.alloc_zeroed_page(Self::layout()) {
            Ok(ptr) => ptr,
            Err(e) => panic!("medium page: failed to allocate slab: {:?}", e),
        };

        let mut page = Self {
            cells: slab.cast(),
            cur_block: SENTINEL,
        };
        // Size 0 ensures any allocation from the sentinel fails
        page.write_header(SENTINEL, CellHeader::free(0));
        page.write_header(FIRST_BLOCK, CellHeader::free((CELL_COUNT - 1) as u32));
        page
    }

    /// Release the slab back to `provider`.
    ///
    /// Objects still living in the page are not finalized.
    pub fn destroy(self, provider: &mut dyn PageProvider) {
        info!("medium page {:#x}: destroy", self.base_addr());
        provider.dealloc_page(self.cells.cast(), Self::layout());
    }

    /// Allocate a block with at least `block_size` payload cells.
    ///
    /// Returns the payload address, or `None` when no free block is large
    /// enough. `None` is the normal "page full" answer: the caller should
    /// try another page or collect.
    pub fn try_allocate(&mut self, block_size: u32) -> Option<NonNull<u8>> {
        debug!(
            "medium page {:#x}: try_allocate({})",
            self.base_addr(),
            block_size
        );
        debug_assert!(block_size > 0, "medium page: zero-sized allocation");
        // +1 for the header, since a block's size includes it
        let cells_needed = block_size.checked_add(1)?;
        if let Some(block) = self.try_allocate_at(self.cur_block, cells_needed) {
            return Some(block);
        }
        self.update_cur_block(cells_needed);
        let block = self.try_allocate_at(self.cur_block, cells_needed);
        if block.is_none() {
            self.print_alloc_failure_stats(cells_needed);
        }
        block
    }

    /// Reclaim unmarked objects and merge adjacent free blocks.
    ///
    /// Marks of surviving objects are cleared through `marks`. Returns
    /// whether any object survived; `false` means the page is empty and can
    /// be destroyed.
    ///
    /// Must not run while an allocation on this page is in progress.
    pub fn sweep(&mut self, marks: &mut dyn MarkState) -> bool {
        debug!("medium page {:#x}: sweep()", self.base_addr());
        let mut live = 0usize;
        let mut reclaimed = 0usize;

        let mut index = FIRST_BLOCK;
        while index != CELL_COUNT {
            let header = self.read_header(index);
            if header.is_allocated() {
                if marks.try_reset_mark(self.data_ptr(index)) {
                    live += 1;
                } else {
                    self.header_mut(index).set_allocated(false);
                    reclaimed += 1;
                }
            }
            index += header.size as usize;
        }

        let mut max_block = SENTINEL;
        let mut index = FIRST_BLOCK;
        while index != CELL_COUNT {
            let mut header = self.read_header(index);
            if !header.is_allocated() {
                loop {
                    let next = index + header.size as usize;
                    if next == CELL_COUNT {
                        break;
                    }
                    let next_header = self.read_header(next);
                    if next_header.is_allocated() {
                        break;
                    }
                    header.size += next_header.size;
                }
                self.header_mut(index).size = header.size;
                if header.size > self.read_header(max_block).size {
                    max_block = index;
                }
            }
            index += header.size as usize;
        }
        self.cur_block = max_block;

        debug!(
            "medium page {:#x}: sweep kept {} objects, reclaimed {}, largest free block at {}",
            self.base_addr(),
            live,
            reclaimed,
            max_block
        );
        live > 0
    }

    /// Walk the block chain and check that it tiles the slab exactly and
    /// that the cursor sits on a block boundary.
    ///
    /// Diagnostic only; intended for assertions and tests.
    pub fn check_invariants(&self) -> bool {
        if self.cur_block >= CELL_COUNT {
            error!(
                "medium page {:#x}: cursor {} out of bounds",
                self.base_addr(),
                self.cur_block
            );
            return false;
        }
        if self.read_header(SENTINEL).size != 0 {
            error!("medium page {:#x}: sentinel overwritten", self.base_addr());
            return false;
        }

        let mut cursor_seen = self.cur_block == SENTINEL;
        let mut index = FIRST_BLOCK;
        loop {
            cursor_seen |= index == self.cur_block;
            let next = index + self.read_header(index).size as usize;
            if next <= index || next > CELL_COUNT {
                error!(
                    "medium page {:#x}: block at {} has invalid successor {}",
                    self.base_addr(),
                    index,
                    next
                );
                return false;
            }
            if next == CELL_COUNT {
                break;
            }
            index = next;
        }

        if !cursor_seen {
            error!(
                "medium page {:#x}: cursor {} is not on a block boundary",
                self.base_addr(),
                self.cur_block
            );
        }
        cursor_seen
    }

    /// Iterate the block chain, starting after the sentinel.
    pub fn cells(&self) -> Cells<'_, CELL_COUNT> {
        Cells {
            page: self,
            index: FIRST_BLOCK,
        }
    }

    /// Block the next allocation will try first. May be the sentinel.
    pub fn current_block(&self) -> Cell {
        self.cell(self.cur_block)
    }

    /// Address of the slab.
    pub fn base_addr(&self) -> usize {
        self.cells.as_ptr() as usize
    }

    /// Whether `ptr` points into this page's slab.
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        addr >= self.base_addr() && addr < self.base_addr() + CELL_COUNT * CELL_SIZE
    }

    /// Get page occupancy statistics
    #[cfg(feature = "tracking")]
    pub fn stats(&self) -> PageStats {
        let mut stats = PageStats::new();
        for cell in self.cells() {
            stats.record(&cell);
        }
        stats
    }

    /// Carve `cells_needed` cells off the front of the free block at `index`.
    fn try_allocate_at(&mut self, index: usize, cells_needed: u32) -> Option<NonNull<u8>> {
        let header = self.read_header(index);
        if header.is_allocated() || header.size < cells_needed {
            return None;
        }

        let remainder = header.size - cells_needed;
        self.write_header(index, CellHeader::allocated(cells_needed));
        if remainder > 0 {
            let next = index + cells_needed as usize;
            self.write_header(next, CellHeader::free(remainder));
            self.cur_block = next;
        }
        Some(self.data_ptr(index))
    }

    /// Move the cursor to a free block of at least `cells_needed` cells.
    ///
    /// Scans forward from the cursor to the end of the slab, then from the
    /// first block back up to the cursor, stopping at the first free block
    /// that fits. This is first fit, not best fit. If nothing fits, the
    /// cursor is left on the largest free block seen (or the sentinel), so
    /// the retry fails straight away.
    fn update_cur_block(&mut self, cells_needed: u32) {
        debug!(
            "medium page {:#x}: update_cur_block({})",
            self.base_addr(),
            cells_needed
        );
        if self.cur_block == SENTINEL {
            // only used as a starting point
            self.cur_block = FIRST_BLOCK;
        }
        let start = self.cur_block;
        let mut max_block = SENTINEL;

        if let Some(block) = self.find_block(start, CELL_COUNT, cells_needed, &mut max_block) {
            self.cur_block = block;
            return;
        }
        debug!(
            "medium page {:#x}: update_cur_block: starting from beginning",
            self.base_addr()
        );
        if let Some(block) = self.find_block(FIRST_BLOCK, start, cells_needed, &mut max_block) {
            self.cur_block = block;
            return;
        }
        self.cur_block = max_block;
    }

    /// First free block in `[from, to)` of at least `cells_needed` cells.
    /// Free blocks larger than `max_block` replace it along the way.
    fn find_block(
        &self,
        from: usize,
        to: usize,
        cells_needed: u32,
        max_block: &mut usize,
    ) -> Option<usize> {
        let mut index = from;
        while index != to {
            let header = self.read_header(index);
            if !header.is_allocated() && header.size > self.read_header(*max_block).size {
                *max_block = index;
                if header.size >= cells_needed {
                    return Some(index);
                }
            }
            index += header.size as usize;
        }
        None
    }

    #[cfg(feature = "tracking")]
    fn print_alloc_failure_stats(&self, cells_needed: u32) {
        PageStatsReporter::print_alloc_failure_stats(self.base_addr(), cells_needed, &self.stats());
    }

    #[cfg(not(feature = "tracking"))]
    fn print_alloc_failure_stats(&self, _cells_needed: u32) {
        // No-op when tracking is disabled
    }

    fn cell(&self, index: usize) -> Cell {
        Cell::new(index, self.read_header(index), self.data_ptr(index))
    }

    fn read_header(&self, index: usize) -> CellHeader {
        debug_assert!(index < CELL_COUNT);
        unsafe { self.cells.as_ptr().add(index).read() }
    }

    fn header_mut(&mut self, index: usize) -> &mut CellHeader {
        debug_assert!(index < CELL_COUNT);
        unsafe { &mut *self.cells.as_ptr().add(index) }
    }

    fn write_header(&mut self, index: usize, header: CellHeader) {
        debug_assert!(index < CELL_COUNT);
        unsafe { self.cells.as_ptr().add(index).write(header) }
    }

    /// Payload address of the block at `index`: the slot right after its header.
    fn data_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < CELL_COUNT);
        // SAFETY: `index + 1 <= CELL_COUNT`, at most one past the end of the slab.
        unsafe { NonNull::new_unchecked(self.cells.as_ptr().add(index + 1).cast::<u8>()) }
    }
}

/// Iterator over the blocks of a [`MediumPage`], see [`MediumPage::cells`].
pub struct Cells<'a, const CELL_COUNT: usize> {
    page: &'a MediumPage<CELL_COUNT>,
    index: usize,
}

impl<const CELL_COUNT: usize> Iterator for Cells<'_, CELL_COUNT> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.index >= CELL_COUNT {
            return None;
        }
        let cell = self.page.cell(self.index);
        // A zero-sized block would loop forever; stop after reporting it.
        self.index = if cell.size() == 0 {
            CELL_COUNT
        } else {
            cell.next_index()
        };
        Some(cell)
    }
}

impl<const CELL_COUNT: usize> core::iter::FusedIterator for Cells<'_, CELL_COUNT> {}
