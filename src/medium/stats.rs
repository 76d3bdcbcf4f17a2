//! Statistics and debugging for medium pages
//!
//! Provides a per-page occupancy summary and failure reporting.

use super::cell::Cell;

/// Medium page occupancy, in cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub total_cells: usize,
    pub free_cells: usize,
    pub allocated_cells: usize,
    pub free_blocks: usize,
    pub allocated_blocks: usize,
    pub largest_free_block: usize,
}

impl PageStats {
    pub const fn new() -> Self {
        Self {
            total_cells: 0,
            free_cells: 0,
            allocated_cells: 0,
            free_blocks: 0,
            allocated_blocks: 0,
            largest_free_block: 0,
        }
    }

    /// Account for one block of the chain
    pub fn record(&mut self, cell: &Cell) {
        let size = cell.size() as usize;
        self.total_cells += size;
        if cell.is_allocated() {
            self.allocated_cells += size;
            self.allocated_blocks += 1;
        } else {
            self.free_cells += size;
            self.free_blocks += 1;
            self.largest_free_block = self.largest_free_block.max(size);
        }
    }

    /// Add statistics from another page
    pub fn add(&mut self, other: &PageStats) {
        self.total_cells += other.total_cells;
        self.free_cells += other.free_cells;
        self.allocated_cells += other.allocated_cells;
        self.free_blocks += other.free_blocks;
        self.allocated_blocks += other.allocated_blocks;
        self.largest_free_block = self.largest_free_block.max(other.largest_free_block);
    }
}

/// Page state reporter
pub struct PageStatsReporter;

impl PageStatsReporter {
    /// Print page state after a failed allocation.
    ///
    /// Exhaustion is routine for a page, so this logs at debug level.
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(page_addr: usize, cells_needed: u32, stats: &PageStats) {
        #[cfg(feature = "log")]
        use log::debug;
        debug!("----------------------------------------");
        debug!(
            "medium page {:#x}: no block of {} cells",
            page_addr, cells_needed
        );
        debug!(
            "  Free cells: {} / {} in {} blocks",
            stats.free_cells, stats.total_cells, stats.free_blocks
        );
        debug!("  Largest free block: {} cells", stats.largest_free_block);
        debug!(
            "  Allocated cells: {} in {} blocks",
            stats.allocated_cells, stats.allocated_blocks
        );
        debug!("----------------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::super::cell::CellHeader;
    use super::*;
    use core::ptr::NonNull;

    #[test]
    fn test_record_and_add() {
        let data = NonNull::<u64>::dangling().cast::<u8>();
        let mut stats = PageStats::new();
        stats.record(&Cell::new(1, CellHeader::allocated(3), data));
        stats.record(&Cell::new(4, CellHeader::free(7), data));
        stats.record(&Cell::new(11, CellHeader::free(2), data));

        assert_eq!(stats.total_cells, 12);
        assert_eq!(stats.allocated_cells, 3);
        assert_eq!(stats.allocated_blocks, 1);
        assert_eq!(stats.free_cells, 9);
        assert_eq!(stats.free_blocks, 2);
        assert_eq!(stats.largest_free_block, 7);

        let mut total = PageStats::default();
        total.add(&stats);
        total.add(&stats);
        assert_eq!(total.total_cells, 24);
        assert_eq!(total.free_blocks, 4);
        assert_eq!(total.largest_free_block, 7);
    }
}
