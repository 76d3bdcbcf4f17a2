//! Raw memory provider for page slabs.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::{AllocError, AllocResult};

/// Source of whole page slabs.
///
/// A medium page asks for exactly one region when it is created and hands
/// it back when it is destroyed.
pub trait PageProvider {
    /// Allocate a zero-filled region matching `layout`.
    fn alloc_zeroed_page(&mut self, layout: Layout) -> AllocResult<NonNull<u8>>;

    /// Release a region previously returned by `alloc_zeroed_page` with the same `layout`.
    fn dealloc_page(&mut self, ptr: NonNull<u8>, layout: Layout);
}

/// Page provider backed by the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPageProvider;

impl PageProvider for SystemPageProvider {
    fn alloc_zeroed_page(&mut self, layout: Layout) -> AllocResult<NonNull<u8>> {
        if layout.size() == 0 {
            return Err(AllocError::InvalidParam);
        }
        let ptr = unsafe { alloc::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).ok_or(AllocError::NoMemory)
    }

    fn dealloc_page(&mut self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: `ptr` was returned by `alloc_zeroed_page` with this layout.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}
