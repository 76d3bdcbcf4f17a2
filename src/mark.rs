//! Collector side of the sweep contract.

use core::ptr::NonNull;

/// Per-object mark state owned by the garbage collector.
///
/// The page only ever asks one question about an object, identified by the
/// address of its payload: was it marked during the last trace? Answering
/// `true` must also clear the mark so the object starts the next cycle
/// unmarked. The query is made at most once per object per sweep.
pub trait MarkState {
    /// Returns `true` if `object` is marked, clearing the mark as a side effect.
    fn try_reset_mark(&mut self, object: NonNull<u8>) -> bool;
}
