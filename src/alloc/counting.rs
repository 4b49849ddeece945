//! An overflow allocator that records how it is used.

use core::alloc::Layout;
use core::cell::Cell;
use core::fmt;
use core::ptr::NonNull;
use std::rc::Rc;

use super::{DefaultAllocator, OverflowAllocator};
use crate::error::AllocError;

#[derive(Default)]
struct Counters {
    allocations: Cell<usize>,
    deallocations: Cell<usize>,
    live_bytes: Cell<usize>,
    limit: Cell<Option<usize>>,
}

/// Wraps another overflow allocator and counts allocations, deallocations
/// and live bytes.
///
/// Clones share one set of counters and compare equal to each other, so a
/// single `CountingAllocator` handed to several containers behaves like one
/// shared overflow heap. Not thread-safe.
#[derive(Clone)]
pub struct CountingAllocator<A: OverflowAllocator = DefaultAllocator> {
    inner: A,
    counters: Rc<Counters>,
}

impl CountingAllocator<DefaultAllocator> {
    pub fn new() -> Self {
        Self::wrap(DefaultAllocator)
    }
}

impl<A: OverflowAllocator> CountingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            counters: Rc::default(),
        }
    }

    /// Number of successful `allocate` calls so far.
    pub fn allocations(&self) -> usize {
        self.counters.allocations.get()
    }

    pub fn deallocations(&self) -> usize {
        self.counters.deallocations.get()
    }

    /// Bytes currently allocated and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.counters.live_bytes.get()
    }

    /// Makes every request that would push live bytes past `limit` fail.
    pub fn set_limit(&self, limit: Option<usize>) {
        self.counters.limit.set(limit);
    }
}

impl Default for CountingAllocator<DefaultAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: OverflowAllocator> PartialEq for CountingAllocator<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.counters, &other.counters) && self.inner == other.inner
    }
}

impl<A: OverflowAllocator> fmt::Debug for CountingAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingAllocator")
            .field("allocations", &self.allocations())
            .field("deallocations", &self.deallocations())
            .field("live_bytes", &self.live_bytes())
            .finish()
    }
}

impl<A: OverflowAllocator> OverflowAllocator for CountingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let live = self.counters.live_bytes.get();
        if let Some(limit) = self.counters.limit.get() {
            if live + layout.size() > limit {
                return Err(AllocError::new(layout));
            }
        }
        let ptr = self.inner.allocate(layout)?;
        self.counters.allocations.set(self.allocations() + 1);
        self.counters.live_bytes.set(live + layout.size());
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.counters.deallocations.set(self.deallocations() + 1);
        self.counters
            .live_bytes
            .set(self.live_bytes().saturating_sub(layout.size()));
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_shared_counters() {
        let a = CountingAllocator::new();
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, CountingAllocator::new());

        let layout = Layout::new::<[u32; 4]>();
        let ptr = b.allocate(layout).unwrap();
        assert_eq!(a.allocations(), 1);
        assert_eq!(a.live_bytes(), 16);

        unsafe { a.deallocate(ptr, layout) };
        assert_eq!(b.deallocations(), 1);
        assert_eq!(b.live_bytes(), 0);
    }

    #[test]
    fn test_counting_limit_fails_request() {
        let a = CountingAllocator::new();
        a.set_limit(Some(8));
        let err = a.allocate(Layout::new::<[u64; 2]>()).unwrap_err();
        assert_eq!(err.size, 16);
        assert_eq!(a.allocations(), 0);

        let ok = a.allocate(Layout::new::<u64>()).unwrap();
        unsafe { a.deallocate(ok, Layout::new::<u64>()) };
    }
}
