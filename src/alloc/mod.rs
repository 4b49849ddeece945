//! Allocator layer shared by every fixed container.
//!
//! A fixed container draws storage from a buffer embedded in the container
//! itself and, when that buffer is exhausted and overflow is enabled, from an
//! [`OverflowAllocator`]. Two pool shapes implement the common
//! [`FixedAllocator`] contract:
//!
//! * [`FixedBlockAllocator`] hands out the whole buffer as one contiguous
//!   block (vectors and strings).
//! * [`FixedPoolAllocator`] hands out fixed-size node slots from the buffer
//!   through a free list (the ordered map/set family).
//!
//! Neither pool stores a pointer into its own buffer: local storage is named
//! by state ([`Block::Local`], [`NodeRef::Local`]) and its address is derived
//! from `&self` on demand, so moving a container never leaves a dangling
//! pointer behind.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::AllocError;

pub mod counting;
pub mod fixed_block;
pub mod fixed_pool;
pub mod storage;

pub use counting::CountingAllocator;
pub use fixed_block::{Block, FixedBlockAllocator};
pub use fixed_pool::{FixedPoolAllocator, NodeRef};
pub use storage::AlignedBuffer;

/// A fallback allocator used once a fixed container's embedded buffer is full.
///
/// Equality means the two allocators are interchangeable: memory obtained
/// from one may be released through the other. The fixed-swap fast path
/// relies on it to exchange overflow blocks between containers.
pub trait OverflowAllocator: Clone + PartialEq {
    /// Allocates a block for `layout`.
    ///
    /// Zero-sized layouts must succeed with a dangling, well-aligned pointer.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block previously returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    /// `ptr` must come from this allocator (or one equal to it) with the same
    /// `layout`, and must not have been released already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Overflow allocator backed by the global allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DefaultAllocator;

impl OverflowAllocator for DefaultAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }
        // SAFETY: the layout has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::new(layout))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            // SAFETY: forwarded from the caller's contract.
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }
}

/// A dangling pointer aligned for `layout`.
#[inline]
pub(crate) fn dangling(layout: Layout) -> NonNull<u8> {
    // SAFETY: an alignment is never zero.
    unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
}

/// The contract shared by the contiguous and node-pool fixed allocators.
pub trait FixedAllocator {
    type Overflow: OverflowAllocator;

    /// Number of elements the embedded buffer holds.
    fn local_capacity(&self) -> usize;

    /// Whether requests beyond the embedded buffer go to the overflow allocator.
    fn can_overflow(&self) -> bool;

    /// Whether storage has switched to the overflow allocator.
    ///
    /// The flag is sticky: releasing overflow memory does not clear it, only
    /// an explicit reclaim or reset does.
    fn has_overflowed(&self) -> bool;

    /// Whether `ptr` points into the embedded buffer.
    fn owns(&self, ptr: *const u8) -> bool;

    fn overflow_allocator(&self) -> &Self::Overflow;

    fn overflow_allocator_mut(&mut self) -> &mut Self::Overflow;

    fn set_overflow_allocator(&mut self, allocator: Self::Overflow);

    /// Adopts `other`'s overflow allocator. The embedded buffer is never shared.
    fn copy_overflow_allocator(&mut self, other: &Self)
    where
        Self: Sized,
    {
        self.set_overflow_allocator(other.overflow_allocator().clone());
    }
}

/// Whether two fixed allocators may exchange their overflow storage directly.
#[inline]
pub(crate) fn overflow_swappable<F: FixedAllocator>(a: &F, b: &F) -> bool {
    a.has_overflowed() && b.has_overflowed() && a.overflow_allocator() == b.overflow_allocator()
}
