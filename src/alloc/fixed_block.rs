//! Contiguous fixed allocator: the whole embedded buffer is one block.

use core::alloc::Layout;
use core::fmt;
use core::mem;
use core::ptr::NonNull;

use super::{AlignedBuffer, DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::error::FixedError;

/// A block of contiguous storage handed out by [`FixedBlockAllocator`].
pub enum Block<T> {
    /// The allocator's embedded buffer, `N` slots.
    Local,
    /// A block from the overflow allocator.
    Overflow { ptr: NonNull<T>, capacity: usize },
}

impl<T> Block<T> {
    #[inline(always)]
    pub fn is_local(&self) -> bool {
        matches!(self, Block::Local)
    }
}

impl<T> Clone for Block<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Block<T> {}

impl<T> PartialEq for Block<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Block::Local, Block::Local) => true,
            (
                Block::Overflow { ptr: a, capacity: x },
                Block::Overflow { ptr: b, capacity: y },
            ) => a == b && x == y,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Local => f.write_str("Local"),
            Block::Overflow { ptr, capacity } => f
                .debug_struct("Overflow")
                .field("ptr", ptr)
                .field("capacity", capacity)
                .finish(),
        }
    }
}

/// Hands out the embedded buffer as a single block, then falls back to the
/// overflow allocator.
///
/// The buffer starts out claimed: a container built on this allocator begins
/// life using its local storage. Once the container moves its elements to an
/// overflow block and releases the buffer, [`has_overflowed`] reports `true`
/// until the buffer is claimed again.
///
/// With `OVERFLOW == false` a request that does not fit the buffer fails with
/// [`FixedError::CapacityExceeded`] instead of touching the overflow allocator.
///
/// [`has_overflowed`]: FixedAllocator::has_overflowed
pub struct FixedBlockAllocator<T, const N: usize, const OVERFLOW: bool, A = DefaultAllocator>
where
    A: OverflowAllocator,
{
    buffer: AlignedBuffer<T, N>,
    local_in_use: bool,
    overflow: A,
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator>
    FixedBlockAllocator<T, N, OVERFLOW, A>
{
    /// Creates the allocator with its embedded buffer already claimed.
    pub fn new(overflow: A) -> Self {
        Self {
            buffer: AlignedBuffer::new(),
            local_in_use: true,
            overflow,
        }
    }

    /// Allocates room for `capacity` elements.
    ///
    /// The embedded buffer is preferred whenever it is free and large enough.
    pub fn allocate(&mut self, capacity: usize) -> Result<Block<T>, FixedError> {
        if !self.local_in_use && capacity <= N {
            self.local_in_use = true;
            return Ok(Block::Local);
        }
        if !OVERFLOW {
            return Err(FixedError::CapacityExceeded {
                capacity: N,
                requested: capacity,
            });
        }
        let layout = Layout::array::<T>(capacity).map_err(|_| FixedError::CapacityOverflow)?;
        let ptr = self.overflow.allocate(layout)?;
        trace!(
            "fixed block: {} bytes from overflow allocator for {} elements",
            layout.size(),
            capacity
        );
        Ok(Block::Overflow {
            ptr: ptr.cast(),
            capacity,
        })
    }

    /// Releases `block`.
    ///
    /// # Safety
    /// `block` must have come from this allocator and hold no live values the
    /// caller still expects to drop.
    pub unsafe fn deallocate(&mut self, block: Block<T>) {
        match block {
            Block::Local => self.local_in_use = false,
            Block::Overflow { ptr, capacity } => {
                debug_assert!(!self.buffer.contains(ptr.as_ptr()));
                // SAFETY: the block was allocated with this layout.
                unsafe {
                    self.overflow
                        .deallocate(ptr.cast(), Self::overflow_layout(capacity));
                }
            }
        }
    }

    /// Releases a block named only by its address.
    ///
    /// Addresses inside the embedded buffer release the buffer; anything else
    /// is forwarded to the overflow allocator.
    ///
    /// # Safety
    /// As for [`deallocate`](Self::deallocate); `capacity` must match the
    /// overflow allocation when `ptr` is not local.
    pub unsafe fn deallocate_ptr(&mut self, ptr: NonNull<T>, capacity: usize) {
        let block = if self.buffer.contains(ptr.as_ptr()) {
            Block::Local
        } else {
            Block::Overflow { ptr, capacity }
        };
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.deallocate(block) }
    }

    /// Capacity of `block`, in elements.
    #[inline(always)]
    pub fn block_capacity(&self, block: &Block<T>) -> usize {
        match block {
            Block::Local => N,
            Block::Overflow { capacity, .. } => *capacity,
        }
    }

    /// First element of `block`.
    #[inline(always)]
    pub fn block_ptr(&self, block: &Block<T>) -> *const T {
        match block {
            Block::Local => self.buffer.as_ptr(),
            Block::Overflow { ptr, .. } => ptr.as_ptr(),
        }
    }

    #[inline(always)]
    pub fn block_mut_ptr(&mut self, block: &Block<T>) -> *mut T {
        match block {
            Block::Local => self.buffer.as_mut_ptr(),
            Block::Overflow { ptr, .. } => ptr.as_ptr(),
        }
    }

    /// Claims the embedded buffer again without releasing anything.
    ///
    /// Any outstanding overflow block is forgotten, not freed.
    pub(crate) fn reset(&mut self) {
        self.local_in_use = true;
    }

    #[inline]
    fn overflow_layout(capacity: usize) -> Layout {
        // SAFETY: the same layout was validated by `Layout::array` on allocation.
        unsafe {
            Layout::from_size_align_unchecked(mem::size_of::<T>() * capacity, mem::align_of::<T>())
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedAllocator
    for FixedBlockAllocator<T, N, OVERFLOW, A>
{
    type Overflow = A;

    #[inline(always)]
    fn local_capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    fn can_overflow(&self) -> bool {
        OVERFLOW
    }

    #[inline(always)]
    fn has_overflowed(&self) -> bool {
        !self.local_in_use
    }

    #[inline]
    fn owns(&self, ptr: *const u8) -> bool {
        self.buffer.contains(ptr as *const T)
    }

    fn overflow_allocator(&self) -> &A {
        &self.overflow
    }

    fn overflow_allocator_mut(&mut self) -> &mut A {
        &mut self.overflow
    }

    fn set_overflow_allocator(&mut self, allocator: A) {
        self.overflow = allocator;
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> fmt::Debug
    for FixedBlockAllocator<T, N, OVERFLOW, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBlockAllocator")
            .field("capacity", &N)
            .field("can_overflow", &OVERFLOW)
            .field("local_in_use", &self.local_in_use)
            .finish()
    }
}
