//! Raw storage embedded by value inside a fixed container.

use core::fmt;
use core::mem::{self, MaybeUninit};

/// Uninitialized storage for exactly `N` values of `T`, aligned for `T`.
///
/// The buffer has no behaviour of its own: it never constructs, drops or
/// frees anything. The owning allocator decides which slots hold live values.
#[repr(transparent)]
pub struct AlignedBuffer<T, const N: usize> {
    slots: [MaybeUninit<T>; N],
}

impl<T, const N: usize> AlignedBuffer<T, N> {
    /// Number of `T` slots.
    pub const CAPACITY: usize = N;

    #[inline]
    pub fn new() -> Self {
        Self {
            // SAFETY: an array of `MaybeUninit` needs no initialization.
            slots: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.slots.as_ptr() as *const T
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.slots.as_mut_ptr() as *mut T
    }

    /// Whether `ptr` points at a slot of this buffer.
    ///
    /// The start address is owned, the one-past-the-end address is not. For
    /// zero-sized `T` every slot shares the start address, so only that
    /// address is owned.
    #[inline]
    pub fn contains(&self, ptr: *const T) -> bool {
        let start = self.as_ptr() as usize;
        let addr = ptr as usize;
        if mem::size_of::<T>() == 0 {
            return N > 0 && addr == start;
        }
        let end = start + N * mem::size_of::<T>();
        addr >= start && addr < end
    }

    /// Slot index of `ptr`, if it points at the start of one of our slots.
    #[inline]
    pub fn index_of(&self, ptr: *const T) -> Option<usize> {
        if !self.contains(ptr) {
            return None;
        }
        let size = mem::size_of::<T>();
        if size == 0 {
            return Some(0);
        }
        let offset = ptr as usize - self.as_ptr() as usize;
        (offset % size == 0).then_some(offset / size)
    }

    /// Raw slot `index`. Debug-checked against `N`.
    #[inline(always)]
    pub(crate) fn slot(&self, index: usize) -> *const T {
        debug_assert!(index < N);
        // SAFETY: callers keep `index` within the buffer.
        unsafe { self.as_ptr().add(index) }
    }

    #[inline(always)]
    pub(crate) fn slot_mut(&mut self, index: usize) -> *mut T {
        debug_assert!(index < N);
        // SAFETY: callers keep `index` within the buffer.
        unsafe { self.as_mut_ptr().add(index) }
    }
}

impl<T, const N: usize> Default for AlignedBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for AlignedBuffer<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("addr", &self.as_ptr())
            .field("capacity", &N)
            .finish()
    }
}
