//! Contiguous vector whose first `N` elements live inside the vector itself.
//!
//! Provides [`FixedVec`]: elements are stored in an embedded, aligned buffer
//! of `N` slots. When `OVERFLOW` is `true` (the default) growth past `N`
//! moves the elements to a block from the overflow allocator; when it is
//! `false`, growing past `N` panics and [`try_push`](FixedVec::try_push) /
//! [`try_reserve`](FixedVec::try_reserve) report the condition instead.
//! Because it `Deref`s to `[T]`, all slice methods are available directly.
//!
//! ```
//! use fixed_collections::FixedVec;
//!
//! let mut v: FixedVec<i32, 4> = FixedVec::new();
//! v.extend([1, 2, 3, 4]);
//! assert!(v.full());
//! assert!(!v.has_overflowed());
//!
//! v.push(5);
//! assert!(v.has_overflowed());
//! assert_eq!(v[4], 5);
//! ```

use core::borrow::{Borrow, BorrowMut};
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::mem::{self, MaybeUninit};
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

use crate::alloc::{overflow_swappable, Block, DefaultAllocator, FixedAllocator, FixedBlockAllocator, OverflowAllocator};
use crate::config::grown_capacity;
use crate::error::{fail, FixedError};
use crate::swap::FixedSwap;

/// A vector with an embedded buffer of `N` elements and optional overflow.
///
/// # Generic parameters
/// | Parameter | Meaning |
/// |-----------|--------|
/// | `T` | Element type |
/// | `N` | Elements held in the embedded buffer |
/// | `OVERFLOW` | Whether growth past `N` uses the overflow allocator |
/// | `A` | Overflow allocator |
///
/// # Overflow state
/// The vector starts on its embedded buffer. The first growth past `N` moves
/// it to overflow storage and [`has_overflowed`](Self::has_overflowed)
/// becomes `true`. Removing elements does not move them back: only
/// [`clear_with(true)`](Self::clear_with), [`set_capacity`](Self::set_capacity)
/// (and [`shrink_to_fit`](Self::shrink_to_fit)) with a capacity of at most
/// `N`, and [`reset_lose_memory`](Self::reset_lose_memory) return the vector
/// to its buffer.
pub struct FixedVec<T, const N: usize, const OVERFLOW: bool = true, A: OverflowAllocator = DefaultAllocator> {
    len: usize,
    block: Block<T>,
    alloc: FixedBlockAllocator<T, N, OVERFLOW, A>,
}

// SAFETY: the vector uniquely owns its elements and its overflow block.
unsafe impl<T: Send, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Send> Send
    for FixedVec<T, N, OVERFLOW, A>
{
}

// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Sync> Sync
    for FixedVec<T, N, OVERFLOW, A>
{
}

impl<T, const N: usize, const OVERFLOW: bool> FixedVec<T, N, OVERFLOW, DefaultAllocator> {
    pub fn new() -> Self {
        Self::new_in(DefaultAllocator)
    }

    /// Creates an empty vector able to hold `capacity` elements without
    /// reallocating.
    ///
    /// # Panics
    /// When `capacity > N` and overflow is disabled.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, DefaultAllocator)
    }

    /// A vector of `n` clones of `value`.
    pub fn from_elem(value: T, n: usize) -> Self
    where
        T: Clone,
    {
        let mut vec = Self::with_capacity(n);
        vec.resize(n, value);
        vec
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedVec<T, N, OVERFLOW, A> {
    /// Creates an empty vector that overflows into `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self {
            len: 0,
            block: Block::Local,
            alloc: FixedBlockAllocator::new(alloc),
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut vec = Self::new_in(alloc);
        vec.reserve(capacity);
        vec
    }

    /// Moves every element out of `source` into a new vector.
    ///
    /// The new vector copies `source`'s overflow allocator and places the
    /// elements in its own buffer when they fit. `source` is left empty and
    /// back on its embedded buffer, with its overflow block released.
    pub fn take_from(source: &mut Self) -> Self {
        let mut vec = Self::new_in(source.alloc.overflow_allocator().clone());
        vec.reserve(source.len);
        // SAFETY: capacity was reserved; `source` forgets the moved elements.
        unsafe {
            ptr::copy_nonoverlapping(source.as_ptr(), vec.as_mut_ptr(), source.len);
            vec.len = source.len;
            source.len = 0;
        }
        source.release_overflow();
        vec
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements the current storage holds: `N` on the embedded buffer, the
    /// block size once overflowed.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.alloc.block_capacity(&self.block)
    }

    /// The fixed capacity `N`, independent of the overflow state.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        N
    }

    /// `true` once `N` elements are stored or the vector has overflowed.
    #[inline]
    pub fn full(&self) -> bool {
        self.len >= N || self.alloc.has_overflowed()
    }

    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.alloc.has_overflowed()
    }

    #[inline(always)]
    pub fn can_overflow(&self) -> bool {
        OVERFLOW
    }

    pub fn overflow_allocator(&self) -> &A {
        self.alloc.overflow_allocator()
    }

    pub fn overflow_allocator_mut(&mut self) -> &mut A {
        self.alloc.overflow_allocator_mut()
    }

    /// Replaces the overflow allocator.
    ///
    /// An overflow block already held is released through the new allocator,
    /// so it should compare equal to the old one.
    pub fn set_overflow_allocator(&mut self, alloc: A) {
        self.alloc.set_overflow_allocator(alloc);
    }

    pub fn copy_overflow_allocator(&mut self, other: &Self) {
        self.alloc.copy_overflow_allocator(&other.alloc);
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *const T {
        self.alloc.block_ptr(&self.block)
    }

    #[inline(always)]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        let block = self.block;
        self.alloc.block_mut_ptr(&block)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first `len` slots are initialized.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// The uninitialized tail of the current storage.
    pub fn spare_capacity_mut(&mut self) -> &mut [MaybeUninit<T>] {
        let spare = self.capacity() - self.len;
        // SAFETY: slots `len..capacity` belong to the current block.
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr().add(self.len) as *mut MaybeUninit<T>, spare) }
    }

    /// Sets the length without touching the elements.
    ///
    /// # Safety
    /// `new_len` must not exceed [`capacity`](Self::capacity) and the first
    /// `new_len` elements must be initialized.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    // --- growth ---

    /// Moves the elements into a block of `capacity` slots, preferring the
    /// embedded buffer when it is free and large enough.
    fn try_reallocate(&mut self, capacity: usize) -> Result<(), FixedError> {
        debug_assert!(capacity >= self.len);
        let old = self.block;
        let new = self.alloc.allocate(capacity)?;
        // SAFETY: both blocks hold at least `len` slots and never overlap;
        // the old block is released only after its elements were moved.
        unsafe {
            let dst = self.alloc.block_mut_ptr(&new);
            let src = self.alloc.block_ptr(&old);
            ptr::copy_nonoverlapping(src, dst, self.len);
            self.alloc.deallocate(old);
        }
        self.block = new;
        match (old.is_local(), new.is_local()) {
            (true, false) => {
                trace!("fixed vec: {} elements moved to overflow storage (capacity {})", self.len, capacity);
            }
            (false, true) => {
                trace!("fixed vec: {} elements moved back to the embedded buffer", self.len);
            }
            _ => {}
        }
        Ok(())
    }

    fn try_grow(&mut self, additional: usize) -> Result<(), FixedError> {
        let required = self.len.checked_add(additional).ok_or(FixedError::CapacityOverflow)?;
        let capacity = self.capacity();
        if required <= capacity {
            return Ok(());
        }
        if !OVERFLOW {
            return Err(FixedError::CapacityExceeded {
                capacity: N,
                requested: required,
            });
        }
        self.try_reallocate(grown_capacity(capacity, required))
    }

    /// Ensures room for `additional` more elements.
    ///
    /// # Panics
    /// When the vector cannot overflow and `len + additional > N`.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_grow(additional) {
            fail(err);
        }
    }

    /// Fallible form of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), FixedError> {
        self.try_grow(additional)
    }

    /// Changes the capacity to `n`, moving elements as needed.
    ///
    /// Elements past `n` are dropped. With overflow enabled, a vector that
    /// has overflowed (or is asked for more than `N`) is reallocated; a
    /// request of at most `N` brings it back to the embedded buffer and
    /// clears the overflow flag. Without overflow the capacity stays `N`.
    pub fn set_capacity(&mut self, n: usize) {
        if n < self.len {
            self.truncate(n);
        }
        if OVERFLOW && n != self.capacity() && (self.has_overflowed() || n > N) {
            if let Err(err) = self.try_reallocate(n) {
                fail(err);
            }
        }
    }

    /// Releases unused overflow capacity, moving back into the embedded
    /// buffer when the elements fit.
    pub fn shrink_to_fit(&mut self) {
        if !self.block.is_local() {
            self.set_capacity(self.len);
        }
    }

    /// Frees the overflow block of an empty vector and reclaims the buffer.
    fn release_overflow(&mut self) {
        debug_assert_eq!(self.len, 0);
        if !self.block.is_local() {
            // SAFETY: the vector is empty, nothing in the block is live.
            unsafe { self.alloc.deallocate(self.block) };
            self.alloc.reset();
            self.block = Block::Local;
            trace!("fixed vec: overflow storage released");
        }
    }

    // --- element operations ---

    /// Appends `value`.
    ///
    /// # Panics
    /// When the vector is at capacity and overflow is disabled.
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.len == self.capacity() {
            self.reserve(1);
        }
        // SAFETY: there is room for one more element.
        unsafe { self.push_unchecked(value) }
    }

    /// Appends `value`, or hands it back when the vector cannot grow.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.len == self.capacity() && self.try_grow(1).is_err() {
            return Err(value);
        }
        // SAFETY: there is room for one more element.
        unsafe { self.push_unchecked(value) };
        Ok(())
    }

    /// Appends `value` without checking the capacity.
    ///
    /// # Safety
    /// `len()` must be less than `capacity()`.
    #[inline(always)]
    pub unsafe fn push_unchecked(&mut self, value: T) {
        debug_assert!(self.len < self.capacity(), "push_unchecked past capacity");
        // SAFETY: guaranteed by the caller.
        unsafe { self.as_mut_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: the slot at the old last index is initialized and now
        // outside the length.
        Some(unsafe { self.as_ptr().add(self.len).read() })
    }

    /// # Panics
    /// When `index > len`, or on capacity exhaustion as for [`push`](Self::push).
    pub fn insert(&mut self, index: usize, element: T) {
        let len = self.len;
        assert!(index <= len, "insertion index (is {index}) should be <= len (is {len})");
        if len == self.capacity() {
            self.reserve(1);
        }
        // SAFETY: room was reserved; the tail is shifted up by one first.
        unsafe {
            let p = self.as_mut_ptr().add(index);
            ptr::copy(p, p.add(1), len - index);
            p.write(element);
        }
        self.len = len + 1;
    }

    /// # Panics
    /// When `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "removal index (is {index}) should be < len (is {len})");
        // SAFETY: `index` is in bounds; the tail is shifted down over it.
        unsafe {
            let p = self.as_mut_ptr().add(index);
            let value = p.read();
            ptr::copy(p.add(1), p, len - index - 1);
            self.len = len - 1;
            value
        }
    }

    /// Removes the element at `index`, replacing it with the last one.
    ///
    /// # Panics
    /// When `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        let len = self.len;
        assert!(index < len, "swap_remove index (is {index}) should be < len (is {len})");
        // SAFETY: both `index` and `len - 1` are in bounds.
        unsafe {
            let base = self.as_mut_ptr();
            let value = base.add(index).read();
            ptr::copy(base.add(len - 1), base.add(index), 1);
            self.len = len - 1;
            value
        }
    }

    /// Drops the elements past `len`; storage is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let tail = self.len - len;
        self.len = len;
        // SAFETY: the tail was initialized and is now outside the length.
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.as_mut_ptr().add(len), tail);
            ptr::drop_in_place(tail);
        }
    }

    /// Drops every element. Overflow storage is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Drops every element and, when `free_overflow` is set, releases the
    /// overflow block and moves back to the embedded buffer.
    pub fn clear_with(&mut self, free_overflow: bool) {
        self.clear();
        if free_overflow {
            self.release_overflow();
        }
    }

    /// Returns to the empty, embedded-buffer state without dropping elements
    /// or freeing the overflow block.
    ///
    /// Live elements and overflow memory are leaked. Intended for vectors
    /// whose contents are managed elsewhere.
    pub fn reset_lose_memory(&mut self) {
        if self.len != 0 || !self.block.is_local() {
            debug!(
                "fixed vec: abandoning {} elements (overflow block held: {})",
                self.len,
                !self.block.is_local()
            );
        }
        self.len = 0;
        self.block = Block::Local;
        self.alloc.reset();
    }

    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut make: F) {
        if new_len <= self.len {
            self.truncate(new_len);
            return;
        }
        self.reserve(new_len - self.len);
        while self.len < new_len {
            // SAFETY: room was reserved.
            unsafe { self.push_unchecked(make()) };
        }
    }

    /// Keeps only the elements for which `keep` returns `true`, in order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        let len = self.len;
        // a panic in `keep` leaks the elements instead of double-dropping
        self.len = 0;
        let base = self.as_mut_ptr();
        let mut kept = 0;
        for i in 0..len {
            // SAFETY: every index below `len` is visited once; kept elements
            // are compacted below `i`.
            unsafe {
                let cur = base.add(i);
                if keep(&*cur) {
                    if kept != i {
                        ptr::copy_nonoverlapping(cur, base.add(kept), 1);
                    }
                    kept += 1;
                } else {
                    ptr::drop_in_place(cur);
                }
            }
        }
        self.len = kept;
    }

    /// Moves the elements into a `Vec`.
    pub fn into_vec(mut self) -> Vec<T> {
        let mut vec = Vec::with_capacity(self.len);
        // SAFETY: the elements are moved out once; `self` forgets them before
        // it drops and releases its storage.
        unsafe {
            ptr::copy_nonoverlapping(self.as_ptr(), vec.as_mut_ptr(), self.len);
            vec.set_len(self.len);
            self.len = 0;
        }
        vec
    }
}

impl<T: Clone, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedVec<T, N, OVERFLOW, A> {
    pub fn resize(&mut self, new_len: usize, value: T) {
        self.resize_with(new_len, || value.clone());
    }

    pub fn extend_from_slice(&mut self, other: &[T]) {
        self.reserve(other.len());
        for item in other {
            // SAFETY: room was reserved.
            unsafe { self.push_unchecked(item.clone()) };
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedSwap for FixedVec<T, N, OVERFLOW, A> {
    fn fixed_swap(&mut self, other: &mut Self) {
        if ptr::eq(self, other) {
            return;
        }
        if overflow_swappable(&self.alloc, &other.alloc) {
            trace!("fixed vec swap: exchanging overflow blocks");
            mem::swap(&mut self.block, &mut other.block);
            mem::swap(&mut self.len, &mut other.len);
            return;
        }
        trace!("fixed vec swap: element-wise ({} and {} elements)", self.len, other.len);
        let (short, long) = if self.len <= other.len { (self, other) } else { (other, self) };
        let common = short.len;
        let extra = long.len - common;
        short.as_mut_slice().swap_with_slice(&mut long.as_mut_slice()[..common]);
        short.reserve(extra);
        // SAFETY: the tail of `long` moves into reserved room in `short` and
        // is forgotten by `long`.
        unsafe {
            ptr::copy_nonoverlapping(long.as_ptr().add(common), short.as_mut_ptr().add(common), extra);
            long.len = common;
            short.len = common + extra;
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Drop for FixedVec<T, N, OVERFLOW, A> {
    fn drop(&mut self) {
        self.clear();
        if !self.block.is_local() {
            // SAFETY: the block is empty and owned by this vector.
            unsafe { self.alloc.deallocate(self.block) };
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Deref for FixedVec<T, N, OVERFLOW, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> DerefMut for FixedVec<T, N, OVERFLOW, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Clone for FixedVec<T, N, OVERFLOW, A> {
    fn clone(&self) -> Self {
        let mut vec = Self::new_in(self.alloc.overflow_allocator().clone());
        vec.extend_from_slice(self);
        vec
    }
}

impl<T: fmt::Debug, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> fmt::Debug
    for FixedVec<T, N, OVERFLOW, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_slice(), f)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> Default for FixedVec<T, N, OVERFLOW, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, U, const N: usize, const M: usize, const O1: bool, const O2: bool, A, B> PartialEq<FixedVec<U, M, O2, B>>
    for FixedVec<T, N, O1, A>
where
    T: PartialEq<U>,
    A: OverflowAllocator,
    B: OverflowAllocator,
{
    fn eq(&self, other: &FixedVec<U, M, O2, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<[U]> for FixedVec<T, N, OVERFLOW, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, U, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<&[U]> for FixedVec<T, N, OVERFLOW, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T, U, const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<[U; M]>
    for FixedVec<T, N, OVERFLOW, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &[U; M]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<Vec<U>> for FixedVec<T, N, OVERFLOW, A>
where
    T: PartialEq<U>,
{
    fn eq(&self, other: &Vec<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Eq for FixedVec<T, N, OVERFLOW, A> {}

impl<T: PartialOrd, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialOrd for FixedVec<T, N, OVERFLOW, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

impl<T: Ord, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Ord for FixedVec<T, N, OVERFLOW, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T: Hash, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Hash for FixedVec<T, N, OVERFLOW, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Extend<T> for FixedVec<T, N, OVERFLOW, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if OVERFLOW {
            self.reserve(lower);
        }
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Extend<&'a T>
    for FixedVec<T, N, OVERFLOW, A>
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> FromIterator<T>
    for FixedVec<T, N, OVERFLOW, A>
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::default();
        vec.extend(iter);
        vec
    }
}

impl<T, const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<[T; M]>
    for FixedVec<T, N, OVERFLOW, A>
{
    fn from(values: [T; M]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Clone, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<&[T]>
    for FixedVec<T, N, OVERFLOW, A>
{
    fn from(values: &[T]) -> Self {
        let mut vec = Self::default();
        vec.extend_from_slice(values);
        vec
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<Vec<T>> for FixedVec<T, N, OVERFLOW, A> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> From<FixedVec<T, N, OVERFLOW, A>> for Vec<T> {
    fn from(vec: FixedVec<T, N, OVERFLOW, A>) -> Self {
        vec.into_vec()
    }
}

#[cfg(feature = "heapless")]
impl<T, const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<heapless::Vec<T, M>>
    for FixedVec<T, N, OVERFLOW, A>
{
    fn from(values: heapless::Vec<T, M>) -> Self {
        values.into_iter().collect()
    }
}

#[cfg(feature = "heapless")]
impl<T, const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator> TryFrom<FixedVec<T, N, OVERFLOW, A>>
    for heapless::Vec<T, M>
{
    type Error = FixedVec<T, N, OVERFLOW, A>;

    /// Fails, returning the vector untouched, when it holds more than `M`
    /// elements.
    fn try_from(vec: FixedVec<T, N, OVERFLOW, A>) -> Result<Self, Self::Error> {
        if vec.len() > M {
            return Err(vec);
        }
        let mut out = heapless::Vec::new();
        for item in vec {
            if out.push(item).is_err() {
                unreachable!("length was checked against the heapless capacity");
            }
        }
        Ok(out)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> AsRef<[T]> for FixedVec<T, N, OVERFLOW, A> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> AsMut<[T]> for FixedVec<T, N, OVERFLOW, A> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Borrow<[T]> for FixedVec<T, N, OVERFLOW, A> {
    fn borrow(&self) -> &[T] {
        self
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> BorrowMut<[T]> for FixedVec<T, N, OVERFLOW, A> {
    fn borrow_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<'a, T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> IntoIterator for &'a FixedVec<T, N, OVERFLOW, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> IntoIterator
    for &'a mut FixedVec<T, N, OVERFLOW, A>
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> IntoIterator for FixedVec<T, N, OVERFLOW, A> {
    type Item = T;
    type IntoIter = IntoIter<T, N, OVERFLOW, A>;

    fn into_iter(mut self) -> Self::IntoIter {
        let end = self.len;
        // the iterator owns the elements from here on
        self.len = 0;
        IntoIter {
            vec: self,
            start: 0,
            end,
        }
    }
}

/// Owning iterator over the elements of a [`FixedVec`].
pub struct IntoIter<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> {
    vec: FixedVec<T, N, OVERFLOW, A>,
    start: usize,
    end: usize,
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> IntoIter<T, N, OVERFLOW, A> {
    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `start..end` is initialized and not yet yielded.
        unsafe { slice::from_raw_parts(self.vec.as_ptr().add(self.start), self.end - self.start) }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Iterator for IntoIter<T, N, OVERFLOW, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let index = self.start;
        self.start += 1;
        // SAFETY: each slot in `start..end` is read once.
        Some(unsafe { self.vec.as_ptr().add(index).read() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.start;
        (remaining, Some(remaining))
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> DoubleEndedIterator for IntoIter<T, N, OVERFLOW, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        // SAFETY: as above.
        Some(unsafe { self.vec.as_ptr().add(self.end).read() })
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> ExactSizeIterator for IntoIter<T, N, OVERFLOW, A> {}
impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FusedIterator for IntoIter<T, N, OVERFLOW, A> {}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Drop for IntoIter<T, N, OVERFLOW, A> {
    fn drop(&mut self) {
        let remaining = self.end - self.start;
        // SAFETY: drops only the elements not yet yielded; the vector itself
        // has length zero and just releases its storage afterwards.
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(self.vec.as_mut_ptr().add(self.start), remaining);
            ptr::drop_in_place(tail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use crate::swap::fixed_swap;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_vec_fill_then_overflow() {
        let mut v: FixedVec<i32, 4, true> = FixedVec::new();
        v.push(1);
        v.push(2);
        v.push(3);
        v.push(4);
        assert!(v.full());
        assert!(!v.has_overflowed());
        assert_eq!(v.capacity(), 4);

        v.push(5);
        assert!(v.has_overflowed());
        assert_eq!(v.len(), 5);
        assert_eq!(v[4], 5);
        assert_eq!(v, [1, 2, 3, 4, 5]);
        assert_eq!(v.max_size(), 4);
        assert!(v.capacity() >= 8);
    }

    #[test]
    fn test_vec_overflow_is_sticky_after_shrink() {
        let mut v: FixedVec<i32, 2> = FixedVec::from([1, 2, 3]);
        assert!(v.has_overflowed());
        v.truncate(1);
        v.pop();
        v.clear();
        assert!(v.is_empty());
        assert!(v.has_overflowed());
        assert!(v.full());
    }

    #[test]
    fn test_vec_clear_with_reclaims_buffer() {
        let counter = CountingAllocator::new();
        let mut v: FixedVec<u64, 2, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        v.extend([1, 2, 3]);
        assert_eq!(counter.allocations(), 1);

        v.clear_with(false);
        assert!(v.has_overflowed());
        assert_eq!(counter.live_bytes(), 4 * 8);

        v.clear_with(true);
        assert!(!v.has_overflowed());
        assert_eq!(v.capacity(), 2);
        assert_eq!(counter.live_bytes(), 0);

        v.push(9);
        assert_eq!(counter.allocations(), 1);
    }

    #[test]
    fn test_vec_set_capacity_moves_between_storages() {
        let counter = CountingAllocator::new();
        let mut v: FixedVec<i32, 4, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        v.extend([1, 2, 3]);

        v.set_capacity(10);
        assert!(v.has_overflowed());
        assert_eq!(v.capacity(), 10);
        assert_eq!(v, [1, 2, 3]);

        v.set_capacity(3);
        assert!(!v.has_overflowed());
        assert_eq!(v.capacity(), 4);
        assert_eq!(v, [1, 2, 3]);
        assert_eq!(counter.live_bytes(), 0);

        // without overflow the request is clamped to the local buffer
        v.set_capacity(2);
        assert_eq!(v, [1, 2]);
        assert_eq!(v.capacity(), 4);
    }

    #[test]
    fn test_vec_shrink_to_fit_returns_to_buffer() {
        let mut v: FixedVec<i32, 4> = (0..10).collect();
        v.truncate(6);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 6);
        assert!(v.has_overflowed());
        v.truncate(3);
        v.shrink_to_fit();
        assert_eq!(v.capacity(), 4);
        assert!(!v.has_overflowed());
        assert_eq!(v, [0, 1, 2]);
    }

    #[test]
    fn test_vec_no_overflow_capacity() {
        let mut v: FixedVec<u8, 3, false> = FixedVec::new();
        assert!(!v.can_overflow());
        v.push(1);
        v.push(2);
        v.push(3);
        assert!(v.full());
        assert_eq!(v.try_push(4), Err(4));
        assert_eq!(
            v.try_reserve(2),
            Err(FixedError::CapacityExceeded {
                capacity: 3,
                requested: 5
            })
        );
        assert_eq!(v.try_reserve(0), Ok(()));
        v.set_capacity(100);
        assert_eq!(v.capacity(), 3);
    }

    #[test]
    #[should_panic(expected = "fixed capacity exceeded")]
    fn test_vec_no_overflow_push_panics() {
        let mut v: FixedVec<u8, 2, false> = FixedVec::new();
        v.extend([1, 2, 3]);
    }

    #[test]
    fn test_vec_push_unchecked_within_capacity() {
        let mut v: FixedVec<u8, 2, false> = FixedVec::new();
        unsafe {
            v.push_unchecked(7);
            v.push_unchecked(8);
        }
        assert_eq!(v, [7, 8]);
    }

    #[test]
    fn test_vec_insert_remove_swap_remove() {
        let mut v: FixedVec<i32, 3> = FixedVec::from([1, 3]);
        v.insert(1, 2);
        v.insert(3, 4);
        assert_eq!(v, [1, 2, 3, 4]);
        assert!(v.has_overflowed());
        assert_eq!(v.remove(0), 1);
        assert_eq!(v.swap_remove(0), 2);
        assert_eq!(v, [4, 3]);
    }

    #[test]
    #[should_panic(expected = "insertion index")]
    fn test_vec_insert_out_of_bounds() {
        let mut v: FixedVec<i32, 3> = FixedVec::new();
        v.insert(1, 0);
    }

    #[test]
    fn test_vec_resize_and_retain() {
        let mut v: FixedVec<i32, 4> = FixedVec::from_elem(0, 2);
        v.resize(5, 7);
        assert_eq!(v, [0, 0, 7, 7, 7]);
        let mut next = 0;
        v.resize_with(7, || {
            next += 1;
            next
        });
        assert_eq!(v, [0, 0, 7, 7, 7, 1, 2]);
        v.retain(|x| *x != 7);
        assert_eq!(v, [0, 0, 1, 2]);
        v.resize(1, 0);
        assert_eq!(v, [0]);
    }

    #[test]
    fn test_vec_destructors_run_once() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut v: FixedVec<DropCounter, 2> = FixedVec::new();
            for _ in 0..5 {
                v.push(DropCounter(drops.clone()));
            }
            v.retain({
                let mut i = 0;
                move |_| {
                    i += 1;
                    i % 2 == 0
                }
            });
            assert_eq!(drops.get(), 3);
            drop(v.remove(0));
            assert_eq!(drops.get(), 4);
        }
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn test_vec_reset_lose_memory_skips_destructors() {
        let drops = Rc::new(Cell::new(0));
        let counter = CountingAllocator::new();
        let mut v: FixedVec<DropCounter, 1, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        v.push(DropCounter(drops.clone()));
        v.push(DropCounter(drops.clone()));
        v.reset_lose_memory();
        assert!(v.is_empty());
        assert!(!v.has_overflowed());
        assert_eq!(v.capacity(), 1);
        drop(v);
        assert_eq!(drops.get(), 0);
        // the abandoned overflow block is never returned
        assert_eq!(counter.deallocations(), 0);
        assert!(counter.live_bytes() > 0);
    }

    #[test]
    fn test_vec_copy_independence() {
        let a: FixedVec<String, 2> = ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
        let b = a.clone();
        drop(a);
        assert_eq!(b, ["x", "y", "z"]);
    }

    #[test]
    fn test_vec_move_independence() {
        let mut a: FixedVec<i32, 4> = FixedVec::from([1, 2, 3]);
        let b = FixedVec::take_from(&mut a);
        assert_eq!(b, [1, 2, 3]);
        assert!(!b.has_overflowed());
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 4);
        a.push(10);
        assert_eq!(b, [1, 2, 3]);
        assert_eq!(a, [10]);
    }

    #[test]
    fn test_vec_take_from_releases_source_overflow() {
        let counter = CountingAllocator::new();
        let mut a: FixedVec<i32, 2, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        a.extend([1, 2, 3, 4]);
        let b = FixedVec::take_from(&mut a);
        assert!(!a.has_overflowed());
        assert!(b.has_overflowed());
        assert_eq!(counter.allocations(), 2);
        assert_eq!(counter.deallocations(), 1);
        assert_eq!(b.overflow_allocator(), &counter);
    }

    #[test]
    fn test_vec_swap_local_content() {
        let mut a: FixedVec<i32, 4> = FixedVec::from([1, 2, 3]);
        let mut b: FixedVec<i32, 4> = FixedVec::from([7]);
        fixed_swap(&mut a, &mut b);
        assert_eq!(a, [7]);
        assert_eq!(b, [1, 2, 3]);
        assert!(!a.has_overflowed());
        assert!(!b.has_overflowed());
        // each vector still owns its own buffer
        let a_ptr = a.as_ptr() as usize;
        let a_addr = &a as *const _ as usize;
        assert!(a_ptr >= a_addr && a_ptr < a_addr + mem::size_of_val(&a));
    }

    #[test]
    fn test_vec_swap_mixed_storage() {
        let mut a: FixedVec<i32, 2> = FixedVec::from([1, 2, 3, 4]);
        let mut b: FixedVec<i32, 2> = FixedVec::from([9]);
        a.fixed_swap(&mut b);
        assert_eq!(a, [9]);
        assert_eq!(b, [1, 2, 3, 4]);
        assert!(b.has_overflowed());
    }

    #[test]
    fn test_vec_swap_overflowed_is_constant_time() {
        let counter = CountingAllocator::new();
        let mut a: FixedVec<i32, 2, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        let mut b: FixedVec<i32, 2, true, CountingAllocator> = FixedVec::new_in(counter.clone());
        a.extend(0..5);
        b.extend(10..13);
        let (allocs, frees) = (counter.allocations(), counter.deallocations());
        fixed_swap(&mut a, &mut b);
        assert_eq!(counter.allocations(), allocs);
        assert_eq!(counter.deallocations(), frees);
        assert_eq!(a, [10, 11, 12]);
        assert_eq!(b, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_vec_swap_unequal_allocators_moves_elements() {
        let mut a: FixedVec<i32, 1, true, CountingAllocator> = FixedVec::new_in(CountingAllocator::new());
        let mut b: FixedVec<i32, 1, true, CountingAllocator> = FixedVec::new_in(CountingAllocator::new());
        a.extend([1, 2]);
        b.extend([3, 4, 5]);
        a.fixed_swap(&mut b);
        assert_eq!(a, [3, 4, 5]);
        assert_eq!(b, [1, 2]);
    }

    #[test]
    fn test_vec_into_iter_drops_rest() {
        let drops = Rc::new(Cell::new(0));
        let v: FixedVec<DropCounter, 2> = (0..4).map(|_| DropCounter(drops.clone())).collect();
        let mut iter = v.into_iter();
        drop(iter.next());
        drop(iter.next_back());
        assert_eq!(iter.len(), 2);
        assert_eq!(drops.get(), 2);
        drop(iter);
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn test_vec_spare_capacity_and_set_len() {
        let mut v: FixedVec<u32, 4> = FixedVec::new();
        v.push(1);
        let spare = v.spare_capacity_mut();
        assert_eq!(spare.len(), 3);
        spare[0].write(2);
        spare[1].write(3);
        unsafe { v.set_len(3) };
        assert_eq!(v, [1, 2, 3]);
    }

    #[test]
    fn test_vec_traits_interop() {
        use std::borrow::BorrowMut;
        let mut v: FixedVec<i32, 4> = FixedVec::from(vec![3, 1, 2]);
        v.sort();
        assert_eq!(v, vec![1, 2, 3]);
        assert_eq!(v, &[1, 2, 3][..]);
        let b: &mut [i32] = v.borrow_mut();
        b[0] = 0;
        assert_eq!(format!("{:?}", v), "[0, 2, 3]");

        let w: FixedVec<i32, 8, false> = FixedVec::from(&[0, 2, 3][..]);
        assert_eq!(v, w);
        assert!(v < FixedVec::<i32, 4>::from([0, 2, 4]));

        let mut total = 0;
        for x in &mut v {
            *x += 1;
            total += *x;
        }
        assert_eq!(total, 8);
        v.extend(&[5, 6]);
        let back: Vec<i32> = v.into();
        assert_eq!(back, [1, 3, 4, 5, 6]);
    }

    #[cfg(feature = "heapless")]
    #[test]
    fn test_vec_heapless_interop() {
        let mut h: heapless::Vec<u8, 4> = heapless::Vec::new();
        h.extend_from_slice(&[1, 2, 3]).unwrap();
        let v: FixedVec<u8, 2> = FixedVec::from(h);
        assert!(v.has_overflowed());

        let back: heapless::Vec<u8, 3> = heapless::Vec::try_from(v).unwrap();
        assert_eq!(back.as_slice(), &[1, 2, 3]);

        let long: FixedVec<u8, 8> = FixedVec::from([0; 5]);
        let rejected = heapless::Vec::<u8, 4>::try_from(long).unwrap_err();
        assert_eq!(rejected.len(), 5);
    }
}
