//! Ordered set with a fixed node pool embedded in the set itself.
//!
//! [`FixedSet`] is the key-only counterpart of [`FixedMap`](crate::FixedMap):
//! the same tree with `()` values, so it has the same capacity, overflow and
//! swap behavior.

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt::{self, Debug};
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::RangeBounds;
use std::collections::BTreeSet;

use crate::alloc::{DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::compare::{KeyCompare, OrdCompare};
use crate::maps::rbtree::{self, RbTree};
use crate::swap::FixedSwap;

/// A sorted set storing up to `N` elements inline.
///
/// Once the set has needed overflow nodes, `has_overflowed` stays `true` until
/// `reset_lose_memory`, or until the set is drained by `take_from`.
///
/// | Parameter | Meaning |
/// |-----------|--------|
/// | `T` | Element type |
/// | `N` | Elements held in the embedded node pool |
/// | `OVERFLOW` | Whether elements past `N` go to the overflow allocator |
/// | `A` | Overflow allocator |
/// | `C` | Comparator, [`OrdCompare`] by default |
pub struct FixedSet<
    T,
    const N: usize,
    const OVERFLOW: bool = true,
    A: OverflowAllocator = DefaultAllocator,
    C = OrdCompare,
> {
    tree: RbTree<T, (), N, OVERFLOW, A, C>,
}

impl<T, const N: usize, const OVERFLOW: bool, C: Default> FixedSet<T, N, OVERFLOW, DefaultAllocator, C> {
    pub fn new() -> Self {
        Self::with_comparator_in(C::default(), DefaultAllocator)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, C> FixedSet<T, N, OVERFLOW, DefaultAllocator, C> {
    /// Creates an empty set ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, DefaultAllocator)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C: Default> FixedSet<T, N, OVERFLOW, A, C> {
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(C::default(), alloc)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> FixedSet<T, N, OVERFLOW, A, C> {
    pub fn with_comparator_in(cmp: C, alloc: A) -> Self {
        Self {
            tree: RbTree::new_in(cmp, alloc),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        N
    }

    /// `true` once `N` elements are stored or the set has overflowed.
    #[inline]
    pub fn full(&self) -> bool {
        self.tree.full()
    }

    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.tree.pool().has_overflowed()
    }

    #[inline]
    pub fn can_overflow(&self) -> bool {
        OVERFLOW
    }

    pub fn overflow_allocator(&self) -> &A {
        self.tree.pool().overflow_allocator()
    }

    pub fn overflow_allocator_mut(&mut self) -> &mut A {
        self.tree.pool_mut().overflow_allocator_mut()
    }

    pub fn set_overflow_allocator(&mut self, alloc: A) {
        self.tree.pool_mut().set_overflow_allocator(alloc);
    }

    pub fn copy_overflow_allocator(&mut self, other: &Self) {
        self.set_overflow_allocator(other.overflow_allocator().clone());
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Forgets every element and returns to the embedded buffer without
    /// running destructors or freeing overflow nodes.
    pub fn reset_lose_memory(&mut self) {
        self.tree.reset_lose_memory();
    }

    pub fn first(&self) -> Option<&T> {
        self.tree.first().map(|r| self.tree.key(r))
    }

    pub fn last(&self) -> Option<&T> {
        self.tree.last().map(|r| self.tree.key(r))
    }

    pub fn pop_first(&mut self) -> Option<T> {
        self.tree.pop_first().map(|(k, _)| k)
    }

    pub fn pop_last(&mut self) -> Option<T> {
        self.tree.pop_last().map(|(k, _)| k)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.tree.retain(|k, _| keep(k));
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(value).is_some()
    }

    /// The stored element equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(value).map(|r| self.tree.key(r))
    }

    /// Removes `value`, returning whether it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(value).is_some()
    }

    /// Removes and returns the stored element equal to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(value).map(|(k, _)| k)
    }

    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        usize::from(self.contains(value))
    }

    pub fn range<Q, R>(&self, range: R) -> Range<'_, T>
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
        R: RangeBounds<Q>,
    {
        Range {
            inner: self.tree.range(range.start_bound(), range.end_bound()),
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<T>,
{
    /// Adds `value`, returning whether it was newly inserted.
    ///
    /// An element already equal to `value` is left in place.
    pub fn insert(&mut self, value: T) -> bool {
        self.tree.insert_unique(value, ()).is_none()
    }

    /// Like [`insert`](Self::insert), but hands `value` back when a new node
    /// would exceed the capacity of a non-overflowing set.
    pub fn try_insert(&mut self, value: T) -> Result<bool, T> {
        match self.tree.try_insert_unique(value, ()) {
            Ok(previous) => Ok(previous.is_none()),
            Err((value, ())) => Err(value),
        }
    }

    pub fn take_from(source: &mut Self) -> Self
    where
        C: Clone,
    {
        Self {
            tree: RbTree::take_from(&mut source.tree),
        }
    }

    /// Whether every element of `self` is also in `other`.
    pub fn is_subset<const M: usize, const O: bool, B: OverflowAllocator, D>(
        &self,
        other: &FixedSet<T, M, O, B, D>,
    ) -> bool
    where
        D: KeyCompare<T>,
    {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Whether `self` and `other` have no element in common.
    pub fn is_disjoint<const M: usize, const O: bool, B: OverflowAllocator, D>(
        &self,
        other: &FixedSet<T, M, O, B, D>,
    ) -> bool
    where
        D: KeyCompare<T>,
    {
        self.iter().all(|v| !other.contains(v))
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> FixedSwap for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<T> + Clone,
{
    fn fixed_swap(&mut self, other: &mut Self) {
        self.tree.fixed_swap(&mut other.tree);
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> Clone for FixedSet<T, N, OVERFLOW, A, C>
where
    T: Clone,
    A: OverflowAllocator,
    C: KeyCompare<T> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone_tree(),
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> Default for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: Default,
{
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
    }
}

impl<T: Debug, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Debug
    for FixedSet<T, N, OVERFLOW, A, C>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> PartialEq
    for FixedSet<T, N, OVERFLOW, A, C>
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Eq for FixedSet<T, N, OVERFLOW, A, C> {}

impl<T: PartialOrd, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> PartialOrd
    for FixedSet<T, N, OVERFLOW, A, C>
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Ord for FixedSet<T, N, OVERFLOW, A, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Hash for FixedSet<T, N, OVERFLOW, A, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self.iter() {
            value.hash(state);
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> Extend<T> for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<T>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, const N: usize, const OVERFLOW: bool, A, C> Extend<&'a T> for FixedSet<T, N, OVERFLOW, A, C>
where
    T: Copy + 'a,
    A: OverflowAllocator,
    C: KeyCompare<T>,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(*value);
        }
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> FromIterator<T> for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<T, const N: usize, const M: usize, const OVERFLOW: bool, A, C> From<[T; M]> for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<T> + Default,
{
    fn from(values: [T; M]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> From<BTreeSet<T>> for FixedSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<T> + Default,
{
    fn from(set: BTreeSet<T>) -> Self {
        set.into_iter().collect()
    }
}

impl<T: Ord, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> From<FixedSet<T, N, OVERFLOW, A, C>>
    for BTreeSet<T>
{
    fn from(set: FixedSet<T, N, OVERFLOW, A, C>) -> Self {
        set.into_iter().collect()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator for FixedSet<T, N, OVERFLOW, A, C> {
    type Item = T;
    type IntoIter = IntoIter<T, N, OVERFLOW, A, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: rbtree::IntoIter::new(self.tree),
        }
    }
}

impl<'a, T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for &'a FixedSet<T, N, OVERFLOW, A, C>
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a fixed set, in order.
pub struct Iter<'a, T> {
    pub(crate) inner: rbtree::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Iterator over the elements of a fixed set inside a range.
pub struct Range<'a, T> {
    pub(crate) inner: rbtree::Range<'a, T, ()>,
}

impl<'a, T> Iterator for Range<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.inner.next().map(|(k, _)| k)
    }
}

impl<'a, T> DoubleEndedIterator for Range<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

/// Owning iterator over the elements of a fixed set.
pub struct IntoIter<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> {
    pub(crate) inner: rbtree::IntoIter<T, (), N, OVERFLOW, A, C>,
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Iterator for IntoIter<T, N, OVERFLOW, A, C> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> DoubleEndedIterator
    for IntoIter<T, N, OVERFLOW, A, C>
{
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> ExactSizeIterator
    for IntoIter<T, N, OVERFLOW, A, C>
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use crate::compare::FnCompare;
    use crate::swap::fixed_swap;

    #[test]
    fn test_set_insert_contains_remove() {
        let mut set: FixedSet<i32, 4> = FixedSet::new();
        assert!(set.insert(3));
        assert!(set.insert(1));
        assert!(!set.insert(3));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert_eq!(set.count(&3), 1);
        assert_eq!(set.count(&2), 0);
        assert_eq!(set.get(&3), Some(&3));
        assert!(set.remove(&3));
        assert!(!set.remove(&3));
        assert_eq!(set.take(&1), Some(1));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_capacity_invariant_without_overflow() {
        let mut set: FixedSet<u16, 8, false> = FixedSet::new();
        for v in 0..8 {
            assert!(set.insert(v * 3));
        }
        assert!(set.full());
        assert_eq!(set.max_size(), 8);
        assert!(!set.has_overflowed());
        assert_eq!(set.try_insert(100), Err(100));
        assert_eq!(set.try_insert(3), Ok(false));
    }

    #[test]
    fn test_set_locality_sticks_after_shrink() {
        let mut set: FixedSet<u32, 4> = FixedSet::new();
        assert!(!set.has_overflowed());
        set.extend(0..5);
        assert!(set.has_overflowed());
        set.retain(|v| *v < 2);
        assert_eq!(set.len(), 2);
        assert!(set.has_overflowed());
        assert!(set.full());
    }

    #[test]
    fn test_set_first_last_range() {
        let mut set: FixedSet<char, 4> = "hello world".chars().collect();
        assert_eq!(set.first(), Some(&' '));
        assert_eq!(set.last(), Some(&'w'));
        assert_eq!(set.range('e'..'m').copied().collect::<String>(), "ehl");
        assert_eq!(set.pop_last(), Some('w'));
        assert_eq!(set.pop_first(), Some(' '));
        assert_eq!(set.iter().rev().copied().collect::<String>(), "rolhed");
    }

    #[test]
    fn test_set_subset_disjoint() {
        let small: FixedSet<i32, 4> = FixedSet::from([1, 2]);
        let big: FixedSet<i32, 8> = FixedSet::from([1, 2, 3, 4]);
        let other: FixedSet<i32, 8> = FixedSet::from([7, 8]);
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        assert!(small.is_disjoint(&other));
        assert!(!small.is_disjoint(&big));
    }

    #[test]
    fn test_set_comparator_closure() {
        let mut set = FixedSet::<i32, 4, true, DefaultAllocator, _>::with_comparator(FnCompare(|a: &i32, b: &i32| {
            a.abs().cmp(&b.abs())
        }));
        set.insert(-3);
        set.insert(2);
        assert!(!set.insert(3));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [2, -3]);
    }

    #[test]
    fn test_set_clone_move_swap() {
        let counter = CountingAllocator::new();
        type Set = FixedSet<u32, 2, true, CountingAllocator>;
        let mut a = Set::new_in(counter.clone());
        a.extend([5, 1, 3]);
        let b = a.clone();
        assert_eq!(b, a);
        assert!(b.has_overflowed());

        let mut c = Set::take_from(&mut a);
        assert!(a.is_empty());
        assert!(!a.has_overflowed());
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), [1, 3, 5]);

        a.insert(42);
        fixed_swap(&mut a, &mut c);
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), [1, 3, 5]);
        assert_eq!(c.iter().copied().collect::<Vec<_>>(), [42]);

        let std_set: BTreeSet<u32> = c.into();
        assert_eq!(std_set.into_iter().collect::<Vec<_>>(), [42]);
        assert_eq!(format!("{:?}", b), "{1, 3, 5}");
    }
}
