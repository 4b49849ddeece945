//! Ordered multiset with a fixed node pool embedded in the set itself.

use core::borrow::Borrow;
use core::fmt::{self, Debug};
use core::ops::RangeBounds;

use crate::alloc::{DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::compare::{KeyCompare, OrdCompare};
use crate::maps::rbtree::{self, RbTree};
use crate::sets::fixed_set::{IntoIter, Iter, Range};
use crate::swap::FixedSwap;

/// A sorted multiset storing up to `N` elements inline.
///
/// Equal elements are kept in insertion order. The overflow flag is sticky in
/// the same way as [`FixedSet`](crate::FixedSet)'s.
pub struct FixedMultiSet<
    T,
    const N: usize,
    const OVERFLOW: bool = true,
    A: OverflowAllocator = DefaultAllocator,
    C = OrdCompare,
> {
    tree: RbTree<T, (), N, OVERFLOW, A, C>,
}

impl<T, const N: usize, const OVERFLOW: bool, C: Default> FixedMultiSet<T, N, OVERFLOW, DefaultAllocator, C> {
    pub fn new() -> Self {
        Self::with_comparator_in(C::default(), DefaultAllocator)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, C> FixedMultiSet<T, N, OVERFLOW, DefaultAllocator, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, DefaultAllocator)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C: Default> FixedMultiSet<T, N, OVERFLOW, A, C> {
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(C::default(), alloc)
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> FixedMultiSet<T, N, OVERFLOW, A, C> {
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

    /// The first stored element equal to `value`.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(value).map(|r| self.tree.key(r))
    }

    pub fn count<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.count(value)
    }

    /// Removes the first element equal to `value`, returning whether one was
    /// present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(value).is_some()
    }

    /// Removes and returns the first element equal to `value`.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(value).map(|(k, _)| k)
    }

    /// Removes every element equal to `value` and returns how many there were.
    pub fn remove_all<Q>(&mut self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove_all(value)
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

impl<T, const N: usize, const OVERFLOW: bool, A, C> FixedMultiSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<T>,
{
    /// Adds `value` after any equal elements.
    pub fn insert(&mut self, value: T) {
        self.tree.insert_equal(value, ());
    }

    pub fn take_from(source: &mut Self) -> Self
    where
        C: Clone,
    {
        Self {
            tree: RbTree::take_from(&mut source.tree),
        }
    }

    /// Whether every element of `self` occurs in `other` at least as often.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| self.count(v) <= other.count(v))
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.iter().all(|v| !other.contains(v))
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> FixedSwap for FixedMultiSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<T> + Clone,
{
    fn fixed_swap(&mut self, other: &mut Self) {
        self.tree.fixed_swap(&mut other.tree);
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A, C> Clone for FixedMultiSet<T, N, OVERFLOW, A, C>
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

impl<T, const N: usize, const OVERFLOW: bool, A, C> Default for FixedMultiSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: Default,
{
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
    }
}

impl<T: Debug, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Debug
    for FixedMultiSet<T, N, OVERFLOW, A, C>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> PartialEq
    for FixedMultiSet<T, N, OVERFLOW, A, C>
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Eq for FixedMultiSet<T, N, OVERFLOW, A, C> {}

impl<T, const N: usize, const OVERFLOW: bool, A, C> Extend<T> for FixedMultiSet<T, N, OVERFLOW, A, C>
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

impl<T, const N: usize, const OVERFLOW: bool, A, C> FromIterator<T> for FixedMultiSet<T, N, OVERFLOW, A, C>
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

impl<T, const N: usize, const M: usize, const OVERFLOW: bool, A, C> From<[T; M]>
    for FixedMultiSet<T, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<T> + Default,
{
    fn from(values: [T; M]) -> Self {
        values.into_iter().collect()
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for FixedMultiSet<T, N, OVERFLOW, A, C>
{
    type Item = T;
    type IntoIter = IntoIter<T, N, OVERFLOW, A, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: rbtree::IntoIter::new(self.tree),
        }
    }
}

impl<'a, T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for &'a FixedMultiSet<T, N, OVERFLOW, A, C>
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiset_counts_duplicates() {
        let mut set: FixedMultiSet<u8, 4> = FixedMultiSet::from([3, 1, 3, 2, 3]);
        assert_eq!(set.len(), 5);
        assert!(set.has_overflowed());
        assert_eq!(set.count(&3), 3);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1, 2, 3, 3, 3]);
        assert_eq!(set.range(2..=3).count(), 4);

        assert!(set.remove(&3));
        assert_eq!(set.count(&3), 2);
        assert_eq!(set.remove_all(&3), 2);
        assert!(!set.contains(&3));
        assert_eq!(set.into_iter().rev().collect::<Vec<_>>(), [2, 1]);
    }

    #[test]
    fn test_multiset_no_overflow_fills_exactly() {
        let mut set: FixedMultiSet<u8, 3, false> = FixedMultiSet::new();
        set.insert(7);
        set.insert(7);
        set.insert(7);
        assert!(set.full());
        assert!(!set.has_overflowed());
        assert_eq!(set.max_size(), 3);
    }

    #[test]
    fn test_multiset_subset_by_multiplicity() {
        let a: FixedMultiSet<char, 8> = "aab".chars().collect();
        let b: FixedMultiSet<char, 8> = "abab".chars().collect();
        let c: FixedMultiSet<char, 8> = "ab".chars().collect();
        assert!(a.is_subset(&b));
        assert!(!a.is_subset(&c));
        assert!(!a.is_disjoint(&c));
        assert!(a.is_disjoint(&FixedMultiSet::from(['z'])));
    }

    #[test]
    fn test_multiset_take_from_and_swap() {
        let mut a: FixedMultiSet<i32, 2> = FixedMultiSet::from([4, 4, 4]);
        let mut b = FixedMultiSet::take_from(&mut a);
        assert!(a.is_empty());
        assert!(!a.has_overflowed());
        a.insert(1);
        a.fixed_swap(&mut b);
        assert_eq!(a.count(&4), 3);
        assert_eq!(b.iter().copied().collect::<Vec<_>>(), [1]);
        assert_eq!(format!("{:?}", b), "[1]");
    }
}
