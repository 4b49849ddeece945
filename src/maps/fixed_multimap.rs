//! Ordered multimap with a fixed node pool embedded in the map itself.
//!
//! Equal keys are kept in insertion order.

use core::borrow::Borrow;
use core::fmt::{self, Debug};
use core::ops::{Bound, RangeBounds};

use crate::alloc::{DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::compare::{KeyCompare, OrdCompare};
use crate::maps::rbtree::{IntoIter, Iter, IterMut, Range, RbTree};
use crate::swap::FixedSwap;

/// A sorted multimap storing up to `N` entries inline.
///
/// Shares the storage model of [`FixedMap`](crate::FixedMap), including the
/// sticky overflow flag that only `reset_lose_memory` and `take_from` clear.
/// Only insertion and key lookup differ.
pub struct FixedMultiMap<
    K,
    V,
    const N: usize,
    const OVERFLOW: bool = true,
    A: OverflowAllocator = DefaultAllocator,
    C = OrdCompare,
> {
    tree: RbTree<K, V, N, OVERFLOW, A, C>,
}

impl<K, V, const N: usize, const OVERFLOW: bool, C: Default> FixedMultiMap<K, V, N, OVERFLOW, DefaultAllocator, C> {
    pub fn new() -> Self {
        Self::with_comparator_in(C::default(), DefaultAllocator)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, C> FixedMultiMap<K, V, N, OVERFLOW, DefaultAllocator, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, DefaultAllocator)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C: Default>
    FixedMultiMap<K, V, N, OVERFLOW, A, C>
{
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(C::default(), alloc)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> FixedMultiMap<K, V, N, OVERFLOW, A, C> {
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

    /// See [`FixedMap::reset_lose_memory`](crate::FixedMap::reset_lose_memory).
    pub fn reset_lose_memory(&mut self) {
        self.tree.reset_lose_memory();
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|r| self.tree.entry(r))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|r| self.tree.entry(r))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first()
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last()
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.tree.retain(keep);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.tree.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.tree.iter_mut()
    }

    /// The first value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(key).map(|r| self.tree.entry(r).1)
    }

    /// Every entry stored under `key`, in insertion order.
    pub fn get_all<'a, Q>(&'a self, key: &Q) -> Range<'a, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.range(Bound::Included(key), Bound::Included(key))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(key).is_some()
    }

    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.count(key)
    }

    /// Removes the first entry stored under `key`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(key)
    }

    /// Removes every entry stored under `key` and returns how many there were.
    pub fn remove_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove_all(key)
    }

    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
        R: RangeBounds<Q>,
    {
        self.tree.range(range.start_bound(), range.end_bound())
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<K>,
{
    /// Adds an entry after any entries with an equal key.
    pub fn insert(&mut self, key: K, value: V) {
        self.tree.insert_equal(key, value);
    }

    pub fn take_from(source: &mut Self) -> Self
    where
        C: Clone,
    {
        Self {
            tree: RbTree::take_from(&mut source.tree),
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FixedSwap for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<K> + Clone,
{
    fn fixed_swap(&mut self, other: &mut Self) {
        self.tree.fixed_swap(&mut other.tree);
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Clone for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    K: Clone,
    V: Clone,
    A: OverflowAllocator,
    C: KeyCompare<K> + Clone,
{
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone_tree(),
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Default for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: Default,
{
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
    }
}

impl<K: Debug, V: Debug, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Debug
    for FixedMultiMap<K, V, N, OVERFLOW, A, C>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> PartialEq for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    K: PartialEq,
    V: PartialEq,
    A: OverflowAllocator,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Eq
    for FixedMultiMap<K, V, N, OVERFLOW, A, C>
{
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Extend<(K, V)> for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FromIterator<(K, V)>
    for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, const N: usize, const M: usize, const OVERFLOW: bool, A, C> From<[(K, V); M]>
    for FixedMultiMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<K> + Default,
{
    fn from(entries: [(K, V); M]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for FixedMultiMap<K, V, N, OVERFLOW, A, C>
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, N, OVERFLOW, A, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for &'a FixedMultiMap<K, V, N, OVERFLOW, A, C>
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
