//! Ordered map with a fixed node pool embedded in the map itself.
//!
//! [`FixedMap`] keeps up to `N` entries in nodes carved from its own buffer,
//! with no heap allocation. With `OVERFLOW = true` (the default) further
//! entries are allocated from the overflow allocator; with
//! `OVERFLOW = false` inserting past `N` entries panics.
//!
//! ```
//! use fixed_collections::FixedMap;
//!
//! let mut scores: FixedMap<&str, u32, 4> = FixedMap::new();
//! scores.insert("ada", 36);
//! scores.insert("grace", 85);
//! assert_eq!(scores.get("ada"), Some(&36));
//! assert_eq!(scores.insert("ada", 37), Some(36));
//! assert!(!scores.has_overflowed());
//! ```

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt::{self, Debug};
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::{Index, RangeBounds};
use std::collections::BTreeMap;

use crate::alloc::{DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::compare::{KeyCompare, OrdCompare};
use crate::maps::rbtree::{IntoIter, Iter, IterMut, Range, RbTree};
use crate::swap::FixedSwap;

/// A sorted map storing up to `N` entries inline.
///
/// Keys are ordered by the comparator `C` ([`OrdCompare`] by default). The
/// overflow flag is sticky: once the map has needed overflow nodes,
/// [`has_overflowed`](Self::has_overflowed) and [`full`](Self::full) stay
/// `true` until [`reset_lose_memory`](Self::reset_lose_memory), or until the
/// map is drained as the source of [`take_from`](Self::take_from). A
/// [`fixed_swap`](crate::fixed_swap) exchanges comparators along with the
/// entries and leaves each map's flag where it was.
pub struct FixedMap<
    K,
    V,
    const N: usize,
    const OVERFLOW: bool = true,
    A: OverflowAllocator = DefaultAllocator,
    C = OrdCompare,
> {
    tree: RbTree<K, V, N, OVERFLOW, A, C>,
}

impl<K, V, const N: usize, const OVERFLOW: bool, C: Default> FixedMap<K, V, N, OVERFLOW, DefaultAllocator, C> {
    pub fn new() -> Self {
        Self::with_comparator_in(C::default(), DefaultAllocator)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, C> FixedMap<K, V, N, OVERFLOW, DefaultAllocator, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_comparator_in(cmp, DefaultAllocator)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C: Default>
    FixedMap<K, V, N, OVERFLOW, A, C>
{
    /// Creates an empty map that overflows into `alloc`.
    pub fn new_in(alloc: A) -> Self {
        Self::with_comparator_in(C::default(), alloc)
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> FixedMap<K, V, N, OVERFLOW, A, C> {
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

    /// The fixed capacity `N`, independent of the overflow state.
    #[inline]
    pub fn max_size(&self) -> usize {
        N
    }

    /// `true` once `N` entries are stored or the map has overflowed.
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

    /// Replaces the overflow allocator.
    ///
    /// Overflow nodes already allocated are released through the new
    /// allocator, so it should compare equal to the old one unless the map
    /// holds none.
    pub fn set_overflow_allocator(&mut self, alloc: A) {
        self.tree.pool_mut().set_overflow_allocator(alloc);
    }

    pub fn copy_overflow_allocator(&mut self, other: &Self) {
        self.set_overflow_allocator(other.overflow_allocator().clone());
    }

    pub fn comparator(&self) -> &C {
        self.tree.comparator()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Forgets every entry and returns to the embedded buffer without
    /// running destructors or freeing overflow nodes.
    ///
    /// Entries that were live are leaked. Intended for maps whose contents
    /// are managed elsewhere (e.g. recycled from a pool).
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

    /// Keeps only the entries for which `keep` returns `true`, visiting them
    /// in key order.
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

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FixedMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<K>,
{
    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// # Panics
    /// When the map is at capacity and overflow is disabled.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.tree.insert_unique(key, value)
    }

    /// Like [`insert`](Self::insert), but hands the entry back when a new
    /// node would exceed the capacity of a non-overflowing map.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, (K, V)> {
        self.tree.try_insert_unique(key, value)
    }

    /// The value for `key`, inserting `make()` first when it is absent.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V {
        self.tree.get_or_insert_with(key, make)
    }

    /// Moves every entry out of `source` into a new map.
    ///
    /// The new map copies `source`'s comparator and overflow allocator; the
    /// entries go into the new map's own buffer first. `source` is left
    /// empty and back on its embedded buffer.
    pub fn take_from(source: &mut Self) -> Self
    where
        C: Clone,
    {
        Self {
            tree: RbTree::take_from(&mut source.tree),
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> FixedMap<K, V, N, OVERFLOW, A, C> {
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(key).map(|r| self.tree.entry(r).1)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let r = self.tree.find(key)?;
        Some(self.tree.entry_mut(r).1)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(key).map(|r| self.tree.entry(r))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.find(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.tree.remove(key)
    }

    /// Entries whose keys fall inside `range`, in key order.
    ///
    /// An inverted range yields nothing.
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

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FixedSwap for FixedMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
    C: KeyCompare<K> + Clone,
{
    fn fixed_swap(&mut self, other: &mut Self) {
        self.tree.fixed_swap(&mut other.tree);
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Clone for FixedMap<K, V, N, OVERFLOW, A, C>
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

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Default for FixedMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: Default,
{
    fn default() -> Self {
        Self::with_comparator_in(C::default(), A::default())
    }
}

impl<K: Debug, V: Debug, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Debug
    for FixedMap<K, V, N, OVERFLOW, A, C>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> PartialEq for FixedMap<K, V, N, OVERFLOW, A, C>
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
    for FixedMap<K, V, N, OVERFLOW, A, C>
{
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> PartialOrd for FixedMap<K, V, N, OVERFLOW, A, C>
where
    K: PartialOrd,
    V: PartialOrd,
    A: OverflowAllocator,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Ord
    for FixedMap<K, V, N, OVERFLOW, A, C>
{
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: Hash, V: Hash, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> Hash
    for FixedMap<K, V, N, OVERFLOW, A, C>
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for entry in self.iter() {
            entry.hash(state);
        }
    }
}

impl<K, V, Q, const N: usize, const OVERFLOW: bool, A, C> Index<&Q> for FixedMap<K, V, N, OVERFLOW, A, C>
where
    K: Borrow<Q>,
    Q: ?Sized,
    A: OverflowAllocator,
    C: KeyCompare<Q>,
{
    type Output = V;

    /// # Panics
    /// When `key` is not in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in FixedMap")
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Extend<(K, V)> for FixedMap<K, V, N, OVERFLOW, A, C>
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

impl<'a, K, V, const N: usize, const OVERFLOW: bool, A, C> Extend<(&'a K, &'a V)>
    for FixedMap<K, V, N, OVERFLOW, A, C>
where
    K: Copy + 'a,
    V: Copy + 'a,
    A: OverflowAllocator,
    C: KeyCompare<K>,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(*k, *v);
        }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> FromIterator<(K, V)> for FixedMap<K, V, N, OVERFLOW, A, C>
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
    for FixedMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<K> + Default,
{
    fn from(entries: [(K, V); M]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> From<BTreeMap<K, V>> for FixedMap<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Default,
    C: KeyCompare<K> + Default,
{
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Ord, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> From<FixedMap<K, V, N, OVERFLOW, A, C>>
    for BTreeMap<K, V>
{
    fn from(map: FixedMap<K, V, N, OVERFLOW, A, C>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for FixedMap<K, V, N, OVERFLOW, A, C>
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, N, OVERFLOW, A, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for &'a FixedMap<K, V, N, OVERFLOW, A, C>
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, const N: usize, const OVERFLOW: bool, A: OverflowAllocator, C> IntoIterator
    for &'a mut FixedMap<K, V, N, OVERFLOW, A, C>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Iterator over the keys of a [`FixedMap`], in order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}
impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

/// Iterator over the values of a [`FixedMap`], in key order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}
impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

/// Mutable iterator over the values of a [`FixedMap`], in key order.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for ValuesMut<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a mut V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<'a, K, V> ExactSizeIterator for ValuesMut<'a, K, V> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use crate::compare::{FnCompare, ReverseCompare};
    use crate::swap::fixed_swap;
    use std::cell::Cell;
    use std::cmp::Ordering;
    use std::rc::Rc;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_map_stack_ops_sorted_order() {
        let mut map: FixedMap<i32, &str, 4> = FixedMap::new();
        assert!(map.is_empty());
        map.insert(3, "c");
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(map.len(), 3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(map.first_key_value(), Some((&1, &"a")));
        assert_eq!(map.last_key_value(), Some((&3, &"c")));
        assert_eq!(map[&2], "b");
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&9));
    }

    #[test]
    fn test_map_capacity_and_sticky_overflow() {
        let mut map: FixedMap<u32, u32, 4> = FixedMap::new();
        assert_eq!(map.max_size(), 4);
        assert!(map.can_overflow());
        for k in 0..4 {
            map.insert(k, k);
        }
        assert!(map.full());
        assert!(!map.has_overflowed());

        map.insert(4, 4);
        assert!(map.has_overflowed());
        assert_eq!(map.len(), 5);

        map.remove(&4);
        map.remove(&3);
        assert_eq!(map.len(), 3);
        assert!(map.has_overflowed());
        assert!(map.full());
        assert_eq!(map.max_size(), 4);
    }

    #[test]
    fn test_map_no_overflow_fills_exactly() {
        let mut map: FixedMap<u8, u8, 3, false> = FixedMap::new();
        assert!(!map.can_overflow());
        for k in 0..3 {
            map.insert(k, k);
        }
        assert!(map.full());
        assert_eq!(map.try_insert(9, 9), Err((9, 9)));
        // replacing an existing key needs no new node
        assert_eq!(map.try_insert(1, 10), Ok(Some(1)));
        map.remove(&0);
        assert_eq!(map.try_insert(9, 9), Ok(None));
    }

    #[test]
    #[should_panic(expected = "fixed capacity exceeded")]
    fn test_map_no_overflow_insert_panics() {
        let mut map: FixedMap<u8, u8, 2, false> = FixedMap::new();
        map.insert(1, 1);
        map.insert(2, 2);
        map.insert(3, 3);
    }

    #[test]
    fn test_map_get_mut_and_entry_helpers() {
        let mut map: FixedMap<String, Vec<u32>, 2> = FixedMap::new();
        map.get_or_insert_with("a".to_string(), Vec::new).push(1);
        map.get_or_insert_with("a".to_string(), Vec::new).push(2);
        map.get_or_insert_with("b".to_string(), || vec![7]);
        assert_eq!(map.get("a"), Some(&vec![1, 2]));
        map.get_mut("b").unwrap().push(8);
        assert_eq!(map.get_key_value("b"), Some((&"b".to_string(), &vec![7, 8])));
        assert_eq!(map.remove_entry("a"), Some(("a".to_string(), vec![1, 2])));
        assert_eq!(map.remove("a"), None);
        for v in map.values_mut() {
            v.clear();
        }
        assert_eq!(map["b"], Vec::<u32>::new());
    }

    #[test]
    fn test_map_range_and_pop() {
        let mut map: FixedMap<i32, i32, 4> = (0..10).map(|k| (k, k * k)).collect();
        assert_eq!(map.range(3..6).map(|(k, _)| *k).collect::<Vec<_>>(), [3, 4, 5]);
        assert_eq!(map.range(..=2).rev().map(|(_, v)| *v).collect::<Vec<_>>(), [4, 1, 0]);
        assert_eq!(map.range(8..).count(), 2);
        assert_eq!(map.pop_first(), Some((0, 0)));
        assert_eq!(map.pop_last(), Some((9, 81)));
        assert_eq!(map.len(), 8);
    }

    #[test]
    fn test_map_custom_comparator() {
        let mut map: FixedMap<i32, (), 4, true, DefaultAllocator, ReverseCompare> =
            FixedMap::with_comparator(ReverseCompare);
        map.extend([(1, ()), (3, ()), (2, ())]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), [3, 2, 1]);
        assert_eq!(map.range(3..=2).map(|(k, _)| *k).collect::<Vec<_>>(), [3, 2]);
    }

    #[test]
    fn test_map_copy_independence() {
        let a: FixedMap<i32, String, 2> = (0..4).map(|k| (k, k.to_string())).collect();
        let b = a.clone();
        drop(a);
        assert_eq!(b.len(), 4);
        assert_eq!(b[&3], "3");
        assert!(b.has_overflowed());
    }

    #[test]
    fn test_map_move_independence() {
        let mut a: FixedMap<i32, i32, 4> = FixedMap::from([(1, 10), (2, 20)]);
        let b = FixedMap::take_from(&mut a);
        assert!(a.is_empty());
        assert!(!a.has_overflowed());
        assert_eq!(b.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), [(1, 10), (2, 20)]);
        assert!(!b.has_overflowed());
        a.insert(5, 50);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_map_take_from_clears_source_overflow() {
        let mut a: FixedMap<u32, u32, 2> = (0..5).map(|k| (k, k)).collect();
        a.retain(|k, _| *k == 0);
        assert!(a.has_overflowed());
        let b = FixedMap::take_from(&mut a);
        assert!(!a.has_overflowed());
        assert!(!a.full());
        assert!(!b.has_overflowed());
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_map_swap_local() {
        let mut a: FixedMap<i32, i32, 4> = FixedMap::from([(1, 1), (2, 2), (3, 3)]);
        let mut b: FixedMap<i32, i32, 4> = FixedMap::from([(7, 7)]);
        fixed_swap(&mut a, &mut b);
        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [7]);
        assert_eq!(b.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
        assert!(!a.has_overflowed());
        assert!(!b.has_overflowed());
    }

    type ByFn = FnCompare<fn(&u32, &u32) -> Ordering>;

    fn ascending(a: &u32, b: &u32) -> Ordering {
        a.cmp(b)
    }

    fn descending(a: &u32, b: &u32) -> Ordering {
        b.cmp(a)
    }

    #[test]
    fn test_map_swap_overflow_exchanges_comparators() {
        let counter = CountingAllocator::new();
        let mut a: FixedMap<u32, u32, 2, true, CountingAllocator, ByFn> =
            FixedMap::with_comparator_in(FnCompare(ascending as fn(&u32, &u32) -> Ordering), counter.clone());
        let mut b: FixedMap<u32, u32, 2, true, CountingAllocator, ByFn> =
            FixedMap::with_comparator_in(FnCompare(descending as fn(&u32, &u32) -> Ordering), counter.clone());
        for k in 10..15 {
            a.insert(k, k);
        }
        for k in 20..24 {
            b.insert(k, k);
        }
        // only overflow nodes remain on either side
        a.remove(&10);
        a.remove(&11);
        b.remove(&20);
        b.remove(&21);

        let allocations = counter.allocations();
        fixed_swap(&mut a, &mut b);
        assert_eq!(counter.allocations(), allocations);

        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [23, 22]);
        assert_eq!(a.get(&22), Some(&22));
        assert_eq!(a.get(&23), Some(&23));
        assert_eq!(b.keys().copied().collect::<Vec<_>>(), [12, 13, 14]);
        for k in 12..15 {
            assert_eq!(b.get(&k), Some(&k));
        }
        a.insert(30, 30);
        b.insert(1, 1);
        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [30, 23, 22]);
        assert_eq!(b.keys().copied().collect::<Vec<_>>(), [1, 12, 13, 14]);
    }

    #[test]
    fn test_map_swap_local_exchanges_comparators() {
        let mut a: FixedMap<u32, u32, 4, true, DefaultAllocator, ByFn> =
            FixedMap::with_comparator(FnCompare(ascending as fn(&u32, &u32) -> Ordering));
        let mut b: FixedMap<u32, u32, 4, true, DefaultAllocator, ByFn> =
            FixedMap::with_comparator(FnCompare(descending as fn(&u32, &u32) -> Ordering));
        a.extend([(1, 1), (2, 2), (3, 3)]);
        b.extend([(5, 5), (6, 6)]);
        fixed_swap(&mut a, &mut b);
        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [6, 5]);
        assert_eq!(b.keys().copied().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(a.get(&5), Some(&5));
        assert_eq!(b.get(&3), Some(&3));
        assert_eq!(a.insert(6, 60), Some(6));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_map_swap_keeps_overflow_flags() {
        let mut a: FixedMap<u32, u32, 2> = (0..4).map(|k| (k, k)).collect();
        let mut b: FixedMap<u32, u32, 2> = FixedMap::from([(9, 9)]);
        a.remove(&2);
        a.remove(&3);
        assert!(a.has_overflowed());
        fixed_swap(&mut a, &mut b);
        assert_eq!(a.keys().copied().collect::<Vec<_>>(), [9]);
        assert_eq!(b.keys().copied().collect::<Vec<_>>(), [0, 1]);
        assert!(a.has_overflowed());
        assert!(!b.has_overflowed());
        a.reset_lose_memory();
        assert!(!a.has_overflowed());
    }

    #[test]
    fn test_map_drop_and_clear_run_destructors() {
        let drops = Rc::new(Cell::new(0));
        let counter = CountingAllocator::new();
        {
            let mut map: FixedMap<u32, DropCounter, 2, true, CountingAllocator> = FixedMap::new_in(counter.clone());
            for k in 0..5 {
                map.insert(k, DropCounter(drops.clone()));
            }
            map.insert(0, DropCounter(drops.clone()));
            assert_eq!(drops.get(), 1);
            map.remove(&1);
            assert_eq!(drops.get(), 2);
        }
        assert_eq!(drops.get(), 6);
        assert_eq!(counter.live_bytes(), 0);
        assert_eq!(counter.allocations(), counter.deallocations());
    }

    #[test]
    fn test_map_reset_lose_memory_skips_destructors() {
        let drops = Rc::new(Cell::new(0));
        let mut map: FixedMap<u32, DropCounter, 4> = FixedMap::new();
        map.insert(1, DropCounter(drops.clone()));
        map.insert(2, DropCounter(drops.clone()));
        map.reset_lose_memory();
        assert!(map.is_empty());
        assert!(!map.has_overflowed());
        drop(map);
        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn test_map_traits() {
        let a: FixedMap<i32, i32, 4> = FixedMap::from([(1, 1), (2, 2)]);
        let b: FixedMap<i32, i32, 4> = FixedMap::from([(2, 2), (1, 1)]);
        let c: FixedMap<i32, i32, 4> = FixedMap::from([(1, 1), (3, 3)]);
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(format!("{:?}", a), "{1: 1, 2: 2}");

        let std_map: BTreeMap<i32, i32> = a.clone().into();
        let back: FixedMap<i32, i32, 4> = std_map.into();
        assert_eq!(back, a);

        let mut doubled = a.clone();
        for (_, v) in &mut doubled {
            *v *= 2;
        }
        assert_eq!((&doubled).into_iter().map(|(_, v)| *v).sum::<i32>(), 6);
        assert_eq!(doubled.into_iter().rev().collect::<Vec<_>>(), [(2, 4), (1, 2)]);
    }
}
