//! Red-black tree over a fixed node pool.
//!
//! This is the general ordered container underneath [`FixedMap`],
//! [`FixedMultiMap`], [`FixedSet`] and [`FixedMultiSet`]. Nodes live in a
//! [`FixedPoolAllocator`]: the first `N` in the container's embedded buffer,
//! the rest (when overflow is enabled) in the overflow allocator.
//!
//! Links are [`NodeRef`] handles, never raw addresses of local slots, so the
//! tree can be moved bitwise like any Rust value. Nodes keep parent links,
//! which gives allocation-free, double-ended in-order iteration.
//!
//! [`FixedMap`]: crate::FixedMap
//! [`FixedMultiMap`]: crate::FixedMultiMap
//! [`FixedSet`]: crate::FixedSet
//! [`FixedMultiSet`]: crate::FixedMultiSet

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::marker::PhantomData;
use core::mem;
use core::ops::Bound;
use core::ptr;

use crate::alloc::fixed_pool::NodeBase;
use crate::alloc::{overflow_swappable, FixedAllocator, FixedPoolAllocator, NodeRef, OverflowAllocator};
use crate::compare::KeyCompare;
use crate::config::MAX_STACK_USAGE;
use crate::error::fail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

pub(crate) struct Node<K, V> {
    key: K,
    value: V,
    parent: Link<K, V>,
    left: Link<K, V>,
    right: Link<K, V>,
    color: Color,
}

type Ref<K, V> = NodeRef<Node<K, V>>;
type Link<K, V> = Option<Ref<K, V>>;
type Base<K, V> = NodeBase<Node<K, V>>;

#[inline(always)]
fn expect_node<K, V>(link: Link<K, V>) -> Ref<K, V> {
    match link {
        Some(node) => node,
        None => unreachable!("red-black tree invariant violated"),
    }
}

// Read-only navigation shared by the tree and its iterators.

#[inline(always)]
unsafe fn node<'a, K: 'a, V: 'a>(base: Base<K, V>, r: Ref<K, V>) -> &'a Node<K, V> {
    unsafe { &*base.resolve(r) }
}

unsafe fn minimum<K, V>(base: Base<K, V>, mut r: Ref<K, V>) -> Ref<K, V> {
    unsafe {
        while let Some(left) = node(base, r).left {
            r = left;
        }
    }
    r
}

unsafe fn maximum<K, V>(base: Base<K, V>, mut r: Ref<K, V>) -> Ref<K, V> {
    unsafe {
        while let Some(right) = node(base, r).right {
            r = right;
        }
    }
    r
}

unsafe fn successor<K, V>(base: Base<K, V>, r: Ref<K, V>) -> Link<K, V> {
    unsafe {
        if let Some(right) = node(base, r).right {
            return Some(minimum(base, right));
        }
        let mut child = r;
        let mut parent = node(base, r).parent;
        while let Some(p) = parent {
            if node(base, p).right != Some(child) {
                break;
            }
            child = p;
            parent = node(base, p).parent;
        }
        parent
    }
}

unsafe fn predecessor<K, V>(base: Base<K, V>, r: Ref<K, V>) -> Link<K, V> {
    unsafe {
        if let Some(left) = node(base, r).left {
            return Some(maximum(base, left));
        }
        let mut child = r;
        let mut parent = node(base, r).parent;
        while let Some(p) = parent {
            if node(base, p).left != Some(child) {
                break;
            }
            child = p;
            parent = node(base, p).parent;
        }
        parent
    }
}

/// Ordered key/value storage on a fixed node pool.
///
/// Duplicate keys are allowed through [`insert_equal`](Self::insert_equal);
/// the unique containers only use [`insert_unique`](Self::insert_unique).
pub(crate) struct RbTree<K, V, const N: usize, const OVERFLOW: bool, A, C>
where
    A: OverflowAllocator,
{
    pool: FixedPoolAllocator<Node<K, V>, N, OVERFLOW, A>,
    root: Link<K, V>,
    len: usize,
    cmp: C,
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> RbTree<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
    pub(crate) fn new_in(cmp: C, overflow: A) -> Self {
        Self {
            pool: FixedPoolAllocator::new(overflow),
            root: None,
            len: 0,
            cmp,
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub(crate) fn pool(&self) -> &FixedPoolAllocator<Node<K, V>, N, OVERFLOW, A> {
        &self.pool
    }

    #[inline(always)]
    pub(crate) fn pool_mut(&mut self) -> &mut FixedPoolAllocator<Node<K, V>, N, OVERFLOW, A> {
        &mut self.pool
    }

    #[inline(always)]
    pub(crate) fn comparator(&self) -> &C {
        &self.cmp
    }

    /// `len >= N`, or storage has already spilled into the overflow allocator.
    #[inline]
    pub(crate) fn full(&self) -> bool {
        self.len >= N || self.pool.has_overflowed()
    }

    // --- node access ---

    #[inline(always)]
    fn node(&self, r: Ref<K, V>) -> &Node<K, V> {
        // SAFETY: every handle reachable from the tree names a live node.
        unsafe { &*self.pool.get(r) }
    }

    #[inline(always)]
    fn node_mut(&mut self, r: Ref<K, V>) -> &mut Node<K, V> {
        // SAFETY: every handle reachable from the tree names a live node.
        unsafe { &mut *self.pool.get_mut(r) }
    }

    #[inline(always)]
    fn parent(&self, r: Ref<K, V>) -> Link<K, V> {
        self.node(r).parent
    }

    #[inline(always)]
    fn left(&self, r: Ref<K, V>) -> Link<K, V> {
        self.node(r).left
    }

    #[inline(always)]
    fn right(&self, r: Ref<K, V>) -> Link<K, V> {
        self.node(r).right
    }

    #[inline(always)]
    fn is_red(&self, link: Link<K, V>) -> bool {
        link.map_or(false, |r| self.node(r).color == Color::Red)
    }

    #[inline(always)]
    fn set_color(&mut self, r: Ref<K, V>, color: Color) {
        self.node_mut(r).color = color;
    }

    #[inline(always)]
    pub(crate) fn key(&self, r: Ref<K, V>) -> &K {
        &self.node(r).key
    }

    #[inline(always)]
    pub(crate) fn entry(&self, r: Ref<K, V>) -> (&K, &V) {
        let node = self.node(r);
        (&node.key, &node.value)
    }

    #[inline(always)]
    pub(crate) fn entry_mut(&mut self, r: Ref<K, V>) -> (&K, &mut V) {
        let node = self.node_mut(r);
        (&node.key, &mut node.value)
    }

    // --- navigation ---

    pub(crate) fn first(&self) -> Link<K, V> {
        // SAFETY: the base is borrowed from `self` for the duration of the call.
        self.root.map(|r| unsafe { minimum(self.pool.base(), r) })
    }

    pub(crate) fn last(&self) -> Link<K, V> {
        // SAFETY: as above.
        self.root.map(|r| unsafe { maximum(self.pool.base(), r) })
    }

    fn successor(&self, r: Ref<K, V>) -> Link<K, V> {
        // SAFETY: as above.
        unsafe { successor(self.pool.base(), r) }
    }

    fn predecessor(&self, r: Ref<K, V>) -> Link<K, V> {
        // SAFETY: as above.
        unsafe { predecessor(self.pool.base(), r) }
    }

    // --- rotations ---

    fn replace_child(&mut self, parent: Link<K, V>, old: Ref<K, V>, new: Link<K, V>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.left(p) == Some(old) {
                    self.node_mut(p).left = new;
                } else {
                    self.node_mut(p).right = new;
                }
            }
        }
    }

    fn rotate_left(&mut self, x: Ref<K, V>) {
        let y = expect_node(self.right(x));
        let y_left = self.left(y);
        self.node_mut(x).right = y_left;
        if let Some(yl) = y_left {
            self.node_mut(yl).parent = Some(x);
        }
        let x_parent = self.parent(x);
        self.node_mut(y).parent = x_parent;
        self.replace_child(x_parent, x, Some(y));
        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    fn rotate_right(&mut self, x: Ref<K, V>) {
        let y = expect_node(self.left(x));
        let y_right = self.right(y);
        self.node_mut(x).left = y_right;
        if let Some(yr) = y_right {
            self.node_mut(yr).parent = Some(x);
        }
        let x_parent = self.parent(x);
        self.node_mut(y).parent = x_parent;
        self.replace_child(x_parent, x, Some(y));
        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    // --- insertion ---

    /// Allocates a red node and links it under `parent`.
    fn link_new(&mut self, parent: Link<K, V>, as_left: bool, key: K, value: V) -> Ref<K, V> {
        let z = match self.pool.allocate() {
            Ok(z) => z,
            Err(err) => fail(err),
        };
        // SAFETY: freshly allocated, uninitialized node.
        unsafe {
            self.pool.get_mut(z).write(Node {
                key,
                value,
                parent,
                left: None,
                right: None,
                color: Color::Red,
            });
        }
        match parent {
            None => self.root = Some(z),
            Some(p) if as_left => self.node_mut(p).left = Some(z),
            Some(p) => self.node_mut(p).right = Some(z),
        }
        self.len += 1;
        self.insert_fixup(z);
        z
    }

    fn insert_fixup(&mut self, mut z: Ref<K, V>) {
        while let Some(p) = self.parent(z) {
            if !self.is_red(Some(p)) {
                break;
            }
            // a red node is never the root, so the grandparent exists
            let g = expect_node(self.parent(p));
            if self.left(g) == Some(p) {
                let uncle = self.right(g);
                if self.is_red(uncle) {
                    self.set_color(p, Color::Black);
                    self.set_color(expect_node(uncle), Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if self.right(p) == Some(z) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = expect_node(self.parent(z));
                    let g = expect_node(self.parent(p));
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.is_red(uncle) {
                    self.set_color(p, Color::Black);
                    self.set_color(expect_node(uncle), Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if self.left(p) == Some(z) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = expect_node(self.parent(z));
                    let g = expect_node(self.parent(p));
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.rotate_left(g);
                }
            }
        }
        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    /// Where a key would be linked: the parent and which side, or the node
    /// already holding an equal key when `unique` is set.
    fn insert_position(&self, key: &K, unique: bool) -> Result<(Link<K, V>, bool), Ref<K, V>>
    where
        C: KeyCompare<K>,
    {
        let mut parent = None;
        let mut as_left = false;
        let mut cur = self.root;
        while let Some(c) = cur {
            parent = Some(c);
            match self.cmp.compare(key, &self.node(c).key) {
                Ordering::Less => {
                    as_left = true;
                    cur = self.left(c);
                }
                Ordering::Equal if unique => return Err(c),
                _ => {
                    as_left = false;
                    cur = self.right(c);
                }
            }
        }
        Ok((parent, as_left))
    }

    /// Inserts `key` unless an equal key exists, in which case the stored
    /// value is replaced and the old one returned.
    pub(crate) fn insert_unique(&mut self, key: K, value: V) -> Option<V>
    where
        C: KeyCompare<K>,
    {
        match self.insert_position(&key, true) {
            Ok((parent, as_left)) => {
                self.link_new(parent, as_left, key, value);
                None
            }
            Err(existing) => Some(mem::replace(&mut self.node_mut(existing).value, value)),
        }
    }

    /// Like [`insert_unique`](Self::insert_unique), but hands the pair back
    /// instead of panicking when a new node cannot be allocated without overflow.
    pub(crate) fn try_insert_unique(&mut self, key: K, value: V) -> Result<Option<V>, (K, V)>
    where
        C: KeyCompare<K>,
    {
        match self.insert_position(&key, true) {
            Ok(_) if !self.pool.can_allocate() => Err((key, value)),
            Ok((parent, as_left)) => {
                self.link_new(parent, as_left, key, value);
                Ok(None)
            }
            Err(existing) => Ok(Some(mem::replace(&mut self.node_mut(existing).value, value))),
        }
    }

    /// Inserts `key` after every equal key already present.
    pub(crate) fn insert_equal(&mut self, key: K, value: V) -> Ref<K, V>
    where
        C: KeyCompare<K>,
    {
        match self.insert_position(&key, false) {
            Ok((parent, as_left)) => self.link_new(parent, as_left, key, value),
            Err(_) => unreachable!("non-unique insertion never matches"),
        }
    }

    /// Returns the value for `key`, inserting `make()` first when absent.
    pub(crate) fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: K, make: F) -> &mut V
    where
        C: KeyCompare<K>,
    {
        let node = match self.insert_position(&key, true) {
            Ok((parent, as_left)) => self.link_new(parent, as_left, key, make()),
            Err(existing) => existing,
        };
        &mut self.node_mut(node).value
    }

    // --- lookup ---

    /// First node whose key is not less than `key`.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let mut cur = self.root;
        let mut result = None;
        while let Some(c) = cur {
            if self.cmp.compare(self.node(c).key.borrow(), key) == Ordering::Less {
                cur = self.right(c);
            } else {
                result = Some(c);
                cur = self.left(c);
            }
        }
        result
    }

    /// First node whose key is greater than `key`.
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let mut cur = self.root;
        let mut result = None;
        while let Some(c) = cur {
            if self.cmp.compare(self.node(c).key.borrow(), key) == Ordering::Greater {
                result = Some(c);
                cur = self.left(c);
            } else {
                cur = self.right(c);
            }
        }
        result
    }

    /// First node with a key equal to `key`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.lower_bound(key)
            .filter(|&r| self.cmp.compare(self.node(r).key.borrow(), key) == Ordering::Equal)
    }

    /// Number of nodes with a key equal to `key`.
    pub(crate) fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.range_bounds(Bound::Included(key), Bound::Included(key))
            .map_or(0, |(front, back)| {
                let mut n = 1;
                let mut cur = front;
                while cur != back {
                    cur = expect_node(self.successor(cur));
                    n += 1;
                }
                n
            })
    }

    /// First and last node inside the bounds, or `None` for an empty range.
    pub(crate) fn range_bounds<Q>(&self, lo: Bound<&Q>, hi: Bound<&Q>) -> Option<(Ref<K, V>, Ref<K, V>)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let front = match lo {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => self.first(),
        }?;
        let back = match hi {
            Bound::Included(key) => match self.upper_bound(key) {
                Some(end) => self.predecessor(end),
                None => self.last(),
            },
            Bound::Excluded(key) => match self.lower_bound(key) {
                Some(end) => self.predecessor(end),
                None => self.last(),
            },
            Bound::Unbounded => self.last(),
        }?;
        let front_key: &Q = self.node(front).key.borrow();
        let back_key: &Q = self.node(back).key.borrow();
        if self.cmp.compare(front_key, back_key) == Ordering::Greater {
            return None;
        }
        Some((front, back))
    }

    // --- removal ---

    fn transplant(&mut self, u: Ref<K, V>, v: Link<K, V>) {
        let u_parent = self.parent(u);
        self.replace_child(u_parent, u, v);
        if let Some(v) = v {
            self.node_mut(v).parent = u_parent;
        }
    }

    /// Unlinks `z`, rebalances, frees its node and returns its contents.
    ///
    /// Every other node keeps its identity, so handles to them stay valid.
    pub(crate) fn remove_node(&mut self, z: Ref<K, V>) -> (K, V) {
        let mut removed_color = self.node(z).color;
        let x;
        let x_parent;
        match (self.left(z), self.right(z)) {
            (None, right) => {
                x = right;
                x_parent = self.parent(z);
                self.transplant(z, right);
            }
            (left, None) => {
                x = left;
                x_parent = self.parent(z);
                self.transplant(z, left);
            }
            (Some(z_left), Some(z_right)) => {
                // SAFETY: the base is borrowed from `self` for this call only.
                let y = unsafe { minimum(self.pool.base(), z_right) };
                removed_color = self.node(y).color;
                x = self.right(y);
                if self.parent(y) == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.parent(y);
                    self.transplant(y, x);
                    self.node_mut(y).right = Some(z_right);
                    self.node_mut(z_right).parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.node_mut(y).left = Some(z_left);
                self.node_mut(z_left).parent = Some(y);
                let z_color = self.node(z).color;
                self.set_color(y, z_color);
            }
        }
        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
        self.len -= 1;
        // SAFETY: `z` is unlinked; its value is moved out exactly once before
        // the slot is released.
        let node = unsafe {
            let node = ptr::read(self.pool.get(z));
            self.pool.deallocate(z);
            node
        };
        (node.key, node.value)
    }

    fn delete_fixup(&mut self, mut x: Link<K, V>, mut x_parent: Link<K, V>) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = x_parent else { break };
            if self.left(p) == x {
                let mut w = expect_node(self.right(p));
                if self.is_red(Some(w)) {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    w = expect_node(self.right(p));
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(p);
                    x_parent = self.parent(p);
                } else {
                    if !self.is_red(self.right(w)) {
                        self.set_color(expect_node(self.left(w)), Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = expect_node(self.right(p));
                    }
                    let p_color = self.node(p).color;
                    self.set_color(w, p_color);
                    self.set_color(p, Color::Black);
                    if let Some(wr) = self.right(w) {
                        self.set_color(wr, Color::Black);
                    }
                    self.rotate_left(p);
                    x = self.root;
                    x_parent = None;
                }
            } else {
                let mut w = expect_node(self.left(p));
                if self.is_red(Some(w)) {
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    w = expect_node(self.left(p));
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_color(w, Color::Red);
                    x = Some(p);
                    x_parent = self.parent(p);
                } else {
                    if !self.is_red(self.left(w)) {
                        self.set_color(expect_node(self.right(w)), Color::Black);
                        self.set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = expect_node(self.left(p));
                    }
                    let p_color = self.node(p).color;
                    self.set_color(w, p_color);
                    self.set_color(p, Color::Black);
                    if let Some(wl) = self.left(w) {
                        self.set_color(wl, Color::Black);
                    }
                    self.rotate_right(p);
                    x = self.root;
                    x_parent = None;
                }
            }
        }
        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        self.find(key).map(|r| self.remove_node(r))
    }

    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        self.first().map(|r| self.remove_node(r))
    }

    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        self.last().map(|r| self.remove_node(r))
    }

    /// Removes every entry with a key equal to `key`, returning how many.
    pub(crate) fn remove_all<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let mut removed = 0;
        while let Some(r) = self.find(key) {
            drop(self.remove_node(r));
            removed += 1;
        }
        removed
    }

    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut cur = self.first();
        while let Some(r) = cur {
            cur = self.successor(r);
            let (key, value) = self.entry_mut(r);
            if !keep(key, value) {
                drop(self.remove_node(r));
            }
        }
    }

    /// Drops every entry and frees every node, without rebalancing.
    pub(crate) fn clear(&mut self) {
        let mut cur = self.root.take();
        while let Some(c) = cur {
            if let Some(left) = self.left(c) {
                cur = Some(left);
                continue;
            }
            if let Some(right) = self.right(c) {
                cur = Some(right);
                continue;
            }
            let parent = self.parent(c);
            if let Some(p) = parent {
                if self.left(p) == Some(c) {
                    self.node_mut(p).left = None;
                } else {
                    self.node_mut(p).right = None;
                }
            }
            // SAFETY: `c` is a detached leaf, dropped once and then released.
            unsafe {
                ptr::drop_in_place(self.pool.get_mut(c));
                self.pool.deallocate(c);
            }
            cur = parent;
        }
        self.len = 0;
    }

    /// Forgets every node without dropping values or freeing overflow nodes.
    pub(crate) fn reset_lose_memory(&mut self) {
        debug!(
            "fixed tree: abandoning {} entries ({} in overflow storage)",
            self.len,
            self.pool.overflow_len()
        );
        self.root = None;
        self.len = 0;
        self.pool.reset();
    }

    // --- whole-container transfer ---

    /// Moves every entry of `source` into `self`, leaving `source` empty and
    /// back on its embedded buffer.
    pub(crate) fn append_from(&mut self, source: &mut Self)
    where
        C: KeyCompare<K>,
    {
        while let Some((key, value)) = source.pop_first() {
            self.insert_equal(key, value);
        }
        source.pool.reset();
    }

    /// Move construction: a new tree holding `source`'s entries in its own
    /// buffer, with `source`'s comparator and overflow allocator.
    pub(crate) fn take_from(source: &mut Self) -> Self
    where
        C: KeyCompare<K> + Clone,
    {
        let mut tree = Self::new_in(source.cmp.clone(), source.pool.overflow_allocator().clone());
        tree.append_from(source);
        tree
    }

    /// Exchanges contents with `other`.
    ///
    /// Handles are swapped in O(1) when every node of both trees lives in
    /// equal overflow allocators; otherwise entries are moved through a
    /// temporary. Comparators travel with the entries.
    pub(crate) fn fixed_swap(&mut self, other: &mut Self)
    where
        C: KeyCompare<K> + Clone,
    {
        if ptr::eq(self, other) {
            return;
        }
        if overflow_swappable(&self.pool, &other.pool)
            && self.pool.local_len() == 0
            && other.pool.local_len() == 0
        {
            trace!("fixed tree swap: exchanging overflow nodes");
            mem::swap(&mut self.root, &mut other.root);
            mem::swap(&mut self.len, &mut other.len);
            mem::swap(&mut self.cmp, &mut other.cmp);
            self.pool.swap_overflow_nodes(&mut other.pool);
            return;
        }
        // overflow flags stay with their container
        let (self_overflowed, other_overflowed) = (self.pool.has_overflowed(), other.pool.has_overflowed());
        if mem::size_of::<Self>() <= MAX_STACK_USAGE {
            trace!("fixed tree swap: content swap through a stack temporary");
            let mut temp = Self::take_from(self);
            mem::swap(&mut self.cmp, &mut other.cmp);
            self.append_from(other);
            other.append_from(&mut temp);
        } else {
            trace!("fixed tree swap: content swap through a heap temporary");
            let mut temp = Vec::with_capacity(self.len);
            while let Some(entry) = self.pop_first() {
                temp.push(entry);
            }
            self.pool.reset();
            mem::swap(&mut self.cmp, &mut other.cmp);
            self.append_from(other);
            for (key, value) in temp {
                other.insert_equal(key, value);
            }
        }
        if self_overflowed {
            self.pool.mark_overflowed();
        }
        if other_overflowed {
            other.pool.mark_overflowed();
        }
    }

    /// Entries cloned in order into a fresh tree with the same comparator and
    /// overflow allocator.
    pub(crate) fn clone_tree(&self) -> Self
    where
        K: Clone,
        V: Clone,
        C: KeyCompare<K> + Clone,
    {
        let mut tree = Self::new_in(self.cmp.clone(), self.pool.overflow_allocator().clone());
        let mut cur = self.first();
        while let Some(r) = cur {
            let (key, value) = self.entry(r);
            tree.insert_equal(key.clone(), value.clone());
            cur = self.successor(r);
        }
        tree
    }

    // --- iteration ---

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            raw: RawIter::new(self.pool.base(), self.first(), self.last()),
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub(crate) fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let (front, back) = (self.first(), self.last());
        IterMut {
            raw: RawIter::new(self.pool.base_mut(), front, back),
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub(crate) fn range<Q>(&self, lo: Bound<&Q>, hi: Bound<&Q>) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyCompare<Q>,
    {
        let raw = match self.range_bounds(lo, hi) {
            Some((front, back)) => RawIter::new(self.pool.base(), Some(front), Some(back)),
            None => RawIter::new(self.pool.base(), None, None),
        };
        Range {
            raw,
            _marker: PhantomData,
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) -> usize
    where
        C: KeyCompare<K>,
    {
        fn black_height<K, V, const N: usize, const O: bool, A: OverflowAllocator, C>(
            tree: &RbTree<K, V, N, O, A, C>,
            link: Link<K, V>,
            parent: Link<K, V>,
        ) -> usize {
            let Some(r) = link else { return 1 };
            assert_eq!(tree.parent(r), parent, "parent link mismatch");
            if tree.is_red(Some(r)) {
                assert!(!tree.is_red(tree.left(r)), "red node with red child");
                assert!(!tree.is_red(tree.right(r)), "red node with red child");
            }
            let lh = black_height(tree, tree.left(r), Some(r));
            let rh = black_height(tree, tree.right(r), Some(r));
            assert_eq!(lh, rh, "unequal black heights");
            lh + usize::from(!tree.is_red(Some(r)))
        }

        assert!(!self.is_red(self.root), "red root");
        let height = black_height(self, self.root, None);
        let mut count = 0;
        let mut prev: Option<&K> = None;
        let mut cur = self.first();
        while let Some(r) = cur {
            let key = self.key(r);
            if let Some(prev) = prev {
                assert_ne!(self.cmp.compare(prev, key), Ordering::Greater, "out of order");
            }
            prev = Some(key);
            count += 1;
            cur = self.successor(r);
        }
        assert_eq!(count, self.len);
        assert_eq!(count, self.pool.local_len() + self.pool.overflow_len());
        height
    }
}

// SAFETY: the tree owns its nodes; handles into the overflow allocator are
// never shared outside the borrow rules of the tree itself.
unsafe impl<K: Send, V: Send, const N: usize, const OVERFLOW: bool, A, C: Send> Send
    for RbTree<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Send,
{
}

// SAFETY: shared access only hands out shared references to entries.
unsafe impl<K: Sync, V: Sync, const N: usize, const OVERFLOW: bool, A, C: Sync> Sync
    for RbTree<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator + Sync,
{
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Drop for RbTree<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
    fn drop(&mut self) {
        self.clear();
    }
}

// --- iterators ---

/// In-order walk over the inclusive node range `[front, back]`.
struct RawIter<K, V> {
    base: Base<K, V>,
    front: Link<K, V>,
    back: Link<K, V>,
}

impl<K, V> RawIter<K, V> {
    fn new(base: Base<K, V>, front: Link<K, V>, back: Link<K, V>) -> Self {
        Self { base, front, back }
    }

    fn next(&mut self) -> Option<*mut Node<K, V>> {
        let front = self.front?;
        if Some(front) == self.back {
            self.front = None;
            self.back = None;
        } else {
            // SAFETY: the iterator's borrow keeps the tree alive and unmoved.
            self.front = unsafe { successor(self.base, front) };
        }
        Some(self.base.resolve(front))
    }

    fn next_back(&mut self) -> Option<*mut Node<K, V>> {
        let back = self.back?;
        if Some(back) == self.front {
            self.front = None;
            self.back = None;
        } else {
            // SAFETY: as above.
            self.back = unsafe { predecessor(self.base, back) };
        }
        Some(self.base.resolve(back))
    }
}

/// Iterator over `(&K, &V)` in key order.
pub struct Iter<'a, K, V> {
    raw: RawIter<K, V>,
    remaining: usize,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.raw.next()?;
        self.remaining -= 1;
        // SAFETY: nodes outlive the shared borrow `'a`.
        let node = unsafe { &*node };
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.raw.next_back()?;
        self.remaining -= 1;
        // SAFETY: as above.
        let node = unsafe { &*node };
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Self {
            raw: RawIter::new(self.raw.base, self.raw.front, self.raw.back),
            remaining: self.remaining,
            _marker: PhantomData,
        }
    }
}

/// Iterator over `(&K, &mut V)` in key order.
pub struct IterMut<'a, K, V> {
    raw: RawIter<K, V>,
    remaining: usize,
    _marker: PhantomData<&'a mut Node<K, V>>,
}

impl<'a, K: 'a, V: 'a> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.raw.next()?;
        self.remaining -= 1;
        // SAFETY: each node is yielded once under the exclusive borrow `'a`.
        let node = unsafe { &mut *node };
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let node = self.raw.next_back()?;
        self.remaining -= 1;
        // SAFETY: as above.
        let node = unsafe { &mut *node };
        Some((&node.key, &mut node.value))
    }
}

impl<'a, K: 'a, V: 'a> ExactSizeIterator for IterMut<'a, K, V> {}

/// Iterator over the entries inside a key range, in key order.
pub struct Range<'a, K, V> {
    raw: RawIter<K, V>,
    _marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: nodes outlive the shared borrow `'a`.
        self.raw.next().map(|node| unsafe { (&(*node).key, &(*node).value) })
    }
}

impl<'a, K, V> DoubleEndedIterator for Range<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        // SAFETY: as above.
        self.raw.next_back().map(|node| unsafe { (&(*node).key, &(*node).value) })
    }
}

/// Owning iterator; entries are unlinked from the front or back as they are
/// yielded.
pub struct IntoIter<K, V, const N: usize, const OVERFLOW: bool, A, C>
where
    A: OverflowAllocator,
{
    tree: RbTree<K, V, N, OVERFLOW, A, C>,
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> IntoIter<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
    pub(crate) fn new(tree: RbTree<K, V, N, OVERFLOW, A, C>) -> Self {
        Self { tree }
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> Iterator for IntoIter<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len, Some(self.tree.len))
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> DoubleEndedIterator
    for IntoIter<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, V, const N: usize, const OVERFLOW: bool, A, C> ExactSizeIterator
    for IntoIter<K, V, N, OVERFLOW, A, C>
where
    A: OverflowAllocator,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{CountingAllocator, DefaultAllocator};
    use crate::compare::OrdCompare;

    type Tree<const N: usize> = RbTree<u32, u32, N, true, DefaultAllocator, OrdCompare>;

    fn scrambled(n: u32) -> impl Iterator<Item = u32> {
        // a full-period walk of 0..n when n is a power of two
        (0..n).map(move |i| (i * 7919 + 13) % n)
    }

    #[test]
    fn test_rbtree_insert_keeps_invariants() {
        let mut tree: Tree<16> = RbTree::new_in(OrdCompare, DefaultAllocator);
        for k in scrambled(256) {
            assert_eq!(tree.insert_unique(k, k * 2), None);
            tree.check_invariants();
        }
        assert_eq!(tree.len(), 256);
        assert_eq!(tree.pool().local_len(), 16);
        assert_eq!(tree.pool().overflow_len(), 240);
        let keys: Vec<u32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, (0..256).collect::<Vec<_>>());
    }

    #[test]
    fn test_rbtree_remove_keeps_invariants() {
        let mut tree: Tree<8> = RbTree::new_in(OrdCompare, DefaultAllocator);
        for k in scrambled(128) {
            tree.insert_unique(k, k);
        }
        for k in scrambled(128).filter(|k| k % 3 != 0) {
            assert_eq!(tree.remove(&k), Some((k, k)));
            tree.check_invariants();
        }
        assert!(tree.iter().all(|(k, _)| k % 3 == 0));
        assert_eq!(tree.len(), 43);

        while let Some((k, _)) = tree.pop_last() {
            assert_eq!(k % 3, 0);
            tree.check_invariants();
        }
        assert_eq!(tree.pool().local_len() + tree.pool().overflow_len(), 0);
    }

    #[test]
    fn test_rbtree_duplicates_and_bounds() {
        let mut tree: Tree<8> = RbTree::new_in(OrdCompare, DefaultAllocator);
        for (k, v) in [(5, 0), (3, 1), (5, 2), (7, 3), (5, 4)] {
            tree.insert_equal(k, v);
        }
        tree.check_invariants();
        assert_eq!(tree.count(&5), 3);
        assert_eq!(tree.count(&4), 0);

        // equal keys keep insertion order
        let fives: Vec<u32> = tree
            .range(Bound::Included(&5), Bound::Included(&5))
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(fives, [0, 2, 4]);

        assert_eq!(tree.key(tree.lower_bound(&4).unwrap()), &5);
        assert_eq!(tree.key(tree.upper_bound(&5).unwrap()), &7);
        assert!(tree.upper_bound(&7).is_none());

        assert_eq!(tree.remove_all(&5), 3);
        tree.check_invariants();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_rbtree_empty_ranges() {
        let mut tree: Tree<4> = RbTree::new_in(OrdCompare, DefaultAllocator);
        for k in [1, 2, 3] {
            tree.insert_unique(k, k);
        }
        assert_eq!(tree.range(Bound::Excluded(&2), Bound::Excluded(&3)).count(), 0);
        assert_eq!(tree.range(Bound::Included(&3), Bound::Included(&1)).count(), 0);
        assert_eq!(tree.range(Bound::Included(&9), Bound::Unbounded).count(), 0);
        let back: Vec<u32> = tree
            .range(Bound::Unbounded, Bound::Excluded(&3))
            .rev()
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(back, [2, 1]);
    }

    #[test]
    fn test_rbtree_clear_frees_every_node() {
        let counter = CountingAllocator::new();
        let mut tree: RbTree<u32, String, 4, true, CountingAllocator, OrdCompare> =
            RbTree::new_in(OrdCompare, counter.clone());
        for k in scrambled(32) {
            tree.insert_unique(k, k.to_string());
        }
        assert_eq!(counter.allocations(), 28);
        tree.clear();
        assert_eq!(tree.len(), 0);
        assert_eq!(counter.deallocations(), 28);
        assert_eq!(counter.live_bytes(), 0);
        assert_eq!(tree.pool().local_len(), 0);
    }

    #[test]
    fn test_rbtree_retain_across_storage() {
        let mut tree: Tree<4> = RbTree::new_in(OrdCompare, DefaultAllocator);
        for k in scrambled(64) {
            tree.insert_unique(k, k);
        }
        tree.retain(|k, v| {
            *v += 1;
            k % 4 == 0
        });
        tree.check_invariants();
        assert_eq!(tree.len(), 16);
        assert!(tree.iter().all(|(k, v)| *v == k + 1));
    }

    #[test]
    fn test_rbtree_swap_paths() {
        let counter = CountingAllocator::new();
        type Counted = RbTree<u32, u32, 2, true, CountingAllocator, OrdCompare>;
        let mut a: Counted = RbTree::new_in(OrdCompare, counter.clone());
        let mut b: Counted = RbTree::new_in(OrdCompare, counter.clone());
        for k in 0..5 {
            a.insert_unique(k, k);
        }
        b.insert_unique(100, 100);

        a.fixed_swap(&mut b);
        a.check_invariants();
        b.check_invariants();
        assert_eq!(a.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [100]);
        assert_eq!(b.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_rbtree_swap_exchanges_overflow_nodes() {
        let counter = CountingAllocator::new();
        type Counted = RbTree<u32, u32, 2, true, CountingAllocator, OrdCompare>;
        let mut a: Counted = RbTree::new_in(OrdCompare, counter.clone());
        let mut b: Counted = RbTree::new_in(OrdCompare, counter.clone());
        for k in 0..5 {
            a.insert_unique(k, k);
            b.insert_unique(k + 10, k);
        }
        // the first two keys of each tree sit in the embedded buffer
        for k in [0, 1] {
            a.remove(&k);
            b.remove(&(k + 10));
        }
        assert_eq!(a.pool().local_len(), 0);
        assert_eq!(b.pool().local_len(), 0);

        let (allocs, frees) = (counter.allocations(), counter.deallocations());
        a.fixed_swap(&mut b);
        assert_eq!(counter.allocations(), allocs);
        assert_eq!(counter.deallocations(), frees);
        a.check_invariants();
        b.check_invariants();
        assert_eq!(a.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [12, 13, 14]);
        assert_eq!(b.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [2, 3, 4]);
    }
}
