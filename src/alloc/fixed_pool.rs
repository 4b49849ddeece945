//! Node-pool fixed allocator for node-based containers.
//!
//! Slots of the embedded buffer are handed out one node at a time. Released
//! slots are threaded into an intrusive free list stored in the slots
//! themselves; slots never handed out are served by a bump index. Both are
//! O(1). When neither has a slot left, nodes come from the overflow
//! allocator (or the request fails when overflow is disabled).

use core::alloc::Layout;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::{self, ManuallyDrop};
use core::ptr::{self, NonNull};

use super::{AlignedBuffer, DefaultAllocator, FixedAllocator, OverflowAllocator};
use crate::error::FixedError;

const NIL: usize = usize::MAX;

/// A pool slot: a live node, or the link to the next free slot.
#[repr(C)]
pub(crate) union PoolSlot<T> {
    #[allow(dead_code)]
    value: ManuallyDrop<T>,
    next: usize,
}

/// Handle to a node allocated from a [`FixedPoolAllocator`].
///
/// Local nodes are named by slot index rather than address, so handles stay
/// valid when the container (and the buffer inside it) is moved.
pub enum NodeRef<T> {
    Local(usize),
    Overflow(NonNull<T>),
}

impl<T> NodeRef<T> {
    #[inline(always)]
    pub fn is_local(&self) -> bool {
        matches!(self, NodeRef::Local(_))
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<T> {}

impl<T> PartialEq for NodeRef<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeRef::Local(a), NodeRef::Local(b)) => a == b,
            (NodeRef::Overflow(a), NodeRef::Overflow(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> Eq for NodeRef<T> {}

impl<T> Hash for NodeRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            NodeRef::Local(i) => (0u8, *i).hash(state),
            NodeRef::Overflow(p) => (1u8, p.as_ptr() as usize).hash(state),
        }
    }
}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Local(i) => f.debug_tuple("Local").field(i).finish(),
            NodeRef::Overflow(p) => f.debug_tuple("Overflow").field(p).finish(),
        }
    }
}

/// The embedded buffer's address, captured for resolving handles while the
/// pool is borrowed.
pub(crate) struct NodeBase<T> {
    slots: *mut PoolSlot<T>,
}

impl<T> Clone for NodeBase<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeBase<T> {}

impl<T> NodeBase<T> {
    /// Address of the node behind `node`.
    ///
    /// The result is only valid while the borrow the base was taken from
    /// is alive.
    #[inline(always)]
    pub(crate) fn resolve(self, node: NodeRef<T>) -> *mut T {
        match node {
            // SAFETY: local indices are always below `N`.
            NodeRef::Local(i) => unsafe { self.slots.add(i) as *mut T },
            NodeRef::Overflow(p) => p.as_ptr(),
        }
    }
}

/// Allocates fixed-size nodes from an embedded buffer of `N` slots, with an
/// optional overflow allocator behind it.
///
/// The allocator does not track which nodes hold live values; the owning
/// container drops its nodes and releases every handle it was given.
pub struct FixedPoolAllocator<T, const N: usize, const OVERFLOW: bool, A = DefaultAllocator>
where
    A: OverflowAllocator,
{
    buffer: AlignedBuffer<PoolSlot<T>, N>,
    free_head: usize,
    bump: usize,
    local_live: usize,
    overflow_live: usize,
    overflowed: bool,
    overflow: A,
    _marker: PhantomData<T>,
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator>
    FixedPoolAllocator<T, N, OVERFLOW, A>
{
    pub fn new(overflow: A) -> Self {
        Self {
            buffer: AlignedBuffer::new(),
            free_head: NIL,
            bump: 0,
            local_live: 0,
            overflow_live: 0,
            overflowed: false,
            overflow,
            _marker: PhantomData,
        }
    }

    /// Whether the next allocation can be served from the embedded buffer.
    #[inline(always)]
    pub fn can_allocate_local(&self) -> bool {
        self.free_head != NIL || self.bump < N
    }

    /// Whether the next allocation can succeed without failing on capacity.
    #[inline(always)]
    pub fn can_allocate(&self) -> bool {
        OVERFLOW || self.can_allocate_local()
    }

    /// Live nodes in the embedded buffer.
    #[inline(always)]
    pub fn local_len(&self) -> usize {
        self.local_live
    }

    /// Live nodes obtained from the overflow allocator.
    #[inline(always)]
    pub fn overflow_len(&self) -> usize {
        self.overflow_live
    }

    /// Allocates one uninitialized node.
    pub fn allocate(&mut self) -> Result<NodeRef<T>, FixedError> {
        if self.free_head != NIL {
            let index = self.free_head;
            // SAFETY: slots on the free list hold a valid `next` link.
            self.free_head = unsafe { (*self.buffer.slot(index)).next };
            self.local_live += 1;
            return Ok(NodeRef::Local(index));
        }
        if self.bump < N {
            let index = self.bump;
            self.bump += 1;
            self.local_live += 1;
            return Ok(NodeRef::Local(index));
        }
        if !OVERFLOW {
            return Err(FixedError::CapacityExceeded {
                capacity: N,
                requested: N + 1,
            });
        }
        let ptr = self.overflow.allocate(Layout::new::<T>())?;
        if !self.overflowed {
            trace!("fixed pool: {} local nodes exhausted, using overflow allocator", N);
            self.overflowed = true;
        }
        self.overflow_live += 1;
        Ok(NodeRef::Overflow(ptr.cast()))
    }

    /// Releases `node`. Its value must already have been dropped or moved out.
    ///
    /// # Safety
    /// `node` must come from this pool and must not have been released.
    pub unsafe fn deallocate(&mut self, node: NodeRef<T>) {
        match node {
            NodeRef::Local(index) => {
                let slot = self.buffer.slot_mut(index);
                // SAFETY: the slot belongs to the buffer and no longer holds a value.
                unsafe { ptr::addr_of_mut!((*slot).next).write(self.free_head) };
                self.free_head = index;
                self.local_live -= 1;
            }
            NodeRef::Overflow(ptr) => {
                // SAFETY: overflow nodes are allocated with this layout.
                unsafe { self.overflow.deallocate(ptr.cast(), Layout::new::<T>()) };
                self.overflow_live -= 1;
            }
        }
    }

    /// Releases a node named only by its address.
    ///
    /// # Safety
    /// As for [`deallocate`](Self::deallocate).
    pub unsafe fn deallocate_ptr(&mut self, ptr: NonNull<T>) {
        let node = self.node_ref(ptr);
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.deallocate(node) }
    }

    /// Converts a node address back into a handle with a range test against
    /// the embedded buffer.
    pub fn node_ref(&self, ptr: NonNull<T>) -> NodeRef<T> {
        match self.buffer.index_of(ptr.as_ptr() as *const PoolSlot<T>) {
            Some(index) => NodeRef::Local(index),
            None => NodeRef::Overflow(ptr),
        }
    }

    #[inline(always)]
    pub fn get(&self, node: NodeRef<T>) -> *const T {
        match node {
            NodeRef::Local(index) => self.buffer.slot(index) as *const T,
            NodeRef::Overflow(ptr) => ptr.as_ptr(),
        }
    }

    #[inline(always)]
    pub fn get_mut(&mut self, node: NodeRef<T>) -> *mut T {
        match node {
            NodeRef::Local(index) => self.buffer.slot_mut(index) as *mut T,
            NodeRef::Overflow(ptr) => ptr.as_ptr(),
        }
    }

    #[inline(always)]
    pub(crate) fn base(&self) -> NodeBase<T> {
        NodeBase {
            slots: self.buffer.as_ptr() as *mut PoolSlot<T>,
        }
    }

    #[inline(always)]
    pub(crate) fn base_mut(&mut self) -> NodeBase<T> {
        NodeBase {
            slots: self.buffer.as_mut_ptr(),
        }
    }

    /// Forgets every node and returns to the pristine local state.
    ///
    /// Outstanding overflow nodes are leaked, not freed.
    pub(crate) fn reset(&mut self) {
        self.free_head = NIL;
        self.bump = 0;
        self.local_live = 0;
        self.overflow_live = 0;
        self.overflowed = false;
    }

    /// Sets the sticky overflow flag without allocating.
    pub(crate) fn mark_overflowed(&mut self) {
        self.overflowed = true;
    }

    /// Exchanges overflow bookkeeping with `other` after their overflow
    /// nodes changed hands.
    pub(crate) fn swap_overflow_nodes(&mut self, other: &mut Self) {
        mem::swap(&mut self.overflow_live, &mut other.overflow_live);
        mem::swap(&mut self.overflowed, &mut other.overflowed);
    }
}

impl<T, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedAllocator
    for FixedPoolAllocator<T, N, OVERFLOW, A>
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
        self.overflowed
    }

    #[inline]
    fn owns(&self, ptr: *const u8) -> bool {
        self.buffer.contains(ptr as *const PoolSlot<T>)
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
    for FixedPoolAllocator<T, N, OVERFLOW, A>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedPoolAllocator")
            .field("capacity", &N)
            .field("local_len", &self.local_live)
            .field("overflow_len", &self.overflow_live)
            .field("overflowed", &self.overflowed)
            .finish()
    }
}
