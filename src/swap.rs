//! Content exchange between fixed containers.
//!
//! A fixed container's embedded buffer belongs to that one object, so two
//! containers can only exchange storage directly when both live entirely in
//! interchangeable overflow memory. Every other combination moves elements.

/// Exchanges the contents of two fixed containers of the same type.
///
/// Implementations take an O(1) path when both sides have overflowed into
/// equal overflow allocators and fall back to an element-wise swap
/// otherwise. After the call each container still uses its own embedded
/// buffer for whatever it holds locally.
pub trait FixedSwap {
    fn fixed_swap(&mut self, other: &mut Self);
}

/// Free-function form of [`FixedSwap::fixed_swap`].
///
/// ```
/// use fixed_collections::{fixed_swap, FixedVec};
///
/// let mut a: FixedVec<i32, 4> = FixedVec::from([1, 2, 3]);
/// let mut b: FixedVec<i32, 4> = FixedVec::from([9]);
/// fixed_swap(&mut a, &mut b);
/// assert_eq!(a, [9]);
/// assert_eq!(b, [1, 2, 3]);
/// ```
#[inline]
pub fn fixed_swap<T: FixedSwap>(a: &mut T, b: &mut T) {
    a.fixed_swap(b);
}
