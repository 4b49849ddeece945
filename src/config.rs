//! Build-wide tuning constants.

/// Largest temporary container, in bytes, that a content swap builds on the
/// stack. Bigger temporaries are boxed.
pub const MAX_STACK_USAGE: usize = 4000;

/// Multiplier applied to the current capacity when overflow storage grows.
pub const GROWTH_FACTOR: usize = 2;

/// Capacity for a growth request: at least `required`, otherwise the current
/// capacity scaled by [`GROWTH_FACTOR`].
#[inline]
pub(crate) fn grown_capacity(current: usize, required: usize) -> usize {
    core::cmp::max(required, current.saturating_mul(GROWTH_FACTOR)).max(1)
}
