//! Key ordering for the ordered map/set family.
//!
//! Containers default to [`OrdCompare`], the key type's own [`Ord`]. A
//! comparator instance can be supplied at construction to order keys some
//! other way; lookups by a borrowed form `Q` of the key need a comparator that
//! also implements `KeyCompare<Q>`.

use core::cmp::Ordering;
use core::fmt;

/// A strict weak ordering over `Q`.
pub trait KeyCompare<Q: ?Sized> {
    fn compare(&self, a: &Q, b: &Q) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OrdCompare;

impl<Q: Ord + ?Sized> KeyCompare<Q> for OrdCompare {
    #[inline(always)]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        a.cmp(b)
    }
}

/// Orders keys by the reverse of their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReverseCompare;

impl<Q: Ord + ?Sized> KeyCompare<Q> for ReverseCompare {
    #[inline(always)]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        b.cmp(a)
    }
}

/// Adapts a function or closure into a comparator.
///
/// ```
/// use fixed_collections::{FixedSet, FnCompare};
///
/// let by_len = FnCompare(|a: &&str, b: &&str| a.len().cmp(&b.len()));
/// let mut set: FixedSet<&str, 4, true, _, _> = FixedSet::with_comparator(by_len);
/// set.insert("ccc");
/// set.insert("a");
/// set.insert("bb");
/// assert_eq!(set.iter().copied().collect::<Vec<_>>(), ["a", "bb", "ccc"]);
/// ```
#[derive(Clone, Copy, Default)]
pub struct FnCompare<F>(pub F);

impl<Q: ?Sized, F: Fn(&Q, &Q) -> Ordering> KeyCompare<Q> for FnCompare<F> {
    #[inline(always)]
    fn compare(&self, a: &Q, b: &Q) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for FnCompare<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCompare")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_orderings() {
        assert_eq!(OrdCompare.compare(&1, &2), Ordering::Less);
        assert_eq!(ReverseCompare.compare(&1, &2), Ordering::Greater);
        assert_eq!(KeyCompare::<str>::compare(&OrdCompare, "b", "a"), Ordering::Greater);

        let modulo = FnCompare(|a: &u32, b: &u32| (a % 10).cmp(&(b % 10)));
        assert_eq!(modulo.compare(&19, &21), Ordering::Greater);
        assert_eq!(modulo.compare(&13, &3), Ordering::Equal);
    }
}
