//! The ordered set family, built on the same tree as the maps.

pub mod fixed_multiset;
pub mod fixed_set;

pub use fixed_multiset::FixedMultiSet;
pub use fixed_set::{FixedSet, IntoIter, Iter, Range};
