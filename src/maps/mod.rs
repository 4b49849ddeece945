//! The ordered map family and the red-black tree underneath it.

pub mod fixed_map;
pub mod fixed_multimap;
pub(crate) mod rbtree;

pub use fixed_map::{FixedMap, Keys, Values, ValuesMut};
pub use fixed_multimap::FixedMultiMap;
pub use rbtree::{IntoIter, Iter, IterMut, Range};
