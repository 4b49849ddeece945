//! # Fixed Collections
//!
//! Containers that keep their first `N` elements in a buffer embedded in the
//! container itself and, optionally, overflow into a fallback allocator once
//! that buffer is exhausted.
//!
//! This crate provides `FixedVec`, `FixedString`, `FixedMap`, `FixedMultiMap`,
//! `FixedSet` and `FixedMultiSet`.
//!
//! ## Key Features
//!
//! * **Embedded Storage:** Elements (or tree nodes) live inside the container until `N` is exceeded.
//! * **Optional Overflow:** With `OVERFLOW = true` (the default) growth continues in an
//!   [`OverflowAllocator`]; with `OVERFLOW = false` growing past `N` panics, and the `try_*`
//!   methods report [`FixedError::CapacityExceeded`] instead.
//! * **Sticky Overflow State:** `has_overflowed()` stays `true` after shrinking until storage is
//!   explicitly reclaimed (`clear_with(true)`, `set_capacity`, `reset_lose_memory`).
//! * **Move Safe:** No container stores a pointer into its own buffer, so moving one is always sound.
//! * **Fixed Swap:** [`fixed_swap`] exchanges overflow storage in O(1) when both sides allow it and
//!   moves elements otherwise.
//!
//! ## Capacity Constraints (`N`)
//!
//! * **For `FixedVec`:** `N` elements.
//! * **For `FixedString`:** `N` bytes including the NUL terminator, so `N - 1` bytes of text.
//!   `N` must be at least 2.
//! * **For the map and set family:** `N` tree nodes, one per entry.
//!
//! ## Examples
//!
//! ### FixedVec
//!
//! ```rust
//! use fixed_collections::FixedVec;
//!
//! let mut v: FixedVec<i32, 4> = FixedVec::new();
//! v.extend([1, 2, 3, 4]);
//! assert!(v.full());
//! assert!(!v.has_overflowed());
//!
//! // 5th element -> overflow storage
//! v.push(5);
//! assert!(v.has_overflowed());
//!
//! // Shrinking keeps the overflow state; reclaiming clears it.
//! v.truncate(2);
//! assert!(v.has_overflowed());
//! v.shrink_to_fit();
//! assert!(!v.has_overflowed());
//! ```
//!
//! ### FixedMap
//!
//! ```rust
//! use fixed_collections::FixedMap;
//!
//! let mut map: FixedMap<&str, i32, 2, false> = FixedMap::new();
//! map.insert("a", 1);
//! map.insert("b", 2);
//! assert!(map.full());
//! assert_eq!(map.try_insert("c", 3), Err(("c", 3)));
//! assert_eq!(map.get("a"), Some(&1));
//! ```
//!
//! ### FixedString
//!
//! ```rust
//! use fixed_collections::FixedString;
//!
//! let mut s: FixedString<16> = FixedString::new();
//! s.push_str("Hello");
//! s.push_str(" World");
//! assert!(!s.has_overflowed());
//!
//! s.push_str(" - and then some more");
//! assert!(s.has_overflowed());
//! ```
//!
//! ## Cargo features
//!
//! * `heapless` (default): conversions to and from `heapless::Vec` and `heapless::String`.
//! * `logging`: traces overflow transitions and unsafe resets through the `log` facade.

#[macro_use]
mod logging;

// --- Module Declarations ---

pub mod alloc;
pub mod compare;
pub mod config;
pub mod error;
pub mod maps;
pub mod sets;
pub mod string;
pub mod swap;
pub mod vecs;

// --- Re-exports ---

pub use alloc::{CountingAllocator, DefaultAllocator, FixedAllocator, OverflowAllocator};
pub use compare::{FnCompare, KeyCompare, OrdCompare, ReverseCompare};
pub use error::{AllocError, FixedError};
pub use maps::{FixedMap, FixedMultiMap};
pub use sets::{FixedMultiSet, FixedSet};
pub use string::FixedString;
pub use swap::{fixed_swap, FixedSwap};
pub use vecs::FixedVec;
