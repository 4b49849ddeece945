//! UTF-8 string with an embedded, NUL-terminated buffer.
//!
//! Provides [`FixedString`], a byte [`FixedVec`] that always keeps a NUL byte
//! after the last character so [`as_c_ptr`](FixedString::as_c_ptr) can hand
//! the contents to C without copying. `N` counts that terminator: a
//! `FixedString<16>` stores up to 15 bytes before it overflows.
//!
//! Implements `Deref<Target = str>` so all `&str` methods are available directly.

use core::borrow::{Borrow, BorrowMut};
use core::cmp::Ordering;
use core::ffi::c_char;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::{AddAssign, Deref, DerefMut};
use core::ptr;
use core::slice;
use core::str;

use crate::alloc::{DefaultAllocator, OverflowAllocator};
use crate::error::FixedError;
use crate::swap::FixedSwap;
use crate::vecs::FixedVec;

/// A string holding up to `N - 1` bytes inline before spilling into the
/// overflow allocator.
///
/// The overflow rules are those of [`FixedVec`]: the overflow flag is sticky,
/// and with `OVERFLOW == false` growing past `N - 1` bytes panics. Capacities
/// and lengths are in bytes and exclude the terminator.
///
/// `N` must be at least 2; smaller values fail to compile once the type is
/// used.
///
/// ```
/// use fixed_collections::FixedString;
///
/// let mut s: FixedString<8> = FixedString::from("fixed");
/// s.push('!');
/// assert_eq!(s, "fixed!");
/// assert_eq!(s.as_bytes_with_nul(), b"fixed!\0");
/// assert!(!s.has_overflowed());
/// ```
pub struct FixedString<const N: usize, const OVERFLOW: bool = true, A: OverflowAllocator = DefaultAllocator> {
    // contents followed by one NUL byte; never empty
    vec: FixedVec<u8, N, OVERFLOW, A>,
}

impl<const N: usize, const OVERFLOW: bool> FixedString<N, OVERFLOW, DefaultAllocator> {
    pub fn new() -> Self {
        Self::new_in(DefaultAllocator)
    }

    /// Converts a vector of bytes, rejecting invalid UTF-8.
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, std::string::FromUtf8Error> {
        let s = String::from_utf8(bytes)?;
        Ok(Self::from(s.as_str()))
    }

    /// Converts bytes, replacing invalid sequences with `U+FFFD`.
    pub fn from_utf8_lossy(bytes: &[u8]) -> Self {
        Self::from(&*String::from_utf8_lossy(bytes))
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedString<N, OVERFLOW, A> {
    const HAS_ROOM_FOR_NUL: () = assert!(N >= 2, "FixedString needs N >= 2: one byte of content plus the NUL terminator");

    pub fn new_in(alloc: A) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::HAS_ROOM_FOR_NUL;
        let mut vec = FixedVec::new_in(alloc);
        vec.push(0);
        Self { vec }
    }

    /// Moves the contents of `source` into a new string, leaving `source`
    /// empty and back on its embedded buffer.
    pub fn take_from(source: &mut Self) -> Self {
        let vec = FixedVec::take_from(&mut source.vec);
        source.vec.push(0);
        Self { vec }
    }

    /// Length in bytes, excluding the terminator.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vec.len() - 1
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the current storage holds, excluding the terminator.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.vec.capacity() - 1
    }

    /// Bytes of content the embedded buffer holds: `N - 1`.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        N - 1
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.len() >= N - 1 || self.has_overflowed()
    }

    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.vec.has_overflowed()
    }

    #[inline(always)]
    pub fn can_overflow(&self) -> bool {
        OVERFLOW
    }

    pub fn overflow_allocator(&self) -> &A {
        self.vec.overflow_allocator()
    }

    pub fn overflow_allocator_mut(&mut self) -> &mut A {
        self.vec.overflow_allocator_mut()
    }

    pub fn set_overflow_allocator(&mut self, alloc: A) {
        self.vec.set_overflow_allocator(alloc);
    }

    pub fn copy_overflow_allocator(&mut self, other: &Self) {
        self.vec.copy_overflow_allocator(&other.vec);
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        // SAFETY: the content bytes are always valid UTF-8.
        unsafe { str::from_utf8_unchecked(self.as_bytes()) }
    }

    #[inline(always)]
    pub fn as_mut_str(&mut self) -> &mut str {
        let len = self.len();
        // SAFETY: as above; the terminator is outside the returned range.
        unsafe { str::from_utf8_unchecked_mut(&mut self.vec[..len]) }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.vec[..self.len()]
    }

    /// The contents followed by the NUL terminator.
    #[inline(always)]
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.vec
    }

    /// A pointer to the NUL-terminated contents, valid until the string is
    /// next modified or moved.
    #[inline(always)]
    pub fn as_c_ptr(&self) -> *const c_char {
        self.vec.as_ptr() as *const c_char
    }

    // --- capacity ---

    /// Ensures room for `additional` more bytes.
    ///
    /// # Panics
    /// When the string cannot overflow and the bytes would not fit.
    pub fn reserve(&mut self, additional: usize) {
        self.vec.reserve(additional);
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), FixedError> {
        self.vec.try_reserve(additional)
    }

    /// Changes the capacity to `n` bytes, truncating longer contents.
    ///
    /// Follows [`FixedVec::set_capacity`]: `n <= N - 1` returns an overflowed
    /// string to its embedded buffer.
    ///
    /// # Panics
    /// When `n` is shorter than the contents and not on a char boundary.
    pub fn set_capacity(&mut self, n: usize) {
        self.truncate(n);
        self.vec.set_capacity(n.saturating_add(1));
    }

    pub fn shrink_to_fit(&mut self) {
        self.vec.shrink_to_fit();
    }

    // --- modification ---

    /// Writes `bytes` at `index`, shifting the tail (and terminator) up.
    ///
    /// Capacity must already be reserved and `index` must be a char boundary.
    unsafe fn insert_bytes(&mut self, index: usize, bytes: &[u8]) {
        let total = self.vec.len();
        let amt = bytes.len();
        debug_assert!(total + amt <= self.vec.capacity());
        // SAFETY: guaranteed by the caller; `bytes` never aliases our storage
        // because we hold `&mut self`.
        unsafe {
            let p = self.vec.as_mut_ptr();
            ptr::copy(p.add(index), p.add(index + amt), total - index);
            ptr::copy_nonoverlapping(bytes.as_ptr(), p.add(index), amt);
            self.vec.set_len(total + amt);
        }
    }

    pub fn push(&mut self, ch: char) {
        self.push_str(ch.encode_utf8(&mut [0; 4]));
    }

    /// Appends `s`.
    ///
    /// # Panics
    /// When the string cannot overflow and `s` does not fit.
    pub fn push_str(&mut self, s: &str) {
        self.vec.reserve(s.len());
        // SAFETY: room was reserved; the end of the contents is a boundary.
        unsafe { self.insert_bytes(self.len(), s.as_bytes()) }
    }

    /// Appends `s`, or leaves the string untouched when it cannot grow.
    pub fn try_push_str(&mut self, s: &str) -> Result<(), FixedError> {
        self.vec.try_reserve(s.len())?;
        // SAFETY: as in `push_str`.
        unsafe { self.insert_bytes(self.len(), s.as_bytes()) };
        Ok(())
    }

    /// Appends `s` and returns the string for chaining.
    pub fn append(&mut self, s: &str) -> &mut Self {
        self.push_str(s);
        self
    }

    /// # Panics
    /// When `index` is not a char boundary, or on capacity exhaustion.
    pub fn insert(&mut self, index: usize, ch: char) {
        self.insert_str(index, ch.encode_utf8(&mut [0; 4]));
    }

    /// # Panics
    /// When `index` is not a char boundary, or on capacity exhaustion.
    pub fn insert_str(&mut self, index: usize, s: &str) {
        assert!(self.is_char_boundary(index), "insertion index {index} is not a char boundary");
        self.vec.reserve(s.len());
        // SAFETY: room was reserved and `index` is a boundary.
        unsafe { self.insert_bytes(index, s.as_bytes()) }
    }

    pub fn pop(&mut self) -> Option<char> {
        let ch = self.chars().next_back()?;
        self.truncate(self.len() - ch.len_utf8());
        Some(ch)
    }

    /// Removes and returns the char starting at byte `index`.
    ///
    /// # Panics
    /// When `index` is not a char boundary or is at the end of the string.
    pub fn remove(&mut self, index: usize) -> char {
        let ch = match self[index..].chars().next() {
            Some(ch) => ch,
            None => panic!("cannot remove a char from the end of a string"),
        };
        let next = index + ch.len_utf8();
        let total = self.vec.len();
        // SAFETY: `index..next` holds one whole char; the tail, terminator
        // included, moves down over it.
        unsafe {
            let p = self.vec.as_mut_ptr();
            ptr::copy(p.add(next), p.add(index), total - next);
            self.vec.set_len(total - (next - index));
        }
        ch
    }

    /// Shortens the string to `new_len` bytes; longer lengths do nothing.
    ///
    /// # Panics
    /// When `new_len` is not a char boundary.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len < self.len() {
            assert!(self.is_char_boundary(new_len), "new_len {new_len} is not a char boundary");
            self.vec[new_len] = 0;
            self.vec.truncate(new_len + 1);
        }
    }

    /// Keeps only the chars for which `keep` returns `true`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(char) -> bool,
    {
        struct Compact<'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> {
            vec: &'a mut FixedVec<u8, N, OVERFLOW, A>,
            read: usize,
            write: usize,
            len: usize,
        }

        impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Drop for Compact<'_, N, OVERFLOW, A> {
            fn drop(&mut self) {
                // keeps unvisited chars when `keep` panics
                let tail = self.len - self.read;
                let end = self.write + tail;
                // SAFETY: `read..len` is untouched content; `write <= read`.
                unsafe {
                    let p = self.vec.as_mut_ptr();
                    ptr::copy(p.add(self.read), p.add(self.write), tail);
                    p.add(end).write(0);
                    self.vec.set_len(end + 1);
                }
            }
        }

        let len = self.len();
        let mut g = Compact {
            vec: &mut self.vec,
            read: 0,
            write: 0,
            len,
        };
        while g.read < g.len {
            // SAFETY: `read` is a char boundary of the unvisited, unmodified tail.
            let rest = unsafe { str::from_utf8_unchecked(slice::from_raw_parts(g.vec.as_ptr().add(g.read), g.len - g.read)) };
            let Some(ch) = rest.chars().next() else { break };
            let width = ch.len_utf8();
            if keep(ch) {
                if g.write != g.read {
                    // SAFETY: both ranges lie within the contents.
                    unsafe {
                        let p = g.vec.as_mut_ptr();
                        ptr::copy(p.add(g.read), p.add(g.write), width);
                    }
                }
                g.write += width;
            }
            g.read += width;
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Empties the string; with `free_overflow` it also returns to the
    /// embedded buffer, releasing the overflow block.
    pub fn clear_with(&mut self, free_overflow: bool) {
        self.vec.clear_with(free_overflow);
        self.vec.push(0);
    }

    /// Empties the string and returns to the embedded buffer without
    /// releasing the overflow block.
    pub fn reset_lose_memory(&mut self) {
        self.vec.reset_lose_memory();
        self.vec.push(0);
    }

    /// Moves the contents into a `String`.
    pub fn into_string(self) -> String {
        let mut bytes = self.vec.into_vec();
        bytes.pop();
        // SAFETY: the contents were valid UTF-8.
        unsafe { String::from_utf8_unchecked(bytes) }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.into_string().into_bytes()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> FixedSwap for FixedString<N, OVERFLOW, A> {
    fn fixed_swap(&mut self, other: &mut Self) {
        self.vec.fixed_swap(&mut other.vec);
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Deref for FixedString<N, OVERFLOW, A> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> DerefMut for FixedString<N, OVERFLOW, A> {
    fn deref_mut(&mut self) -> &mut str {
        self.as_mut_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Clone for FixedString<N, OVERFLOW, A> {
    fn clone(&self) -> Self {
        Self { vec: self.vec.clone() }
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> Default for FixedString<N, OVERFLOW, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> fmt::Display for FixedString<N, OVERFLOW, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_str(), f)
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> fmt::Debug for FixedString<N, OVERFLOW, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// Fails with [`fmt::Error`] instead of panicking when a non-overflowing
/// string runs out of room.
impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> fmt::Write for FixedString<N, OVERFLOW, A> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.try_push_str(s).map_err(|_| fmt::Error)
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> AddAssign<&str> for FixedString<N, OVERFLOW, A> {
    fn add_assign(&mut self, s: &str) {
        self.push_str(s);
    }
}

// --- comparisons ---

impl<const N: usize, const M: usize, const O1: bool, const O2: bool, A, B> PartialEq<FixedString<M, O2, B>>
    for FixedString<N, O1, A>
where
    A: OverflowAllocator,
    B: OverflowAllocator,
{
    fn eq(&self, other: &FixedString<M, O2, B>) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Eq for FixedString<N, OVERFLOW, A> {}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<str> for FixedString<N, OVERFLOW, A> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<&'a str> for FixedString<N, OVERFLOW, A> {
    fn eq(&self, other: &&'a str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<String> for FixedString<N, OVERFLOW, A> {
    fn eq(&self, other: &String) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<FixedString<N, OVERFLOW, A>> for str {
    fn eq(&self, other: &FixedString<N, OVERFLOW, A>) -> bool {
        self == other.as_str()
    }
}

impl<'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<FixedString<N, OVERFLOW, A>> for &'a str {
    fn eq(&self, other: &FixedString<N, OVERFLOW, A>) -> bool {
        *self == other.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialEq<FixedString<N, OVERFLOW, A>> for String {
    fn eq(&self, other: &FixedString<N, OVERFLOW, A>) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> PartialOrd for FixedString<N, OVERFLOW, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Ord for FixedString<N, OVERFLOW, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Hash for FixedString<N, OVERFLOW, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

// --- conversions ---

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Borrow<str> for FixedString<N, OVERFLOW, A> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> BorrowMut<str> for FixedString<N, OVERFLOW, A> {
    fn borrow_mut(&mut self) -> &mut str {
        self.as_mut_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> AsRef<str> for FixedString<N, OVERFLOW, A> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> AsRef<[u8]> for FixedString<N, OVERFLOW, A> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<&str> for FixedString<N, OVERFLOW, A> {
    fn from(s: &str) -> Self {
        let mut out = Self::default();
        out.push_str(s);
        out
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<String> for FixedString<N, OVERFLOW, A> {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<char> for FixedString<N, OVERFLOW, A> {
    fn from(ch: char) -> Self {
        let mut out = Self::default();
        out.push(ch);
        out
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> From<FixedString<N, OVERFLOW, A>> for String {
    fn from(s: FixedString<N, OVERFLOW, A>) -> Self {
        s.into_string()
    }
}

#[cfg(feature = "heapless")]
impl<const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> From<heapless::String<M>>
    for FixedString<N, OVERFLOW, A>
{
    fn from(s: heapless::String<M>) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(feature = "heapless")]
impl<const N: usize, const M: usize, const OVERFLOW: bool, A: OverflowAllocator> TryFrom<FixedString<N, OVERFLOW, A>>
    for heapless::String<M>
{
    type Error = FixedString<N, OVERFLOW, A>;

    fn try_from(s: FixedString<N, OVERFLOW, A>) -> Result<Self, Self::Error> {
        let mut out = heapless::String::new();
        if out.push_str(s.as_str()).is_err() {
            return Err(s);
        }
        Ok(out)
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> FromIterator<char> for FixedString<N, OVERFLOW, A> {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut out = Self::default();
        out.extend(iter);
        out
    }
}

impl<'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator + Default> FromIterator<&'a str>
    for FixedString<N, OVERFLOW, A>
{
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut out = Self::default();
        out.extend(iter);
        out
    }
}

impl<const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Extend<char> for FixedString<N, OVERFLOW, A> {
    fn extend<I: IntoIterator<Item = char>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if OVERFLOW {
            self.reserve(lower);
        }
        for ch in iter {
            self.push(ch);
        }
    }
}

impl<'a, const N: usize, const OVERFLOW: bool, A: OverflowAllocator> Extend<&'a str> for FixedString<N, OVERFLOW, A> {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for s in iter {
            self.push_str(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use crate::swap::fixed_swap;
    use core::fmt::Write;

    #[test]
    fn test_string_append_until_full() {
        let mut s: FixedString<5, false> = FixedString::from("ab");
        assert_eq!(s.max_size(), 4);
        assert!(!s.full());
        s.append("cd");
        assert_eq!(s, "abcd");
        assert!(s.full());
        assert!(!s.has_overflowed());
        assert_eq!(s.max_size(), 4);
        assert_eq!(s.capacity(), 4);
        assert_eq!(s.as_bytes_with_nul(), b"abcd\0");
    }

    #[test]
    #[should_panic(expected = "fixed capacity exceeded")]
    fn test_string_no_overflow_append_panics() {
        let mut s: FixedString<5, false> = FixedString::from("abcd");
        s.append("e");
    }

    #[test]
    fn test_string_try_push_str_keeps_contents() {
        let mut s: FixedString<4, false> = FixedString::from("xy");
        assert!(s.try_push_str("zw").is_err());
        assert_eq!(s, "xy");
        assert!(s.try_push_str("z").is_ok());
        assert_eq!(s, "xyz");
        assert!(write!(s, "!").is_err());
    }

    #[test]
    fn test_string_overflow_keeps_terminator() {
        let mut s: FixedString<4> = FixedString::new();
        s.push_str("abc");
        assert!(!s.has_overflowed());
        s.push('d');
        assert!(s.has_overflowed());
        assert_eq!(s, "abcd");
        assert_eq!(s.as_bytes_with_nul(), b"abcd\0");
        let c = unsafe { core::ffi::CStr::from_ptr(s.as_c_ptr()) };
        assert_eq!(c.to_bytes(), b"abcd");

        s.truncate(1);
        assert!(s.has_overflowed());
        s.set_capacity(2);
        assert!(!s.has_overflowed());
        assert_eq!(s.capacity(), 3);
        assert_eq!(s.as_bytes_with_nul(), b"a\0");
    }

    #[test]
    fn test_string_set_capacity_max_keeps_contents() {
        let mut s: FixedString<8, false> = FixedString::from("abc");
        s.set_capacity(usize::MAX);
        assert_eq!(s, "abc");
        assert_eq!(s.capacity(), 7);
        assert_eq!(s.as_bytes_with_nul(), b"abc\0");
    }

    #[test]
    fn test_string_multibyte_edit() {
        let mut s: FixedString<8> = FixedString::from("héllo");
        assert_eq!(s.len(), 6);
        assert!(!s.has_overflowed());
        s.insert(0, '¡');
        assert!(s.has_overflowed());
        assert_eq!(s.remove(3), 'é');
        assert_eq!(s, "¡hllo");
        s.insert_str(3, "e");
        assert_eq!(s.pop(), Some('o'));
        assert_eq!(s, "¡hell");
        assert_eq!(s.as_bytes_with_nul().last(), Some(&0));
    }

    #[test]
    #[should_panic(expected = "not a char boundary")]
    fn test_string_truncate_inside_char() {
        let mut s: FixedString<8> = FixedString::from("é");
        s.truncate(1);
    }

    #[test]
    fn test_string_retain() {
        let mut s: FixedString<16> = FixedString::from("a1b2ç3");
        s.retain(|c| !c.is_ascii_digit());
        assert_eq!(s, "abç");
        assert_eq!(s.as_bytes_with_nul(), "abç\0".as_bytes());
    }

    #[test]
    fn test_string_clear_with_and_reset() {
        let counter = CountingAllocator::new();
        let mut s: FixedString<4, true, CountingAllocator> = FixedString::new_in(counter.clone());
        s.push_str("overflowing");
        s.clear();
        assert!(s.is_empty());
        assert!(s.has_overflowed());
        s.clear_with(true);
        assert!(!s.has_overflowed());
        assert_eq!(counter.live_bytes(), 0);

        s.push_str("again, longer");
        s.reset_lose_memory();
        assert!(s.is_empty());
        assert!(!s.has_overflowed());
        assert_eq!(s.as_bytes_with_nul(), b"\0");
        assert!(counter.live_bytes() > 0);
    }

    #[test]
    fn test_string_copy_and_move_independence() {
        let mut a: FixedString<8> = FixedString::from("left");
        let b = a.clone();
        a.push_str("over");
        assert_eq!(b, "left");

        let c = FixedString::take_from(&mut a);
        assert_eq!(c, "leftover");
        assert!(a.is_empty());
        assert!(!a.has_overflowed());
        a.push('x');
        assert_eq!(c, "leftover");
        assert_eq!(a.as_bytes_with_nul(), b"x\0");
    }

    #[test]
    fn test_string_swap() {
        let mut a: FixedString<8> = FixedString::from("short");
        let mut b: FixedString<8> = FixedString::from("a much longer one");
        fixed_swap(&mut a, &mut b);
        assert_eq!(a, "a much longer one");
        assert_eq!(b, "short");
        assert_eq!(b.as_bytes_with_nul(), b"short\0");
    }

    #[test]
    fn test_string_traits() {
        let mut s: FixedString<16> = "ab".chars().chain("cd".chars()).collect();
        s += "ef";
        write!(s, "{}", 7).unwrap();
        assert_eq!(s.to_string(), "abcdef7");
        assert_eq!(format!("{:?}", s), "\"abcdef7\"");
        assert_eq!(String::from("abcdef7"), s);
        assert_eq!("abcdef7", s);
        assert!(s > FixedString::<16>::from("abc"));
        let words: FixedString<4> = ["x", "yz", "w"].into_iter().collect();
        assert_eq!(words, "xyzw");
        assert_eq!(s.to_uppercase(), "ABCDEF7");
        let back: String = s.into();
        assert_eq!(back, "abcdef7");
        assert!(FixedString::<4>::from_utf8(vec![0xff]).is_err());
        assert_eq!(FixedString::<4>::from_utf8_lossy(b"a\xffb"), "a\u{FFFD}b");
    }

    #[cfg(feature = "heapless")]
    #[test]
    fn test_string_heapless_interop() {
        let h: heapless::String<8> = heapless::String::try_from("stack").unwrap();
        let s: FixedString<4> = FixedString::from(h);
        assert!(s.has_overflowed());
        let back: heapless::String<8> = heapless::String::try_from(s).unwrap();
        assert_eq!(back.as_str(), "stack");
        let long: FixedString<16> = FixedString::from("too long here");
        assert!(heapless::String::<4>::try_from(long).is_err());
    }
}
