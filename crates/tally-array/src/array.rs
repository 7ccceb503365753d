//! The growable contiguous array.
//!
//! [`DynArray`] keeps its values in a single [`TrackedAllocator`] block.
//! The first `len` slots are live, the remaining `capacity - len` slots
//! are uninitialized. When an insertion finds the buffer full, capacity
//! grows by the [`GrowthPolicy`] factor (3/2 by default) into a fresh
//! block, the values are relocated and the old block is released.
//!
//! Growth is all-or-nothing: the new block is obtained before any value
//! moves, so a failed allocation leaves the array untouched. Likewise an
//! insertion only starts shifting values once growth has succeeded.

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::slice;

use tally_alloc::TrackedAllocator;
use tally_core::{AllocError, ArrayError, GrowthPolicy};
use tracing::{debug, error, trace, warn};

use crate::iter::IntoIter;
use crate::raw::RawBuf;

/// A growable, owning, contiguous sequence.
///
/// Dereferences to `[T]`, so indexing, `get`, `iter` and every other
/// slice method are available. Fallible operations return
/// [`ArrayError`] and leave the array exactly as it was.
pub struct DynArray<T> {
    buf: RawBuf<T>,
    len: usize,
    policy: GrowthPolicy,
}

impl<T> DynArray<T> {
    /// Create an empty array with its own allocator and the default
    /// policy. Allocates the initial capacity (8 slots) eagerly.
    #[track_caller]
    pub fn new() -> Result<Self, ArrayError> {
        Self::new_in(TrackedAllocator::new())
    }

    /// Create an empty array accounted to `alloc`.
    #[track_caller]
    pub fn new_in(alloc: TrackedAllocator) -> Result<Self, ArrayError> {
        Self::with_policy(alloc, GrowthPolicy::default())
    }

    /// Create an empty array accounted to `alloc` that grows by `policy`.
    #[track_caller]
    pub fn with_policy(alloc: TrackedAllocator, policy: GrowthPolicy) -> Result<Self, ArrayError> {
        let buf = RawBuf::with_capacity(alloc, policy.initial_capacity())?;
        trace!(
            target: "tally::array",
            ptr = ?buf.as_ptr(),
            capacity = buf.capacity(),
            elem = std::any::type_name::<T>(),
            "created array"
        );
        Ok(Self {
            buf,
            len: 0,
            policy,
        })
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated slots. `usize::MAX` for zero-sized types.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Pointer to the first slot. Dangling when the capacity is zero.
    pub fn as_ptr(&self) -> *const T {
        self.buf.as_ptr()
    }

    /// The live elements.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` are live, and the pointer is non-null and
        // aligned even when dangling.
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    /// The live elements, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, and `&mut self` makes the borrow unique.
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    /// The allocator this array's buffer is accounted to.
    pub fn allocator(&self) -> &TrackedAllocator {
        self.buf.allocator()
    }

    /// The growth policy.
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Move the contents out into a new array without copying elements.
    ///
    /// The returned array owns this array's buffer, length and capacity
    /// verbatim. `self` is left empty with zero capacity and no buffer;
    /// it remains usable and grows to the initial capacity on the next
    /// insertion. Zero-sized types never own a buffer, so for them `self`
    /// keeps reporting `usize::MAX` capacity.
    pub fn take(&mut self) -> Self {
        let len = mem::replace(&mut self.len, 0);
        let buf = self.buf.take();
        trace!(
            target: "tally::array",
            ptr = ?buf.as_ptr(),
            len,
            capacity = buf.capacity(),
            "moved array contents"
        );
        Self {
            buf,
            len,
            policy: self.policy,
        }
    }

    /// Grow the buffer to exactly `new_capacity` slots.
    ///
    /// Reserving never shrinks: a request that does not exceed the
    /// current capacity fails with [`ArrayError::ReserveNotGrowing`].
    #[track_caller]
    pub fn reserve(&mut self, new_capacity: usize) -> Result<(), ArrayError> {
        let capacity = self.capacity();
        if new_capacity <= capacity {
            warn!(
                target: "tally::array",
                requested = new_capacity,
                capacity,
                "reserve would not grow the buffer"
            );
            return Err(ArrayError::ReserveNotGrowing {
                requested: new_capacity,
                capacity,
            });
        }
        self.relocate(new_capacity)
    }

    /// Set the length to exactly `new_len`, filling new slots with
    /// `T::default()`.
    #[track_caller]
    pub fn resize(&mut self, new_len: usize) -> Result<(), ArrayError>
    where
        T: Default,
    {
        self.resize_with(new_len, T::default)
    }

    /// Set the length to exactly `new_len`, filling new slots with values
    /// produced by `fill`.
    ///
    /// Shrinking drops the trailing elements in place and keeps the
    /// buffer. Growing beyond the capacity first relocates to the larger
    /// of `new_len` and one growth step; if that fails nothing changes.
    #[track_caller]
    pub fn resize_with<F>(&mut self, new_len: usize, mut fill: F) -> Result<(), ArrayError>
    where
        F: FnMut() -> T,
    {
        if new_len < self.len {
            self.truncate(new_len);
        } else {
            if new_len > self.capacity() {
                let target = self.policy.grow_to(self.capacity(), new_len);
                self.relocate(target)?;
            }
            while self.len < new_len {
                // SAFETY: `len < new_len <= capacity` and slot `len` is empty.
                unsafe { self.buf.write(self.len, fill()) };
                self.len += 1;
            }
        }
        debug!(target: "tally::array", len = self.len, capacity = self.capacity(), "resized");
        Ok(())
    }

    /// Release unused capacity. Not supported; always fails with
    /// [`ArrayError::Unsupported`] and leaves the array unchanged.
    pub fn shrink_to_fit(&mut self) -> Result<(), ArrayError> {
        warn!(
            target: "tally::array",
            len = self.len,
            capacity = self.capacity(),
            "shrink_to_fit is not supported"
        );
        Err(ArrayError::Unsupported {
            operation: "shrink_to_fit",
        })
    }

    /// Drop the elements at `[new_len, len)`. No-op if `new_len >= len`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        let dropped = self.len - new_len;
        while self.len > new_len {
            self.len -= 1;
            // SAFETY: slot `len` was live and is now outside the live range.
            unsafe { self.buf.drop_slot(self.len) };
        }
        debug!(target: "tally::array", dropped, len = self.len, "truncated");
    }

    /// Drop every element, keeping the buffer.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Append `value`, returning a reference to it.
    #[track_caller]
    pub fn push(&mut self, value: T) -> Result<&mut T, ArrayError> {
        self.reserve_one()?;
        Ok(self.write_at_end(value))
    }

    /// Append a value built by `make`, returning a reference to it.
    ///
    /// `make` runs only after any growth has succeeded.
    #[track_caller]
    pub fn emplace_back<F>(&mut self, make: F) -> Result<&mut T, ArrayError>
    where
        F: FnOnce() -> T,
    {
        self.reserve_one()?;
        Ok(self.write_at_end(make()))
    }

    /// Insert `value` at `index`, shifting later elements right.
    ///
    /// `index == len` appends. An index past the end fails with
    /// [`ArrayError::IndexOutOfRange`]; on any failure `value` is dropped
    /// and the array is unchanged.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) -> Result<&mut T, ArrayError> {
        self.check_insert_index(index)?;
        self.reserve_one()?;
        Ok(self.place(index, value))
    }

    /// Insert a clone of `value` at `index`.
    #[track_caller]
    pub fn insert_cloned(&mut self, index: usize, value: &T) -> Result<&mut T, ArrayError>
    where
        T: Clone,
    {
        self.check_insert_index(index)?;
        self.reserve_one()?;
        Ok(self.place(index, value.clone()))
    }

    /// Insert a clone of the element currently at `source` at `index`.
    ///
    /// The clone is taken before the buffer grows or any element moves,
    /// so the result is the same as cloning the element out first and
    /// inserting the clone.
    #[track_caller]
    pub fn insert_copy_of(&mut self, index: usize, source: usize) -> Result<&mut T, ArrayError>
    where
        T: Clone,
    {
        if source >= self.len {
            return Err(self.out_of_range(source, "insert_copy_of"));
        }
        self.check_insert_index(index)?;
        let value = self.as_slice()[source].clone();
        self.reserve_one()?;
        Ok(self.place(index, value))
    }

    /// Insert a value built by `make` at `index`.
    ///
    /// `make` runs only after the index has been validated and any growth
    /// has succeeded.
    #[track_caller]
    pub fn emplace<F>(&mut self, index: usize, make: F) -> Result<&mut T, ArrayError>
    where
        F: FnOnce() -> T,
    {
        self.check_insert_index(index)?;
        self.reserve_one()?;
        Ok(self.place(index, make()))
    }

    /// Remove and return the element at `index`, shifting later elements
    /// left. Requires `index < len`.
    pub fn remove(&mut self, index: usize) -> Result<T, ArrayError> {
        if index >= self.len {
            return Err(self.out_of_range(index, "remove"));
        }
        // SAFETY: `index < len`, so the slot is live; ownership moves to
        // `value` and the hole is closed before `len` shrinks.
        let value = unsafe {
            let value = self.buf.read(index);
            self.buf.shift_left(index, self.len);
            value
        };
        self.len -= 1;
        debug!(
            target: "tally::array",
            index,
            shifted = self.len - index,
            len = self.len,
            "removed element"
        );
        Ok(value)
    }

    /// Remove and return the last element, or `None` if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot `len` was live and is now outside the live range.
        let value = unsafe { self.buf.read(self.len) };
        debug!(target: "tally::array", index = self.len, len = self.len, "popped element");
        Some(value)
    }

    /// Append clones of every element of `other`, growing once.
    #[track_caller]
    pub fn extend_from_slice(&mut self, other: &[T]) -> Result<(), ArrayError>
    where
        T: Clone,
    {
        let required = self
            .len
            .checked_add(other.len())
            .ok_or_else(|| self.overflow(other.len()))?;
        if required > self.capacity() {
            let target = self.policy.grow_to(self.capacity(), required);
            self.relocate(target)?;
        }
        for item in other {
            self.write_at_end(item.clone());
        }
        Ok(())
    }

    /// Clone into a new array sharing this array's allocator and policy.
    ///
    /// The copy gets the growth factor as headroom over the current
    /// length. The source is not modified.
    #[track_caller]
    pub fn try_clone(&self) -> Result<Self, ArrayError>
    where
        T: Clone,
    {
        let capacity = self
            .policy
            .headroom(self.len)
            .ok_or_else(|| self.overflow(self.len))?;
        let buf = RawBuf::with_capacity(self.allocator().clone(), capacity)?;
        let mut copy = Self {
            buf,
            len: 0,
            policy: self.policy,
        };
        for item in self.iter() {
            copy.write_at_end(item.clone());
        }
        debug!(
            target: "tally::array",
            from = ?self.as_ptr(),
            to = ?copy.as_ptr(),
            len = copy.len,
            "cloned array"
        );
        Ok(copy)
    }

    #[track_caller]
    fn reserve_one(&mut self) -> Result<(), ArrayError> {
        if self.len < self.capacity() {
            return Ok(());
        }
        let target = self
            .policy
            .next_capacity(self.capacity())
            .ok_or_else(|| self.overflow(self.capacity()))?;
        self.relocate(target)
    }

    /// Move every element into a fresh block of `new_capacity` slots.
    #[track_caller]
    fn relocate(&mut self, new_capacity: usize) -> Result<(), ArrayError> {
        debug_assert!(new_capacity >= self.len);
        let mut fresh = RawBuf::with_capacity(self.allocator().clone(), new_capacity)?;
        // SAFETY: `[0, len)` are live in the old block and `fresh` has at
        // least `len` empty slots. The old block is released below without
        // dropping anything.
        unsafe { self.buf.relocate_into(&mut fresh, self.len) };
        let old = mem::replace(&mut self.buf, fresh);
        trace!(
            target: "tally::array",
            from = ?old.as_ptr(),
            to = ?self.buf.as_ptr(),
            old_capacity = old.capacity(),
            capacity = self.capacity(),
            len = self.len,
            "relocated buffer"
        );
        drop(old);
        Ok(())
    }

    /// Write `value` into slot `len`. The caller guarantees spare capacity.
    fn write_at_end(&mut self, value: T) -> &mut T {
        debug_assert!(self.len < self.capacity());
        let index = self.len;
        // SAFETY: `index < capacity` and the slot is empty.
        unsafe { self.buf.write(index, value) };
        self.len += 1;
        debug!(target: "tally::array", index, len = self.len, "pushed element");
        // SAFETY: the slot was just initialized.
        unsafe { &mut *self.buf.as_ptr().add(index) }
    }

    /// Open a hole at `index` and fill it. The caller has validated
    /// `index <= len` and guaranteed spare capacity.
    fn place(&mut self, index: usize, value: T) -> &mut T {
        debug_assert!(index <= self.len && self.len < self.capacity());
        let shifted = self.len - index;
        // SAFETY: `index <= len < capacity`. Shifting leaves slot `index`
        // logically empty, and it is filled before `len` grows.
        unsafe {
            self.buf.shift_right(index, self.len);
            self.buf.write(index, value);
        }
        self.len += 1;
        debug!(target: "tally::array", index, shifted, len = self.len, "inserted element");
        // SAFETY: the slot was just initialized.
        unsafe { &mut *self.buf.as_ptr().add(index) }
    }

    fn check_insert_index(&self, index: usize) -> Result<(), ArrayError> {
        if index > self.len {
            return Err(self.out_of_range(index, "insert"));
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize, operation: &'static str) -> ArrayError {
        error!(target: "tally::array", index, len = self.len, operation, "index out of range");
        ArrayError::IndexOutOfRange {
            index,
            len: self.len,
        }
    }

    fn overflow(&self, count: usize) -> ArrayError {
        error!(target: "tally::array", count, "capacity overflow");
        ArrayError::Alloc(AllocError::CapacityOverflow {
            elem_size: mem::size_of::<T>(),
            count,
        })
    }
}

impl<T> Drop for DynArray<T> {
    fn drop(&mut self) {
        if self.len == 0 {
            trace!(target: "tally::array", "dropping empty array");
            return;
        }
        let len = mem::replace(&mut self.len, 0);
        // SAFETY: `[0, len)` were live; `len` is reset first so nothing is
        // dropped twice. The buffer is released when `buf` drops.
        unsafe { self.buf.drop_range(0, len) };
        trace!(target: "tally::array", ptr = ?self.buf.as_ptr(), len, "dropped elements");
    }
}

impl<T> Deref for DynArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq<U>, U> PartialEq<DynArray<U>> for DynArray<T> {
    fn eq(&self, other: &DynArray<U>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynArray<T> {}

impl<T: PartialEq<U>, U> PartialEq<[U]> for DynArray<T> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U> PartialEq<&[U]> for DynArray<T> {
    fn eq(&self, other: &&[U]) -> bool {
        self.as_slice() == *other
    }
}

impl<T: PartialEq<U>, U, const N: usize> PartialEq<[U; N]> for DynArray<T> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut DynArray<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for DynArray<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> IntoIter<T> {
        let len = mem::replace(&mut self.len, 0);
        IntoIter::new(self.buf.take(), len)
    }
}
