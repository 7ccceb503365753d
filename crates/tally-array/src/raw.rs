//! Owning slot buffer.
//!
//! [`RawBuf`] owns one allocator block of `capacity` slots and nothing
//! else: it does not know which slots hold live values. Constructing a
//! value in a slot, reading one out and dropping one in place are
//! separate, explicit operations; the container on top keeps the live
//! length and decides when each happens. Dropping a `RawBuf` releases
//! the block without dropping any slot.

use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

use tally_alloc::TrackedAllocator;
use tally_core::AllocError;
use tracing::error;

pub(crate) struct RawBuf<T> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: TrackedAllocator,
    _owns: PhantomData<T>,
}

impl<T> RawBuf<T> {
    const IS_ZST: bool = mem::size_of::<T>() == 0;

    /// A buffer that owns no block. Zero-sized types report unlimited
    /// capacity; everything else reports zero.
    pub(crate) fn dangling(alloc: TrackedAllocator) -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: if Self::IS_ZST { usize::MAX } else { 0 },
            alloc,
            _owns: PhantomData,
        }
    }

    /// Allocate a block of exactly `cap` slots.
    #[track_caller]
    pub(crate) fn with_capacity(alloc: TrackedAllocator, cap: usize) -> Result<Self, AllocError> {
        if Self::IS_ZST || cap == 0 {
            return Ok(Self::dangling(alloc));
        }
        let ptr = alloc.allocate_array::<T>(cap)?;
        Ok(Self {
            ptr,
            cap,
            alloc,
            _owns: PhantomData,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub(crate) fn allocator(&self) -> &TrackedAllocator {
        &self.alloc
    }

    /// Move the block out, leaving `self` owning nothing.
    pub(crate) fn take(&mut self) -> Self {
        let empty = Self::dangling(self.alloc.clone());
        mem::replace(self, empty)
    }

    /// Construct `value` in slot `index`.
    ///
    /// # Safety
    ///
    /// `index < capacity` and the slot must not hold a live value (it
    /// would be overwritten without being dropped).
    pub(crate) unsafe fn write(&mut self, index: usize, value: T) {
        debug_assert!(index < self.cap);
        // SAFETY: in bounds per caller contract.
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }

    /// Move the value out of slot `index`, leaving it logically empty.
    ///
    /// # Safety
    ///
    /// The slot must hold a live value, which the caller now owns.
    pub(crate) unsafe fn read(&self, index: usize) -> T {
        debug_assert!(index < self.cap);
        // SAFETY: in bounds and initialized per caller contract.
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// Drop the value in slot `index` in place.
    ///
    /// # Safety
    ///
    /// The slot must hold a live value; afterwards it is empty.
    pub(crate) unsafe fn drop_slot(&mut self, index: usize) {
        debug_assert!(index < self.cap);
        // SAFETY: in bounds and initialized per caller contract.
        unsafe { ptr::drop_in_place(self.ptr.as_ptr().add(index)) }
    }

    /// Drop the values in slots `[start, end)` in index order.
    ///
    /// # Safety
    ///
    /// Every slot in the range must hold a live value.
    pub(crate) unsafe fn drop_range(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end && end <= self.cap);
        // SAFETY: the range is in bounds and initialized per caller
        // contract; slices drop their elements front to back.
        unsafe {
            let first = self.ptr.as_ptr().add(start);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first, end - start));
        }
    }

    /// Move slots `[index, len)` one slot right, opening a hole at
    /// `index`.
    ///
    /// # Safety
    ///
    /// `index <= len < capacity` and `[0, len)` are live. Afterwards slot
    /// `index` is logically empty and `[index + 1, len + 1)` are live.
    pub(crate) unsafe fn shift_right(&mut self, index: usize, len: usize) {
        debug_assert!(index <= len && len < self.cap);
        // SAFETY: source and destination are in bounds; `copy` handles
        // the overlap.
        unsafe {
            let at = self.ptr.as_ptr().add(index);
            ptr::copy(at, at.add(1), len - index);
        }
    }

    /// Move slots `(index, len)` one slot left, closing the hole at
    /// `index`.
    ///
    /// # Safety
    ///
    /// `index < len <= capacity`, slot `index` is logically empty and the
    /// other slots of `[0, len)` are live. Afterwards `[0, len - 1)` are
    /// live and slot `len - 1` is logically empty.
    pub(crate) unsafe fn shift_left(&mut self, index: usize, len: usize) {
        debug_assert!(index < len && len <= self.cap);
        // SAFETY: source and destination are in bounds; `copy` handles
        // the overlap.
        unsafe {
            let at = self.ptr.as_ptr().add(index);
            ptr::copy(at.add(1), at, len - index - 1);
        }
    }

    /// Move the first `len` values into `dst` by bitwise copy.
    ///
    /// # Safety
    ///
    /// `[0, len)` of `self` are live and `dst` has at least `len` empty
    /// slots. Afterwards the values belong to `dst` and the slots of
    /// `self` are logically empty.
    pub(crate) unsafe fn relocate_into(&self, dst: &mut RawBuf<T>, len: usize) {
        debug_assert!(len <= self.cap && len <= dst.cap);
        // SAFETY: distinct blocks, both in bounds per caller contract.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), dst.ptr.as_ptr(), len) }
    }
}

impl<T> Drop for RawBuf<T> {
    fn drop(&mut self) {
        if Self::IS_ZST || self.cap == 0 {
            return;
        }
        // SAFETY: the block was allocated by `self.alloc` and is released
        // exactly once; the owner has already dropped or moved out every
        // live slot.
        let result = unsafe { self.alloc.deallocate(Some(self.ptr.cast())) };
        if let Err(e) = result {
            error!(target: "tally::array", error = %e, "failed to release buffer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live<T: Copy>(buf: &RawBuf<T>, len: usize) -> Vec<T> {
        (0..len).map(|i| unsafe { *buf.as_ptr().add(i) }).collect()
    }

    #[test]
    fn allocation_is_booked_and_released() {
        let alloc = TrackedAllocator::new();
        let buf = RawBuf::<u32>::with_capacity(alloc.clone(), 8).unwrap();
        assert_eq!(buf.capacity(), 8);
        assert_eq!(alloc.live_bytes(), 32);
        drop(buf);
        assert_eq!(alloc.live_bytes(), 0);
    }

    #[test]
    fn zero_capacity_touches_nothing() {
        let alloc = TrackedAllocator::new();
        let buf = RawBuf::<u32>::with_capacity(alloc.clone(), 0).unwrap();
        assert_eq!(buf.capacity(), 0);
        drop(buf);
        assert_eq!(alloc.stats().allocations, 0);
    }

    #[test]
    fn zero_sized_type_is_unbounded() {
        let alloc = TrackedAllocator::new();
        let buf = RawBuf::<()>::with_capacity(alloc.clone(), 8).unwrap();
        assert_eq!(buf.capacity(), usize::MAX);
        assert_eq!(alloc.stats().allocations, 0);
    }

    #[test]
    fn shifts_open_and_close_a_hole() {
        let alloc = TrackedAllocator::new();
        let mut buf = RawBuf::<u32>::with_capacity(alloc, 4).unwrap();
        unsafe {
            buf.write(0, 1);
            buf.write(1, 2);
            buf.write(2, 3);
            buf.shift_right(1, 3);
            buf.write(1, 9);
        }
        assert_eq!(live(&buf, 4), vec![1, 9, 2, 3]);
        unsafe { buf.shift_left(0, 4) };
        assert_eq!(live(&buf, 3), vec![9, 2, 3]);
    }

    #[test]
    fn take_leaves_empty_buffer() {
        let alloc = TrackedAllocator::new();
        let mut buf = RawBuf::<u64>::with_capacity(alloc.clone(), 2).unwrap();
        let moved = buf.take();
        assert_eq!(buf.capacity(), 0);
        assert_eq!(moved.capacity(), 2);
        drop(buf);
        assert_eq!(alloc.live_bytes(), 16);
        drop(moved);
        assert_eq!(alloc.live_bytes(), 0);
    }
}
