//! Region-chained bump allocator for request-scoped memory.
//!
//! Every worker thread owns one [`Arena`]. While a request is processed, the
//! raw header block, the body, rewritten paths, file contents and compressed
//! replies are all carved out of it; once the reply is sent the whole arena is
//! rewound with [`Arena::clear`] instead of freeing objects one by one.
//!
//! # Layout
//!
//! The arena is a chain of regions. Each region is a page-multiple block of
//! zeroed memory with a cursor (`avail`) and a limit. An allocation takes the
//! first region in the chain with enough room left; when none has, a new
//! region large enough for the request (rounded up to whole pages) is appended
//! at the tail. Cursors are kept aligned to [`MAX_ALIGN`], so every allocation
//! is suitably aligned for any type the arena accepts.
//!
//! # Lifetimes
//!
//! Allocation takes `&self` and hands out `&'a mut` views, while
//! [`clear`](Arena::clear) takes `&mut self`. A view therefore cannot outlive
//! the reset that makes its memory reusable.

use std::alloc::{self, Layout};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::slice;

use crate::ensure;
use crate::protocol::AllocError;

/// Granularity of region sizes.
pub const PAGE_SIZE: usize = 4096;

/// Alignment of every allocation, the largest any primitive type needs.
pub const MAX_ALIGN: usize = 16;

/// A contiguous block of memory with a bump cursor.
struct Region {
    base: NonNull<u8>,
    layout: Layout,
    avail: Cell<usize>,
}

impl Region {
    fn with_capacity(min_size: usize) -> Result<Self, AllocError> {
        let size = region_size(min_size)?;
        let layout = Layout::from_size_align(size, MAX_ALIGN).map_err(|_e| AllocError::OutOfMemory { size })?;

        // SAFETY: `layout` has a non-zero size, `region_size` never returns less than a page.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(ptr).ok_or(AllocError::OutOfMemory { size })?;

        Ok(Self { base, layout, avail: Cell::new(0) })
    }

    #[inline]
    fn limit(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.limit() - self.avail.get()
    }

    /// Advances the cursor by `size` bytes if they fit before the limit.
    ///
    /// `size` must already be a multiple of [`MAX_ALIGN`].
    fn bump(&self, size: usize) -> Option<NonNull<u8>> {
        let start = self.avail.get();
        if size > self.remaining() {
            return None;
        }
        self.avail.set(start + size);

        // SAFETY: `start <= limit`, so the offset pointer stays inside (or one past the end of) the region.
        Some(unsafe { self.base.add(start) })
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: `base` was returned by `alloc_zeroed` with exactly this layout and is freed once.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

/// Rounds a requested capacity up to a whole number of pages, at least one.
fn region_size(min_size: usize) -> Result<usize, AllocError> {
    min_size.max(1).checked_next_multiple_of(PAGE_SIZE).ok_or(AllocError::OutOfMemory { size: min_size })
}

/// A per-thread bump allocator; see the [module documentation](self).
pub struct Arena {
    regions: RefCell<Vec<Region>>,
}

impl Arena {
    /// Creates an arena seeded with a single one-page region.
    pub fn new() -> Result<Self, AllocError> {
        Self::with_capacity(PAGE_SIZE)
    }

    /// Creates an arena whose first region holds at least `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let region = Region::with_capacity(capacity)?;
        Ok(Self { regions: RefCell::new(vec![region]) })
    }

    /// Reserves `layout.size()` bytes aligned to `layout.align()`.
    fn alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        ensure!(
            layout.align() <= MAX_ALIGN,
            AllocError::Unsupported { size: layout.size(), align: layout.align() }
        );

        let size = layout
            .align_to(MAX_ALIGN)
            .map(|layout| layout.pad_to_align().size())
            .map_err(|_e| AllocError::Unsupported { size: layout.size(), align: layout.align() })?;

        let mut regions = self.regions.borrow_mut();
        if let Some(ptr) = regions.iter().find_map(|region| region.bump(size)) {
            return Ok(ptr);
        }

        let region = Region::with_capacity(size)?;
        let ptr = region.bump(size).ok_or(AllocError::OutOfMemory { size })?;
        regions.push(region);
        Ok(ptr)
    }

    /// Allocates `len` bytes.
    ///
    /// The bytes are zero the first time a region is used and hold whatever
    /// the previous request left there after a [`clear`](Self::clear).
    pub fn alloc_bytes(&self, len: usize) -> Result<&mut [u8], AllocError> {
        let layout = Layout::array::<u8>(len).map_err(|_e| AllocError::Unsupported { size: len, align: 1 })?;
        let ptr = self.alloc_layout(layout)?;

        // SAFETY: the region owns `len` initialized bytes at `ptr` that no other allocation overlaps,
        // and they stay allocated for as long as `self` is borrowed.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }

    /// Moves `value` into the arena.
    pub fn alloc<T: Copy>(&self, value: T) -> Result<&mut T, AllocError> {
        let ptr = self.alloc_layout(Layout::new::<T>())?.cast::<T>();

        // SAFETY: `ptr` is aligned for `T` (checked in `alloc_layout`) and points to
        // `size_of::<T>()` bytes reserved for this allocation only.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Allocates `len` copies of `value`.
    pub fn alloc_slice_fill<T: Copy>(&self, len: usize, value: T) -> Result<&mut [T], AllocError> {
        let layout = Layout::array::<T>(len)
            .map_err(|_e| AllocError::Unsupported { size: len.saturating_mul(mem::size_of::<T>()), align: mem::align_of::<T>() })?;
        let ptr = self.alloc_layout(layout)?.cast::<T>();

        // SAFETY: `ptr` is aligned for `T` and reserves room for `len` elements,
        // every one of which is written before the slice is formed.
        unsafe {
            for i in 0..len {
                ptr.as_ptr().add(i).write(value);
            }
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), len))
        }
    }

    /// Copies `src` into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], AllocError> {
        let layout = Layout::for_value(src);
        let ptr = self.alloc_layout(layout)?.cast::<T>();

        // SAFETY: `ptr` is aligned for `T`, reserves room for `src.len()` elements and
        // cannot overlap `src`, which is borrowed from elsewhere.
        unsafe {
            ptr.as_ptr().copy_from_nonoverlapping(src.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Copies `s` into the arena.
    pub fn alloc_str(&self, s: &str) -> Result<&str, AllocError> {
        self.alloc_concat(&[s])
    }

    /// Concatenates `parts` into a single arena string.
    pub fn alloc_concat(&self, parts: &[&str]) -> Result<&str, AllocError> {
        let len = parts.iter().map(|part| part.len()).sum();
        let bytes = self.alloc_bytes(len)?;

        let mut offset = 0;
        for part in parts {
            bytes[offset..offset + part.len()].copy_from_slice(part.as_bytes());
            offset += part.len();
        }

        // SAFETY: the bytes are a concatenation of valid UTF-8 strings.
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// Rewinds every region so its memory can be handed out again.
    ///
    /// Runs in time proportional to the number of regions, not to the bytes
    /// in use. No memory is returned to the system.
    pub fn clear(&mut self) {
        for region in self.regions.get_mut() {
            region.avail.set(0);
        }
    }

    /// Releases every region.
    pub fn free(self) {
        drop(self);
    }

    /// Bytes still available across all regions.
    pub fn remaining(&self) -> usize {
        self.regions.borrow().iter().map(Region::remaining).sum()
    }

    /// Total bytes owned by the arena.
    pub fn capacity(&self) -> usize {
        self.regions.borrow().iter().map(Region::limit).sum()
    }

    pub fn region_count(&self) -> usize {
        self.regions.borrow().len()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("regions", &self.region_count())
            .field("capacity", &self.capacity())
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Region index and byte offset of `ptr` within the arena.
    fn position(arena: &Arena, ptr: *const u8) -> (usize, usize) {
        let addr = ptr as usize;
        arena
            .regions
            .borrow()
            .iter()
            .enumerate()
            .find_map(|(index, region)| {
                let base = region.base.as_ptr() as usize;
                (addr >= base && addr < base + region.limit()).then(|| (index, addr - base))
            })
            .expect("pointer should belong to the arena")
    }

    #[test]
    fn starts_with_one_page() {
        let arena = Arena::new().unwrap();
        assert_eq!(arena.region_count(), 1);
        assert_eq!(arena.capacity(), PAGE_SIZE);
        assert_eq!(arena.remaining(), PAGE_SIZE);
    }

    #[test]
    fn allocations_are_aligned_and_disjoint() {
        let arena = Arena::new().unwrap();
        let a = arena.alloc_bytes(3).unwrap();
        a.copy_from_slice(b"abc");
        let b = arena.alloc(0x1122_3344_5566_7788_u64).unwrap();
        let c = arena.alloc_bytes(1).unwrap();

        assert_eq!(a.as_ptr() as usize % MAX_ALIGN, 0);
        assert_eq!(std::ptr::from_mut(b) as usize % MAX_ALIGN, 0);
        assert_eq!(c.as_ptr() as usize % MAX_ALIGN, 0);

        assert_eq!(a, b"abc");
        assert_eq!(*b, 0x1122_3344_5566_7788);
        assert_eq!(arena.remaining(), PAGE_SIZE - 3 * MAX_ALIGN);
    }

    #[test]
    fn overflow_appends_a_region() {
        let arena = Arena::new().unwrap();
        arena.alloc_bytes(PAGE_SIZE - MAX_ALIGN).unwrap();
        assert_eq!(arena.region_count(), 1);

        arena.alloc_bytes(2 * MAX_ALIGN).unwrap();
        assert_eq!(arena.region_count(), 2);

        // fits in the remaining tail of the first region again
        let small = arena.alloc_bytes(MAX_ALIGN).unwrap();
        assert_eq!(position(&arena, small.as_ptr()), (0, PAGE_SIZE - MAX_ALIGN));
        assert_eq!(arena.region_count(), 2);
    }

    #[test]
    fn large_allocation_gets_a_page_multiple_region() {
        let arena = Arena::new().unwrap();
        let big = arena.alloc_bytes(3 * PAGE_SIZE + 1).unwrap();
        assert_eq!(big.len(), 3 * PAGE_SIZE + 1);
        assert_eq!(arena.region_count(), 2);
        assert_eq!(arena.capacity(), PAGE_SIZE + 4 * PAGE_SIZE);
    }

    #[test]
    fn clear_restores_offsets() {
        let sizes = [10, 100, PAGE_SIZE, 7, 2 * PAGE_SIZE, 0, 33];
        let mut arena = Arena::new().unwrap();

        let first: Vec<_> = sizes.iter().map(|size| position(&arena, arena.alloc_bytes(*size).unwrap().as_ptr())).collect();
        let used = arena.remaining();
        let regions = arena.region_count();

        arena.clear();
        assert_eq!(arena.remaining(), arena.capacity());

        let second: Vec<_> = sizes.iter().map(|size| position(&arena, arena.alloc_bytes(*size).unwrap().as_ptr())).collect();
        assert_eq!(first, second);
        assert_eq!(arena.remaining(), used);
        assert_eq!(arena.region_count(), regions);
    }

    #[test]
    fn slices_and_strings() {
        let arena = Arena::new().unwrap();
        let filled = arena.alloc_slice_fill(4, "x").unwrap();
        filled[2] = "y";
        assert_eq!(filled, &["x", "x", "y", "x"]);

        let copied = arena.alloc_slice_copy(&[1_u32, 2, 3]).unwrap();
        assert_eq!(copied, &[1, 2, 3]);

        assert_eq!(arena.alloc_str("hello").unwrap(), "hello");
        assert_eq!(arena.alloc_concat(&["/dir", "/", "index.html"]).unwrap(), "/dir/index.html");
        assert_eq!(arena.alloc_concat(&[]).unwrap(), "");
    }

    #[test]
    fn rejects_over_aligned_types() {
        #[derive(Clone, Copy)]
        #[repr(align(64))]
        struct Wide([u8; 64]);

        let arena = Arena::new().unwrap();
        assert_eq!(arena.alloc(Wide([0; 64])).err(), Some(AllocError::Unsupported { size: 64, align: 64 }));
    }

    #[test]
    fn free_releases_everything() {
        let arena = Arena::new().unwrap();
        arena.alloc_bytes(5 * PAGE_SIZE).unwrap();
        arena.free();
    }
}
