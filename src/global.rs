//! A [`Heap`] behind a spin lock, usable as the process allocator.
//!
//! ```rust,ignore
//! use rallocator::LockedHeap;
//!
//! #[global_allocator]
//! static ALLOCATOR: LockedHeap = LockedHeap::sbrk();
//! ```
//!
//! Only payload alignments up to [`QUANTUM`] can be served; larger alignment
//! requests fail with a null pointer. No logger that allocates may be
//! installed while this is the global allocator.

use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use spin::{Mutex, MutexGuard};

use crate::{
  align::QUANTUM,
  arena::{ArenaGrower, Sbrk},
  heap::Heap,
};

pub struct LockedHeap<G: ArenaGrower = Sbrk>(Mutex<Heap<G>>);

impl LockedHeap<Sbrk> {
  pub const fn sbrk() -> Self {
    Self::new(Heap::sbrk())
  }
}

impl<G: ArenaGrower> LockedHeap<G> {
  pub const fn new(heap: Heap<G>) -> Self {
    Self(Mutex::new(heap))
  }

  pub fn lock(&self) -> MutexGuard<'_, Heap<G>> {
    self.0.lock()
  }
}

unsafe impl<G: ArenaGrower + Send> GlobalAlloc for LockedHeap<G> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > QUANTUM {
      return ptr::null_mut();
    }

    self
      .lock()
      .allocate(layout.size())
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    let _ = unsafe { self.lock().release(address) };
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > QUANTUM {
      return ptr::null_mut();
    }

    self
      .lock()
      .zero_allocate(1, layout.size())
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn realloc(
    &self,
    address: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > QUANTUM {
      return ptr::null_mut();
    }

    unsafe { self.lock().reallocate(address, new_size) }.map_or(ptr::null_mut(), NonNull::as_ptr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{align::PAGE_SIZE, arena::FixedArena};

  fn locked() -> LockedHeap<FixedArena> {
    LockedHeap::new(Heap::new(FixedArena::new(4 * PAGE_SIZE).unwrap()))
  }

  #[test]
  fn test_global_alloc_round_trip() {
    let allocator = locked();
    let layout = Layout::new::<[u64; 4]>();

    unsafe {
      let address = allocator.alloc(layout);
      assert!(!address.is_null());
      assert_eq!(address.addr() % layout.align(), 0);

      (address as *mut [u64; 4]).write([1, 2, 3, 4]);
      assert_eq!(*(address as *mut [u64; 4]), [1, 2, 3, 4]);

      allocator.dealloc(address, layout);
      assert_eq!(allocator.lock().free_blocks().count(), 1);

      assert_eq!(allocator.alloc(layout), address);
    }
  }

  #[test]
  fn test_global_alloc_zeroed() {
    let allocator = locked();
    let layout = Layout::array::<u8>(48).unwrap();

    unsafe {
      let address = allocator.alloc(layout);
      ptr::write_bytes(address, 0xFF, 48);
      allocator.dealloc(address, layout);

      let zeroed = allocator.alloc_zeroed(layout);
      assert_eq!(zeroed, address);
      assert!(std::slice::from_raw_parts(zeroed, 48).iter().all(|&b| b == 0));
    }
  }

  #[test]
  fn test_global_realloc_grows() {
    let allocator = locked();
    let layout = Layout::array::<u8>(8).unwrap();

    unsafe {
      let address = allocator.alloc(layout);
      address.copy_from_nonoverlapping(b"rallocat".as_ptr(), 8);

      let grown = allocator.realloc(address, layout, 512);
      assert!(!grown.is_null());
      assert_eq!(std::slice::from_raw_parts(grown, 8), b"rallocat");
    }
  }

  #[test]
  fn test_over_aligned_layout_is_refused() {
    let allocator = locked();
    let layout = Layout::from_size_align(64, 64).unwrap();

    unsafe {
      assert!(allocator.alloc(layout).is_null());
      assert!(allocator.alloc_zeroed(layout).is_null());
    }

    assert_eq!(allocator.lock().growths(), 0);
  }

  #[test]
  fn test_locked_heap_is_sync() {
    fn assert_sync<T: Sync>() {}

    assert_sync::<LockedHeap>();
    assert_sync::<LockedHeap<FixedArena>>();
  }
}
