use std::{
  alloc::{self, Layout},
  ptr::{self, NonNull},
};

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::{align::QUANTUM, align_to, error::HeapError};

/// Source of raw memory for the heap.
///
/// Each call hands back a fresh, previously unused region of exactly `bytes`
/// bytes (contents unspecified), or `None` when the environment refuses.
/// Regions are never given back.
pub trait ArenaGrower {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

/// Grows the process data segment with `sbrk(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl Sbrk {
  /// Current program break.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }
}

impl ArenaGrower for Sbrk {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(bytes).ok()?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(address as *mut u8)
  }
}

/// A bounded region reserved up front, handed out front to back.
///
/// Useful where moving the program break is not an option, and to get
/// deterministic addresses and exhaustion in tests.
pub struct FixedArena {
  base: NonNull<u8>,
  layout: Layout,
  used: usize,
}

impl FixedArena {
  pub fn new(capacity: usize) -> Result<Self, HeapError> {
    let layout = Layout::from_size_align(capacity.max(QUANTUM), QUANTUM)
      .map_err(|_| HeapError::OutOfMemory { requested: capacity })?;

    let base = NonNull::new(unsafe { alloc::alloc(layout) })
      .ok_or(HeapError::OutOfMemory { requested: capacity })?;

    Ok(Self {
      base,
      layout,
      used: 0,
    })
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  pub fn used(&self) -> usize {
    self.used
  }

  pub fn base(&self) -> *mut u8 {
    self.base.as_ptr()
  }
}

impl ArenaGrower for FixedArena {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let used = self.used.checked_add(bytes)?;

    if used > self.capacity() {
      return None;
    }

    let address = unsafe { self.base.add(self.used) };
    self.used = used;

    Some(address)
  }
}

impl Drop for FixedArena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}

// SAFETY: the region is exclusively owned by the arena.
unsafe impl Send for FixedArena {}

/// The heap's view of the memory it got from a grower: everything below
/// `cursor` has been carved into blocks, `cursor..end` is still uncarved.
pub struct Arena<G: ArenaGrower> {
  grower: G,
  page_size: usize,
  cursor: *mut u8,
  end: *mut u8,
  growths: usize,
  reserved: usize,
}

impl<G: ArenaGrower> Arena<G> {
  pub const fn new(
    grower: G,
    page_size: usize,
  ) -> Self {
    Self {
      grower,
      page_size,
      cursor: ptr::null_mut(),
      end: ptr::null_mut(),
      growths: 0,
      reserved: 0,
    }
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  pub fn page_size(&self) -> usize {
    self.page_size
  }

  /// Number of successful grower calls so far.
  pub fn growths(&self) -> usize {
    self.growths
  }

  /// Total bytes obtained from the grower.
  pub fn reserved(&self) -> usize {
    self.reserved
  }

  /// Uncarved bytes left in the current extension.
  pub fn remaining(&self) -> usize {
    self.end.addr().saturating_sub(self.cursor.addr())
  }

  /// Takes `size` bytes off the top of the arena, growing it first when the
  /// current extension is too short. `size` must be a multiple of
  /// [`QUANTUM`].
  pub fn carve(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if self.remaining() < size {
      self.extend(size)?;
    }

    let block = NonNull::new(self.cursor)?;
    self.cursor = self.cursor.wrapping_add(size);

    Some(block)
  }

  fn extend(
    &mut self,
    size: usize,
  ) -> Option<()> {
    let mut request = align_to!(size.checked_sub(self.remaining())?, self.page_size);

    loop {
      let base = self.grower.grow(request)?.as_ptr();

      self.growths += 1;
      self.reserved += request;

      if base != self.end {
        debug!(
          "arena: new extension at {:?}, dropping {} uncarved bytes",
          base,
          self.remaining()
        );
        self.cursor = base.wrapping_add(base.align_offset(QUANTUM));
      }

      self.end = base.wrapping_add(request);

      debug!(
        "arena: grew by {} bytes to {} total ({} growths)",
        request, self.reserved, self.growths
      );

      if self.remaining() >= size {
        return Some(());
      }

      request = align_to!(size.checked_add(QUANTUM)?, self.page_size);
    }
  }
}
