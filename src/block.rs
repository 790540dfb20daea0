use std::{fmt, ptr};

use crate::align::HEADER_SIZE;

/// Capacity of the debugging label, terminator included.
pub const NAME_CAPACITY: usize = 8;

/// Written into every header the heap carves. A pointer whose header does not
/// carry it was never handed out by the heap.
pub const BLOCK_MAGIC: u32 = 0xA110_C8ED;

const FREE_BIT: u32 = 1;

/// Whether a block currently backs a live allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free,
  InUse,
}

/// True block size with the liveness flag packed into bit 0.
///
/// Every real size is a multiple of [`QUANTUM`](crate::align::QUANTUM), so the
/// low bit is always available. Read lengths through [`BlockSize::bytes`],
/// never through [`BlockSize::raw`].
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct BlockSize(u32);

impl BlockSize {
  pub const fn new(
    bytes: u32,
    state: BlockState,
  ) -> Self {
    Self(bytes & !FREE_BIT).with_state(state)
  }

  pub const fn from_raw(raw: u32) -> Self {
    Self(raw)
  }

  pub const fn raw(self) -> u32 {
    self.0
  }

  pub const fn bytes(self) -> usize {
    (self.0 & !FREE_BIT) as usize
  }

  pub const fn state(self) -> BlockState {
    if self.0 & FREE_BIT == FREE_BIT {
      BlockState::Free
    } else {
      BlockState::InUse
    }
  }

  pub const fn is_free(self) -> bool {
    matches!(self.state(), BlockState::Free)
  }

  pub const fn with_state(
    self,
    state: BlockState,
  ) -> Self {
    match state {
      BlockState::Free => Self(self.0 | FREE_BIT),
      BlockState::InUse => Self(self.0 & !FREE_BIT),
    }
  }
}

impl fmt::Debug for BlockSize {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("BlockSize")
      .field("bytes", &self.bytes())
      .field("state", &self.state())
      .finish()
  }
}

/// Forward/backward links of one registry.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Link {
  pub next: *mut BlockHeader,
  pub prev: *mut BlockHeader,
}

impl Link {
  pub const fn unlinked() -> Self {
    Self {
      next: ptr::null_mut(),
      prev: ptr::null_mut(),
    }
  }
}

/// Metadata stored in front of every payload.
///
/// A header belongs to the block list for its whole life and to the free list
/// while its liveness flag is set. Each registry has its own link pair.
#[derive(Debug)]
#[repr(C, align(16))]
pub struct BlockHeader {
  pub name: [u8; NAME_CAPACITY],
  pub size: BlockSize,
  pub magic: u32,
  pub block: Link,
  pub free: Link,
}

impl BlockHeader {
  pub fn new(size: usize) -> Self {
    Self {
      name: [0; NAME_CAPACITY],
      size: BlockSize::new(size as u32, BlockState::InUse),
      magic: BLOCK_MAGIC,
      block: Link::unlinked(),
      free: Link::unlinked(),
    }
  }

  /// Writes a fresh in-use header at `address`.
  ///
  /// # Safety
  ///
  /// `address` must be valid for writes of `size` bytes and aligned to
  /// [`QUANTUM`](crate::align::QUANTUM).
  pub unsafe fn init(
    address: *mut u8,
    size: usize,
  ) -> *mut BlockHeader {
    let header = address as *mut BlockHeader;
    unsafe { header.write(Self::new(size)) };
    header
  }

  /// Recovers the header of a payload pointer handed out by the heap.
  ///
  /// # Safety
  ///
  /// `payload` must point at least [`HEADER_SIZE`] bytes into readable memory.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut BlockHeader {
    unsafe { payload.sub(HEADER_SIZE) as *mut BlockHeader }
  }

  pub fn payload(header: *mut BlockHeader) -> *mut u8 {
    header.wrapping_add(1) as *mut u8
  }

  pub fn is_valid(&self) -> bool {
    self.magic == BLOCK_MAGIC
  }

  pub fn is_free(&self) -> bool {
    self.size.is_free()
  }

  pub fn set_state(
    &mut self,
    state: BlockState,
  ) {
    self.size = self.size.with_state(state);
  }

  /// Payload capacity, excluding the header.
  pub fn capacity(&self) -> usize {
    self.size.bytes() - HEADER_SIZE
  }

  /// Copies at most `NAME_CAPACITY - 1` bytes of `label`, always leaving the
  /// stored name NUL-terminated.
  pub fn set_name(
    &mut self,
    label: &str,
  ) {
    let len = label.len().min(NAME_CAPACITY - 1);
    self.name = [0; NAME_CAPACITY];
    self.name[..len].copy_from_slice(&label.as_bytes()[..len]);
  }

  /// The label up to its terminator. Truncation can split a multi-byte
  /// character; such a trailing fragment is dropped.
  pub fn name(&self) -> &str {
    let len = self
      .name
      .iter()
      .position(|&b| b == 0)
      .unwrap_or(NAME_CAPACITY);

    match std::str::from_utf8(&self.name[..len]) {
      Ok(name) => name,
      Err(e) => std::str::from_utf8(&self.name[..e.valid_up_to()]).unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::QUANTUM;

  #[test]
  fn test_header_layout() {
    assert_eq!(HEADER_SIZE % QUANTUM, 0);
    assert_eq!(std::mem::align_of::<BlockHeader>(), QUANTUM);

    #[cfg(target_pointer_width = "64")]
    assert_eq!(HEADER_SIZE, 48);
  }

  #[test]
  fn test_size_mask_round_trip() {
    for bytes in (0..4096u32).step_by(QUANTUM) {
      for state in [BlockState::Free, BlockState::InUse] {
        let size = BlockSize::new(bytes, state);
        let raw = size.raw();

        assert_eq!(
          (raw & !FREE_BIT) | (raw & FREE_BIT),
          raw,
        );
        assert_eq!(size.bytes(), bytes as usize);
        assert_eq!(size.state(), state);
        assert_eq!(BlockSize::from_raw(raw), size);
      }
    }
  }

  #[test]
  fn test_flipping_twice_restores_bits() {
    let size = BlockSize::new(176, BlockState::InUse);

    let flipped = size.with_state(BlockState::Free);
    assert_eq!(flipped.raw(), 177);
    assert_eq!(flipped.bytes(), 176);
    assert!(flipped.is_free());

    let restored = flipped.with_state(BlockState::InUse);
    assert_eq!(restored.raw(), size.raw());
  }

  #[test]
  fn test_new_header_is_in_use_and_unlinked() {
    let header = BlockHeader::new(192);

    assert!(header.is_valid());
    assert!(!header.is_free());
    assert_eq!(header.size.bytes(), 192);
    assert_eq!(header.capacity(), 192 - HEADER_SIZE);
    assert_eq!(header.name(), "");
    assert!(header.block.next.is_null() && header.block.prev.is_null());
    assert!(header.free.next.is_null() && header.free.prev.is_null());
  }

  #[test]
  fn test_set_state_keeps_size() {
    let mut header = BlockHeader::new(64);

    header.set_state(BlockState::Free);
    assert!(header.is_free());
    assert_eq!(header.size.bytes(), 64);

    header.set_state(BlockState::InUse);
    assert!(!header.is_free());
    assert_eq!(header.size.raw(), 64);
  }

  #[test]
  fn test_name_is_truncated_and_terminated() {
    let mut header = BlockHeader::new(64);

    header.set_name("buffer");
    assert_eq!(header.name(), "buffer");

    header.set_name("a-very-long-label");
    assert_eq!(header.name(), "a-very-");
    assert_eq!(header.name[NAME_CAPACITY - 1], 0);

    header.set_name("");
    assert_eq!(header.name(), "");
    assert_eq!(header.name, [0; NAME_CAPACITY]);
  }

  #[test]
  fn test_name_drops_split_character() {
    let mut header = BlockHeader::new(64);

    // 'é' is two bytes; the second label only has room for one of them.
    header.set_name("abcdeé");
    assert_eq!(header.name(), "abcdeé");

    header.set_name("abcdefé");
    assert_eq!(header.name(), "abcdef");
  }
}
