use std::ptr::{self, NonNull};

use log::{trace, warn};

use crate::{
  align::{QUANTUM, block_size_for},
  arena::{Arena, ArenaGrower, Sbrk},
  block::{BlockHeader, BlockState},
  config::HeapConfig,
  dump::{BlockInfo, HeapDump},
  error::HeapError,
  list::{AllBlocks, BlockList, FreeBlocks},
  search::SearchMode,
};

/// A free-list heap carving blocks out of an arena that only ever grows.
///
/// Released blocks go to the tail of the free list and are handed out again
/// by the configured [`SearchMode`]; blocks are never split, merged or given
/// back to the grower.
pub struct Heap<G: ArenaGrower> {
  arena: Arena<G>,
  blocks: BlockList<AllBlocks>,
  free: BlockList<FreeBlocks>,
  search: SearchMode,
}

// SAFETY: every header reachable from the lists lives in memory owned by the
// arena, and the heap is its only mutator.
unsafe impl<G: ArenaGrower + Send> Send for Heap<G> {}

impl Heap<Sbrk> {
  /// A heap on top of the process data segment.
  pub const fn sbrk() -> Self {
    Self::with_config(Sbrk, HeapConfig::new())
  }
}

impl<G: ArenaGrower> Heap<G> {
  pub const fn new(grower: G) -> Self {
    Self::with_config(grower, HeapConfig::new())
  }

  pub const fn with_config(
    grower: G,
    config: HeapConfig,
  ) -> Self {
    let config = config.normalized();

    Self {
      arena: Arena::new(grower, config.page_size),
      blocks: BlockList::new(),
      free: BlockList::new(),
      search: config.search,
    }
  }

  pub fn search_mode(&self) -> SearchMode {
    self.search
  }

  pub fn set_search_mode(
    &mut self,
    search: SearchMode,
  ) {
    self.search = search;
  }

  pub fn grower(&self) -> &G {
    self.arena.grower()
  }

  /// Number of times the arena has been extended.
  pub fn growths(&self) -> usize {
    self.arena.growths()
  }

  /// Bytes obtained from the grower so far.
  pub fn arena_bytes(&self) -> usize {
    self.arena.reserved()
  }

  /// Returns a pointer to at least `size` bytes, aligned to [`QUANTUM`].
  ///
  /// A zero-byte request gets a minimum-size block.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let block_size = block_size_for(size).ok_or(HeapError::Overflow)?;

    if let Some(header) = unsafe { self.search.find(&self.free, block_size) } {
      unsafe {
        self.free.remove(Some(header));
        (*header).set_state(BlockState::InUse);
        self.blocks.push_back_unique(header);
      }

      trace!("heap: reused block {:?} for {} bytes", header, size);

      return Ok(payload(header));
    }

    let Some(address) = self.arena.carve(block_size) else {
      warn!("heap: out of memory allocating {} bytes", size);
      return Err(HeapError::OutOfMemory {
        requested: block_size,
      });
    };

    let header = unsafe { BlockHeader::init(address.as_ptr(), block_size) };
    unsafe { self.blocks.push_back(header) };

    Ok(payload(header))
  }

  /// Allocates room for `count` elements of `size` bytes with every payload
  /// byte cleared.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let bytes = count.checked_mul(size).ok_or(HeapError::Overflow)?;
    let address = self.allocate(bytes)?;

    unsafe {
      let header = BlockHeader::from_payload(address.as_ptr());
      ptr::write_bytes(address.as_ptr(), 0, (*header).capacity());
    }

    Ok(address)
  }

  /// Resizes the allocation at `address`. The block is kept when it already
  /// holds `size` bytes; otherwise the contents move to a new block and the
  /// old one is released. A null `address` behaves like [`Heap::allocate`].
  ///
  /// # Safety
  ///
  /// `address` must be null or a live pointer returned by this heap.
  pub unsafe fn reallocate(
    &mut self,
    address: *mut u8,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if address.is_null() {
      return self.allocate(size);
    }

    let header = unsafe { self.header_of(address)? };

    if unsafe { (*header).is_free() } {
      warn!("heap: reallocate of released block {:?}", address);
      return Err(HeapError::InvalidPointer);
    }

    let block_size = block_size_for(size).ok_or(HeapError::Overflow)?;
    let current = unsafe { (*header).size.bytes() };

    if block_size <= current {
      return Ok(payload(header));
    }

    let moved = self.allocate(size)?;

    unsafe {
      ptr::copy_nonoverlapping(address, moved.as_ptr(), (*header).capacity());
      self.release(address)?;
    }

    Ok(moved)
  }

  /// Hands a block back to the free list. Null is ignored.
  ///
  /// Releasing a block twice leaves the heap untouched and reports
  /// [`HeapError::DoubleFree`].
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer returned by this heap.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) -> Result<(), HeapError> {
    if address.is_null() {
      return Ok(());
    }

    let header = unsafe { self.header_of(address)? };

    unsafe {
      if (*header).is_free() {
        warn!("heap: double free of {:?}", address);
        return Err(HeapError::DoubleFree);
      }

      (*header).set_state(BlockState::Free);
      self.free.push_back(header);
    }

    Ok(())
  }

  /// Labels the block at `address` for [`Heap::debug_dump`]. Labels longer
  /// than the header's name field are truncated. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer returned by this heap.
  pub unsafe fn set_name(
    &mut self,
    address: *mut u8,
    label: &str,
  ) -> Result<(), HeapError> {
    if address.is_null() {
      return Ok(());
    }

    let header = unsafe { self.header_of(address)? };
    unsafe { (*header).set_name(label) };

    Ok(())
  }

  /// Payload bytes available at `address`, which may exceed the size that
  /// was asked for.
  ///
  /// # Safety
  ///
  /// `address` must be a pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> Result<usize, HeapError> {
    let header = unsafe { self.header_of(address)? };

    Ok(unsafe { (*header).capacity() })
  }

  /// Every block in carving order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    unsafe { self.blocks.iter() }.map(|header| unsafe { block_info(header) })
  }

  /// Free blocks in free-list order.
  pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    unsafe { self.free.iter() }.map(|header| unsafe { block_info(header) })
  }

  pub fn debug_dump(&self) -> HeapDump {
    HeapDump {
      growths: self.arena.growths(),
      reserved: self.arena.reserved(),
      blocks: self.blocks().collect(),
      free: unsafe { self.free.iter() }.map(|header| header.addr()).collect(),
    }
  }

  /// Writes [`Heap::debug_dump`] to stdout.
  pub fn print_state(&self) {
    print!("{}", self.debug_dump());
  }

  /// Recovers and validates the header in front of `address`.
  unsafe fn header_of(
    &self,
    address: *mut u8,
  ) -> Result<*mut BlockHeader, HeapError> {
    if address.is_null() || address.addr() % QUANTUM != 0 {
      warn!("heap: invalid pointer {:?}", address);
      return Err(HeapError::InvalidPointer);
    }

    let header = unsafe { BlockHeader::from_payload(address) };

    if !unsafe { (*header).is_valid() } {
      warn!("heap: invalid pointer {:?}", address);
      return Err(HeapError::InvalidPointer);
    }

    Ok(header)
  }
}

fn payload(header: *mut BlockHeader) -> NonNull<u8> {
  // Headers are carved from non-null arena memory.
  unsafe { NonNull::new_unchecked(BlockHeader::payload(header)) }
}

unsafe fn block_info(header: *mut BlockHeader) -> BlockInfo {
  let header_ref = unsafe { &*header };
  let size = header_ref.size.bytes();

  BlockInfo {
    start: header.addr(),
    end: header.addr() + size,
    size,
    state: header_ref.size.state(),
    name: header_ref.name().to_owned(),
  }
}
