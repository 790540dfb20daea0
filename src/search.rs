use crate::{
  block::BlockHeader,
  list::{BlockList, FreeBlocks},
};

/// Policy used to pick a free block for reuse.
///
/// All three walk the free list from its head (oldest release first) and
/// break ties in favour of the block met first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
  /// First block that is large enough.
  #[default]
  FirstFit,
  /// Smallest block that is large enough.
  BestFit,
  /// Largest block that is large enough.
  WorstFit,
}

impl SearchMode {
  /// Finds a free block whose true size is at least `size` bytes.
  ///
  /// # Safety
  ///
  /// Every header in `free` must be live.
  pub unsafe fn find(
    self,
    free: &BlockList<FreeBlocks>,
    size: usize,
  ) -> Option<*mut BlockHeader> {
    let mut candidates = unsafe { free.iter() }
      .map(|header| (header, unsafe { (*header).size.bytes() }))
      .filter(|&(_, bytes)| bytes >= size);

    let found = match self {
      Self::FirstFit => candidates.next(),
      Self::BestFit => candidates.fold(None, |best, candidate| match best {
        Some((_, bytes)) if bytes <= candidate.1 => best,
        _ => Some(candidate),
      }),
      Self::WorstFit => candidates.fold(None, |worst, candidate| match worst {
        Some((_, bytes)) if bytes >= candidate.1 => worst,
        _ => Some(candidate),
      }),
    };

    found.map(|(header, _)| header)
  }
}
