use std::mem;

use crate::block::BlockHeader;

/// Rounding granularity of every block. Sizes are always multiples of this
/// value, which leaves bit 0 of the size field free for the liveness flag.
pub const QUANTUM: usize = 16;

/// Bytes taken by the metadata in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

/// Smallest block the heap ever carves: a header plus one quantum of payload.
pub const MIN_BLOCK_SIZE: usize = HEADER_SIZE + QUANTUM;

/// Default arena extension granularity.
pub const PAGE_SIZE: usize = 4096;

const _: () = assert!(HEADER_SIZE % QUANTUM == 0);

/// Rounds `value` up to the next multiple of `align`, which must be a power
/// of two.
///
/// # Examples
///
/// ```rust
/// use rallocator::align_to;
///
/// assert_eq!(align_to!(13, 16), 16);
/// assert_eq!(align_to!(32, 16), 32);
/// assert_eq!(align_to!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}

/// Total block size (header included) needed to hold `payload` bytes.
///
/// Returns `None` when the rounded size overflows or does not fit the
/// 32-bit size field of a [`BlockHeader`].
pub fn block_size_for(payload: usize) -> Option<usize> {
  let total = payload.checked_add(HEADER_SIZE + QUANTUM - 1)? & !(QUANTUM - 1);
  let total = total.max(MIN_BLOCK_SIZE);

  u32::try_from(total).ok().map(|_| total)
}
