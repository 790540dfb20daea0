#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeapError {
  #[error("out of memory: the arena could not grow to fit {requested} bytes")]
  OutOfMemory { requested: usize },
  #[error("requested size overflows the block size field")]
  Overflow,
  #[error("pointer was not handed out by this heap")]
  InvalidPointer,
  #[error("block was already released")]
  DoubleFree,
}
