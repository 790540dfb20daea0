use std::fmt;

use crate::{align::HEADER_SIZE, block::BlockState};

/// One block as seen by the introspection API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the header.
  pub start: usize,
  /// One past the last byte of the block.
  pub end: usize,
  /// True size, header included.
  pub size: usize,
  pub state: BlockState,
  pub name: String,
}

impl BlockInfo {
  /// Address handed out to the caller for this block.
  pub fn payload(&self) -> usize {
    self.start + HEADER_SIZE
  }

  pub fn is_free(&self) -> bool {
    self.state == BlockState::Free
  }
}

/// Snapshot of the whole heap: arena usage, every block in carving order, and
/// the free list in its own order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDump {
  pub growths: usize,
  pub reserved: usize,
  pub blocks: Vec<BlockInfo>,
  pub free: Vec<usize>,
}

impl fmt::Display for HeapDump {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "-- Arena --")?;
    writeln!(f, "growths: {}\treserved: {} bytes", self.growths, self.reserved)?;

    writeln!(f, "-- Current Memory State --")?;
    for block in &self.blocks {
      writeln!(
        f,
        "[BLOCK {:#x}-{:#x}]\t{}\t[{}]\t'{}'",
        block.start,
        block.end,
        block.size,
        if block.is_free() { "FREE" } else { "USED" },
        block.name,
      )?;
    }

    writeln!(f, "\n-- Free List --")?;
    for address in &self.free {
      write!(f, "[{:#x}] -> ", address)?;
    }
    writeln!(f, "NULL")
  }
}
