//! # rallocator - A Free-List Heap Allocator Library
//!
//! This crate provides a **free-list heap** for user space: blocks are carved
//! out of an arena that grows through `sbrk(2)` one page-sized extension at a
//! time, and released blocks are kept on a free list for reuse.
//!
//! ## Overview
//!
//! ```text
//!   Arena after a few allocations and two releases:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         ONE ARENA PAGE                               │
//!   │                                                                      │
//!   │   ┌─────┬─────┬─────┬─────┬─────┬──────────────────────┬─────────┐   │
//!   │   │  A  │ B*  │  C  │ D*  │  E  │          F           │ uncarved│   │
//!   │   └─────┴─────┴─────┴─────┴─────┴──────────────────────┴─────────┘   │
//!   │                                                        ▲         ▲   │
//!   │   block list: A → B → C → D → E → F                    │         │   │
//!   │   free list:  B → D              (* = free)         cursor      end  │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   A request first searches the free list; only a miss carves new space.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - Quantum rounding (align_to!, block_size_for)
//!   ├── block      - Block header, packed size/liveness field
//!   ├── list       - Intrusive doubly-linked block and free lists
//!   ├── arena      - ArenaGrower trait, Sbrk, FixedArena, page carving
//!   ├── search     - Fit policies (first, best, worst)
//!   ├── heap       - Heap: allocate, zero_allocate, reallocate, release
//!   ├── dump       - Introspection snapshot and its text form
//!   ├── config     - HeapConfig
//!   ├── error      - HeapError
//!   └── global     - LockedHeap, a GlobalAlloc adapter
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rallocator::Heap;
//!
//! let mut heap = Heap::sbrk();
//!
//! let address = heap.allocate(64).unwrap();
//!
//! unsafe {
//!     // Use the memory
//!     address.as_ptr().write_bytes(0x2A, 64);
//!     heap.set_name(address.as_ptr(), "answer").unwrap();
//!
//!     // Give it back; the next fitting request reuses it
//!     heap.release(address.as_ptr()).unwrap();
//! }
//!
//! heap.print_state();
//! ```
//!
//! ## How It Works
//!
//! Each block starts with a header; the caller gets the address right after it:
//!
//! ```text
//!   Single Block:
//!   ┌─────────────────────────────┬────────────────────────────────┐
//!   │        Block Header         │           Payload              │
//!   │  ┌───────────────────────┐  │                                │
//!   │  │ name:  "A\0"          │  │  ┌──────────────────────────┐  │
//!   │  │ size:  192 | free bit │  │  │                          │  │
//!   │  │ magic: 0xA110C8ED     │  │  │  size - 48 bytes usable  │  │
//!   │  │ block: next / prev    │  │  │                          │  │
//!   │  │ free:  next / prev    │  │  └──────────────────────────┘  │
//!   │  └───────────────────────┘  │                                │
//!   │          48 bytes           │                                │
//!   └─────────────────────────────┴────────────────────────────────┘
//!                                 ▲
//!                                 └── Pointer returned to user
//! ```
//!
//! Block sizes are multiples of 16 bytes, so bit 0 of the size field holds
//! the liveness flag (1 = free).
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`Heap`] has no internal locking; wrap it in
//!   [`LockedHeap`] to share it
//! - **No splitting or coalescing**: a reused block keeps its full size and
//!   adjacent free blocks stay separate
//! - **Monotonic arena**: memory is never returned to the operating system
//! - **Alignment**: payloads are 16-byte aligned, nothing stricter
//!
//! ## Safety
//!
//! Pointers passed back to the heap must come from the same heap. Headers are
//! checked for a magic value, which catches most but not all foreign pointers.

pub mod align;
pub mod arena;
pub mod block;
pub mod config;
pub mod dump;
pub mod error;
pub mod global;
pub mod heap;
pub mod list;
pub mod search;

pub use arena::{ArenaGrower, FixedArena, Sbrk};
pub use config::HeapConfig;
pub use dump::{BlockInfo, HeapDump};
pub use error::HeapError;
pub use global::LockedHeap;
pub use heap::Heap;
pub use search::SearchMode;
