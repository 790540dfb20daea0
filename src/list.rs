//! Intrusive doubly-linked registries of [`BlockHeader`]s.
//!
//! The heap keeps two lists over the same headers: every block ever carved
//! ([`AllBlocks`]) and the blocks currently free ([`FreeBlocks`]). A
//! [`Registry`] picks the link pair a list threads through, so one header can
//! sit in both lists without the chains clobbering each other.
//!
//! ```text
//!   head                                            tail
//!    │                                               │
//!    ▼                                               ▼
//!  ┌─────┐ next ┌─────┐ next ┌─────┐ next ┌─────┐
//!  │  A  │─────►│  B  │─────►│  C  │─────►│  D  │───► null
//!  │     │◄─────│     │◄─────│     │◄─────│     │
//!  └─────┘ prev └─────┘ prev └─────┘ prev └─────┘
//! ```

use std::{marker::PhantomData, ptr};

use log::warn;

use crate::block::{BlockHeader, Link};

/// Selects which link pair of a header a list uses.
pub trait Registry {
  const NAME: &'static str;

  /// # Safety
  ///
  /// `header` must point to a live header.
  unsafe fn links(header: *mut BlockHeader) -> *mut Link;
}

/// Every header ever carved, live or free, in carving order.
pub struct AllBlocks;

/// Headers currently marked free, most recently freed last.
pub struct FreeBlocks;

impl Registry for AllBlocks {
  const NAME: &'static str = "block list";

  unsafe fn links(header: *mut BlockHeader) -> *mut Link {
    unsafe { &raw mut (*header).block }
  }
}

impl Registry for FreeBlocks {
  const NAME: &'static str = "free list";

  unsafe fn links(header: *mut BlockHeader) -> *mut Link {
    unsafe { &raw mut (*header).free }
  }
}

pub struct BlockList<R: Registry> {
  head: *mut BlockHeader,
  tail: *mut BlockHeader,
  len: usize,
  registry: PhantomData<R>,
}

impl<R: Registry> BlockList<R> {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      len: 0,
      registry: PhantomData,
    }
  }

  pub fn head(&self) -> *mut BlockHeader {
    self.head
  }

  pub fn tail(&self) -> *mut BlockHeader {
    self.tail
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }

  /// # Safety
  ///
  /// Every header reachable from the list must be live.
  pub unsafe fn contains(
    &self,
    header: *mut BlockHeader,
  ) -> bool {
    unsafe { self.iter() }.any(|current| current == header)
  }

  /// Appends `header` at the tail in O(1).
  ///
  /// # Safety
  ///
  /// `header` must be live and not already linked into this list.
  pub unsafe fn push_back(
    &mut self,
    header: *mut BlockHeader,
  ) {
    unsafe {
      let links = R::links(header);
      (*links).next = ptr::null_mut();
      (*links).prev = self.tail;

      if self.tail.is_null() {
        self.head = header;
      } else {
        (*R::links(self.tail)).next = header;
      }

      self.tail = header;
      self.len += 1;
    }
  }

  /// Appends `header` unless it is already linked. Returns whether the list
  /// changed.
  ///
  /// # Safety
  ///
  /// `header` and every header in the list must be live.
  pub unsafe fn push_back_unique(
    &mut self,
    header: *mut BlockHeader,
  ) -> bool {
    unsafe {
      if self.contains(header) {
        return false;
      }

      self.push_back(header);
      true
    }
  }

  /// Unlinks `header`, or the head when `None`. The removed header's links
  /// are cleared. Removing from an empty list or naming a header that is not
  /// linked leaves the list untouched and returns `None`.
  ///
  /// # Safety
  ///
  /// `header` and every header in the list must be live.
  pub unsafe fn remove(
    &mut self,
    header: Option<*mut BlockHeader>,
  ) -> Option<*mut BlockHeader> {
    unsafe {
      let target = header.unwrap_or(self.head);

      if target.is_null() || !self.contains(target) {
        warn!("{}: remove of unlinked block {:?} ignored", R::NAME, target);
        return None;
      }

      let links = R::links(target);
      let Link { next, prev } = *links;

      if prev.is_null() {
        self.head = next;
      } else {
        (*R::links(prev)).next = next;
      }

      if next.is_null() {
        self.tail = prev;
      } else {
        (*R::links(next)).prev = prev;
      }

      *links = Link::unlinked();
      self.len -= 1;

      Some(target)
    }
  }

  /// Removes the oldest entry.
  ///
  /// # Safety
  ///
  /// Every header in the list must be live.
  pub unsafe fn pop_front(&mut self) -> Option<*mut BlockHeader> {
    if self.is_empty() {
      return None;
    }

    unsafe { self.remove(None) }
  }

  /// Head-to-tail traversal through this registry's links.
  ///
  /// # Safety
  ///
  /// Every header in the list must stay live and linked while iterating.
  pub unsafe fn iter(&self) -> Iter<'_, R> {
    Iter {
      current: self.head,
      forward: true,
      list: PhantomData,
    }
  }

  /// Tail-to-head traversal through this registry's links.
  ///
  /// # Safety
  ///
  /// Every header in the list must stay live and linked while iterating.
  pub unsafe fn iter_rev(&self) -> Iter<'_, R> {
    Iter {
      current: self.tail,
      forward: false,
      list: PhantomData,
    }
  }
}

impl<R: Registry> Default for BlockList<R> {
  fn default() -> Self {
    Self::new()
  }
}

pub struct Iter<'a, R: Registry> {
  current: *mut BlockHeader,
  forward: bool,
  list: PhantomData<&'a BlockList<R>>,
}

impl<R: Registry> Iterator for Iter<'_, R> {
  type Item = *mut BlockHeader;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    let header = self.current;
    let links = unsafe { *R::links(header) };
    self.current = if self.forward { links.next } else { links.prev };

    Some(header)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers(count: usize) -> Vec<Box<BlockHeader>> {
    (0..count).map(|_| Box::new(BlockHeader::new(64))).collect()
  }

  fn raw(header: &mut Box<BlockHeader>) -> *mut BlockHeader {
    &mut **header as *mut BlockHeader
  }

  fn filled<R: Registry>(
    nodes: &mut [Box<BlockHeader>],
  ) -> (BlockList<R>, Vec<*mut BlockHeader>) {
    let mut list = BlockList::<R>::new();
    let ptrs: Vec<_> = nodes.iter_mut().map(raw).collect();

    for &header in &ptrs {
      unsafe { list.push_back(header) };
    }

    (list, ptrs)
  }

  fn assert_chain<R: Registry>(
    list: &BlockList<R>,
    expected: &[*mut BlockHeader],
  ) {
    let forward: Vec<_> = unsafe { list.iter() }.collect();
    let mut backward: Vec<_> = unsafe { list.iter_rev() }.collect();
    backward.reverse();

    assert_eq!(forward, expected);
    assert_eq!(backward, expected);
    assert_eq!(list.len(), expected.len());
    assert_eq!(list.is_empty(), expected.is_empty());

    if expected.is_empty() {
      assert!(list.head().is_null());
      assert!(list.tail().is_null());
    } else {
      assert_eq!(list.head(), expected[0]);
      assert_eq!(list.tail(), expected[expected.len() - 1]);
    }
  }

  #[test]
  fn test_push_back_into_empty_list() {
    let mut nodes = headers(1);
    let (list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    assert_chain(&list, &ptrs);
    assert!(nodes[0].free.next.is_null());
    assert!(nodes[0].free.prev.is_null());
  }

  #[test]
  fn test_push_back_keeps_insertion_order() {
    let mut nodes = headers(4);
    let (list, ptrs) = filled::<AllBlocks>(&mut nodes);

    assert_chain(&list, &ptrs);
  }

  #[test]
  fn test_push_back_unique_skips_duplicates() {
    let mut nodes = headers(2);
    let (mut list, ptrs) = filled::<AllBlocks>(&mut nodes);

    unsafe {
      assert!(!list.push_back_unique(ptrs[0]));
      assert!(!list.push_back_unique(ptrs[1]));
    }

    assert_chain(&list, &ptrs);
  }

  #[test]
  fn test_remove_sole_element() {
    let mut nodes = headers(1);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    assert_eq!(unsafe { list.remove(Some(ptrs[0])) }, Some(ptrs[0]));
    assert_chain(&list, &[]);
  }

  #[test]
  fn test_remove_head() {
    let mut nodes = headers(3);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    unsafe { list.remove(Some(ptrs[0])) };

    assert_chain(&list, &ptrs[1..]);
    assert!(nodes[1].free.prev.is_null());
  }

  #[test]
  fn test_remove_tail() {
    let mut nodes = headers(3);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    unsafe { list.remove(Some(ptrs[2])) };

    assert_chain(&list, &ptrs[..2]);
    assert!(nodes[1].free.next.is_null());
  }

  #[test]
  fn test_remove_interior() {
    let mut nodes = headers(4);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    unsafe { list.remove(Some(ptrs[2])) };
    assert_chain(&list, &[ptrs[0], ptrs[1], ptrs[3]]);

    unsafe { list.remove(Some(ptrs[1])) };
    assert_chain(&list, &[ptrs[0], ptrs[3]]);

    assert!(nodes[1].free.next.is_null() && nodes[1].free.prev.is_null());
    assert!(nodes[2].free.next.is_null() && nodes[2].free.prev.is_null());
  }

  #[test]
  fn test_remove_without_target_pops_head() {
    let mut nodes = headers(3);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes);

    assert_eq!(unsafe { list.remove(None) }, Some(ptrs[0]));
    assert_eq!(unsafe { list.pop_front() }, Some(ptrs[1]));
    assert_chain(&list, &ptrs[2..]);
  }

  #[test]
  fn test_remove_on_empty_list_is_noop() {
    let mut list = BlockList::<FreeBlocks>::new();

    assert_eq!(unsafe { list.remove(None) }, None);
    assert_eq!(unsafe { list.pop_front() }, None);
    assert_chain(&list, &[]);
  }

  #[test]
  fn test_remove_unlinked_header_is_noop() {
    let mut nodes = headers(3);
    let (mut list, ptrs) = filled::<FreeBlocks>(&mut nodes[..2]);
    let stranger = raw(&mut nodes[2]);

    assert_eq!(unsafe { list.remove(Some(stranger)) }, None);
    assert_chain(&list, &ptrs);
  }

  #[test]
  fn test_registries_use_separate_links() {
    let mut nodes = headers(3);
    let (blocks, ptrs) = filled::<AllBlocks>(&mut nodes);
    let mut free = BlockList::<FreeBlocks>::new();

    unsafe {
      free.push_back(ptrs[2]);
      free.push_back(ptrs[0]);
    }

    assert_chain(&blocks, &ptrs);
    assert_chain(&free, &[ptrs[2], ptrs[0]]);

    unsafe { free.remove(Some(ptrs[2])) };

    assert_chain(&blocks, &ptrs);
    assert_chain(&free, &[ptrs[0]]);
  }
}
