use crate::{
  align::{PAGE_SIZE, QUANTUM},
  search::SearchMode,
};

/// Tunables of a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Granularity of every arena extension.
  pub page_size: usize,
  /// Free block selection policy.
  pub search: SearchMode,
}

impl HeapConfig {
  pub const fn new() -> Self {
    Self {
      page_size: PAGE_SIZE,
      search: SearchMode::FirstFit,
    }
  }

  pub const fn with_page_size(
    mut self,
    page_size: usize,
  ) -> Self {
    self.page_size = page_size;
    self
  }

  pub const fn with_search(
    mut self,
    search: SearchMode,
  ) -> Self {
    self.search = search;
    self
  }

  /// Page size raised to a power of two no smaller than [`QUANTUM`].
  pub const fn normalized(mut self) -> Self {
    self.page_size = if self.page_size <= QUANTUM {
      QUANTUM
    } else {
      match self.page_size.checked_next_power_of_two() {
        Some(page_size) => page_size,
        None => PAGE_SIZE,
      }
    };
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_config() {
    let config = HeapConfig::default();

    assert_eq!(config.page_size, 4096);
    assert_eq!(config.search, SearchMode::FirstFit);
  }

  #[test]
  fn test_normalized_page_size() {
    assert_eq!(HeapConfig::new().with_page_size(0).normalized().page_size, QUANTUM);
    assert_eq!(HeapConfig::new().with_page_size(8).normalized().page_size, QUANTUM);
    assert_eq!(HeapConfig::new().with_page_size(3000).normalized().page_size, 4096);
    assert_eq!(HeapConfig::new().with_page_size(8192).normalized().page_size, 8192);
    assert_eq!(
      HeapConfig::new().with_page_size(usize::MAX).normalized().page_size,
      PAGE_SIZE
    );
  }

  #[test]
  fn test_builder_keeps_other_fields() {
    let config = HeapConfig::new()
      .with_search(SearchMode::BestFit)
      .with_page_size(65536);

    assert_eq!(config.search, SearchMode::BestFit);
    assert_eq!(config.page_size, 65536);
  }
}
