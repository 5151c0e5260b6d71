use crate::{
  chunk::Chunk,
  region::{Region, RegionProvider},
};

/// Singly linked list threaded through the chunk headers by region offset.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ChunkList {
  head: Option<usize>,
}

/// Result of a best-fit search: the chosen chunk and its list predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fit {
  pub prev: Option<usize>,
  pub offset: usize,
  pub chunk: Chunk,
}

impl ChunkList {
  pub fn new(head: Option<usize>) -> Self {
    Self { head }
  }

  pub fn iter<'r, P: RegionProvider>(
    &self,
    region: &'r Region<P>,
  ) -> Iter<'r, P> {
    Iter {
      region,
      current: self.head,
    }
  }

  /// Scans the whole list once for the smallest chunk holding at least
  /// `size` bytes. Only a strictly smaller candidate replaces the current
  /// best, so ties go to the chunk met first.
  pub fn best_fit<P: RegionProvider>(
    &self,
    region: &Region<P>,
    size: usize,
  ) -> Option<Fit> {
    let mut best: Option<Fit> = None;
    let mut prev = None;

    for (offset, chunk) in self.iter(region) {
      let better = match best {
        Some(fit) => chunk.size < fit.chunk.size,
        None => true,
      };

      if chunk.size >= size && better {
        best = Some(Fit { prev, offset, chunk });
      }

      prev = Some(offset);
    }

    best
  }

  /// Points `prev` (or the head, when `prev` is `None`) at `next`.
  pub fn link<P: RegionProvider>(
    &mut self,
    region: &mut Region<P>,
    prev: Option<usize>,
    next: Option<usize>,
  ) {
    match prev {
      Some(prev) => region.set_next(prev, next),
      None => self.head = next,
    }
  }

  pub fn push_front<P: RegionProvider>(
    &mut self,
    region: &mut Region<P>,
    offset: usize,
  ) {
    region.set_next(offset, self.head);
    self.head = Some(offset);
  }

  /// Inserts the chunk at `offset` keeping the list sorted by address and
  /// returns the chunk now preceding it.
  pub fn insert_sorted<P: RegionProvider>(
    &mut self,
    region: &mut Region<P>,
    offset: usize,
  ) -> Option<usize> {
    let mut prev = None;
    let mut current = self.head;

    while let Some(at) = current {
      if at >= offset {
        break;
      }
      prev = Some(at);
      current = region.read(at).next;
    }

    region.set_next(offset, current);
    self.link(region, prev, Some(offset));

    prev
  }

  /// Unlinks the chunk at `offset`; `false` if it is not on this list.
  pub fn remove<P: RegionProvider>(
    &mut self,
    region: &mut Region<P>,
    offset: usize,
  ) -> bool {
    let mut prev = None;
    let mut current = self.head;

    while let Some(at) = current {
      let next = region.read(at).next;
      if at == offset {
        self.link(region, prev, next);
        return true;
      }
      prev = Some(at);
      current = next;
    }

    false
  }

  pub fn contains<P: RegionProvider>(
    &self,
    region: &Region<P>,
    offset: usize,
  ) -> bool {
    self.iter(region).any(|(at, _)| at == offset)
  }
}

pub(crate) struct Iter<'r, P: RegionProvider> {
  region: &'r Region<P>,
  current: Option<usize>,
}

impl<P: RegionProvider> Iterator for Iter<'_, P> {
  type Item = (usize, Chunk);

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.current?;
    let chunk = self.region.read(offset);
    self.current = chunk.next;
    Some((offset, chunk))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    chunk::{ChunkState, HEADER_SIZE},
    region::Mmap,
  };

  const SLOT: usize = 128;

  /// Writes one free chunk per `(slot, size)` pair at fixed `SLOT` strides and
  /// returns a list linking them in the given order.
  fn build(
    region: &mut Region<Mmap>,
    layout: &[(usize, usize)],
  ) -> ChunkList {
    let mut list = ChunkList::default();
    for &(slot, size) in layout.iter().rev() {
      let offset = slot * SLOT;
      region.write(offset, Chunk::new(size, ChunkState::Free, None));
      list.push_front(region, offset);
    }
    list
  }

  fn offsets(
    list: &ChunkList,
    region: &Region<Mmap>,
  ) -> Vec<usize> {
    list.iter(region).map(|(offset, _)| offset).collect()
  }

  #[test]
  fn test_best_fit_picks_smallest_qualifying() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let list = build(&mut region, &[(0, 96), (1, 64), (2, 80)]);

    let fit = list.best_fit(&region, 72).unwrap();
    assert_eq!(fit.offset, 2 * SLOT);
    assert_eq!(fit.prev, Some(SLOT));
    assert_eq!(fit.chunk.size, 80);

    let fit = list.best_fit(&region, 8).unwrap();
    assert_eq!(fit.offset, SLOT);
    assert_eq!(fit.prev, Some(0));
  }

  #[test]
  fn test_best_fit_ties_go_to_first() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let list = build(&mut region, &[(0, 96), (1, 64), (2, 64)]);

    let fit = list.best_fit(&region, 64).unwrap();
    assert_eq!(fit.offset, SLOT);
  }

  #[test]
  fn test_best_fit_none_when_all_too_small() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let list = build(&mut region, &[(0, 32), (1, 32)]);

    assert_eq!(list.best_fit(&region, 40), None);
    assert_eq!(ChunkList::default().best_fit(&region, 8), None);
  }

  #[test]
  fn test_insert_sorted_reports_predecessor() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let mut list = build(&mut region, &[(1, 32), (3, 32)]);

    region.write(0, Chunk::new(32, ChunkState::Free, None));
    assert_eq!(list.insert_sorted(&mut region, 0), None);

    region.write(2 * SLOT, Chunk::new(32, ChunkState::Free, None));
    assert_eq!(list.insert_sorted(&mut region, 2 * SLOT), Some(SLOT));

    region.write(4 * SLOT, Chunk::new(32, ChunkState::Free, None));
    assert_eq!(list.insert_sorted(&mut region, 4 * SLOT), Some(3 * SLOT));

    assert_eq!(
      offsets(&list, &region),
      vec![0, SLOT, 2 * SLOT, 3 * SLOT, 4 * SLOT]
    );
  }

  #[test]
  fn test_remove_by_identity() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let mut list = build(&mut region, &[(2, 32), (0, 32), (1, 32)]);

    assert!(list.remove(&mut region, 0));
    assert_eq!(offsets(&list, &region), vec![2 * SLOT, SLOT]);

    assert!(!list.remove(&mut region, 0));
    assert!(!list.remove(&mut region, HEADER_SIZE));

    assert!(list.remove(&mut region, 2 * SLOT));
    assert!(list.remove(&mut region, SLOT));
    assert!(offsets(&list, &region).is_empty());
  }

  #[test]
  fn test_link_replaces_successor() {
    let mut region = Region::reserve(Mmap, 4096).unwrap();
    let mut list = build(&mut region, &[(0, 32), (1, 32), (2, 32)]);

    list.link(&mut region, Some(0), Some(2 * SLOT));
    assert_eq!(offsets(&list, &region), vec![0, 2 * SLOT]);
    assert!(!list.contains(&region, SLOT));

    list.link(&mut region, None, Some(2 * SLOT));
    assert_eq!(offsets(&list, &region), vec![2 * SLOT]);
  }
}
