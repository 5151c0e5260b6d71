use core::{fmt, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  align::checked_align,
  chunk::{Chunk, ChunkSpan, ChunkState, HEADER_SIZE},
  error::HeapError,
  list::ChunkList,
  region::{Mmap, Region, RegionProvider},
};

/// Byte counters of a heap. `free + used + overhead == total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
  /// Payload bytes on the free list.
  pub free: usize,
  /// Payload bytes handed out to callers.
  pub used: usize,
  /// Bytes taken by chunk headers.
  pub overhead: usize,
  /// Size of the whole region.
  pub total: usize,
}

impl fmt::Display for Stats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "free memory:        {}", self.free)?;
    writeln!(f, "used memory:        {}", self.used)?;
    writeln!(f, "overhead memory:    {}", self.overhead)?;
    write!(f, "total:              {}", self.total)
  }
}

/// Best-fit allocator over one fixed region.
///
/// Free chunks are kept in ascending address order and coalesced with their
/// memory neighbours on release; used chunks are kept most recent first.
pub struct Heap<P: RegionProvider = Mmap> {
  region: Region<P>,
  free_list: ChunkList,
  used_list: ChunkList,
  free: usize,
  used: usize,
  overhead: usize,
}

impl Heap<Mmap> {
  /// Reserves a region of `size` bytes (rounded up to the machine word) with
  /// `mmap(2)` and seeds the free list with one chunk spanning it.
  pub fn init(size: usize) -> Result<Self, HeapError> {
    Self::with_provider(Mmap, size)
  }
}

impl<P: RegionProvider> Heap<P> {
  pub fn with_provider(
    provider: P,
    size: usize,
  ) -> Result<Self, HeapError> {
    if size == 0 {
      return Err(HeapError::InvalidArgument("heap size must be non-zero"));
    }

    let size = checked_align(size).ok_or(HeapError::OutOfMemory {
      requested: size,
      free: 0,
    })?;

    if size < HEADER_SIZE {
      return Err(HeapError::InvalidArgument(
        "heap size must fit at least one chunk header",
      ));
    }

    let mut region = Region::reserve(provider, size)?;

    let chunk = Chunk::new(size - HEADER_SIZE, ChunkState::Free, None);
    region.write(0, chunk);

    debug!("heap initialised: {} bytes, {} free", size, chunk.size);

    Ok(Self {
      region,
      free_list: ChunkList::new(Some(0)),
      used_list: ChunkList::default(),
      free: chunk.size,
      used: 0,
      overhead: HEADER_SIZE,
    })
  }

  /// Hands out at least `size` bytes, rounded up to the machine word.
  ///
  /// The smallest free chunk that fits is used. It is split when the
  /// remainder can hold a header of its own, otherwise handed out whole.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if size == 0 {
      return Err(HeapError::InvalidArgument("allocation size must be non-zero"));
    }

    let size = checked_align(size).ok_or(HeapError::OutOfMemory {
      requested: size,
      free: self.free,
    })?;

    if self.free < size {
      debug!("allocate({}): only {} bytes free", size, self.free);
      return Err(HeapError::OutOfMemory {
        requested: size,
        free: self.free,
      });
    }

    let Some(fit) = self.free_list.best_fit(&self.region, size) else {
      let largest = self.largest_free();
      debug!("allocate({}): fragmented, largest free chunk {}", size, largest);
      return Err(HeapError::Fragmented {
        requested: size,
        largest,
      });
    };

    if fit.chunk.size >= size + HEADER_SIZE {
      let rest_offset = fit.offset + HEADER_SIZE + size;
      let rest = Chunk::new(
        fit.chunk.size - size - HEADER_SIZE,
        ChunkState::Free,
        fit.chunk.next,
      );

      trace!(
        "split chunk {} ({} bytes) into {} + {} at {}",
        fit.offset, fit.chunk.size, size, rest.size, rest_offset
      );

      self.region.write(rest_offset, rest);
      self.free_list.link(&mut self.region, fit.prev, Some(rest_offset));
      self.region.write(fit.offset, Chunk::new(size, ChunkState::Live, None));

      self.free -= size + HEADER_SIZE;
      self.used += size;
      self.overhead += HEADER_SIZE;
    } else {
      trace!("chunk {} ({} bytes) handed out whole", fit.offset, fit.chunk.size);

      self.free_list.link(&mut self.region, fit.prev, fit.chunk.next);
      self
        .region
        .write(fit.offset, Chunk::new(fit.chunk.size, ChunkState::Live, None));

      self.free -= fit.chunk.size;
      self.used += fit.chunk.size;
    }

    self.used_list.push_front(&mut self.region, fit.offset);

    let payload = self.region.payload(fit.offset);
    debug!("allocate({}) -> {:?}", size, payload);

    Ok(payload)
  }

  /// Returns an allocation to the free list, merging it with free chunks
  /// directly after and then before it in memory.
  pub fn release(
    &mut self,
    ptr: NonNull<u8>,
  ) -> Result<(), HeapError> {
    let Some(offset) = self.region.chunk_offset(ptr) else {
      warn!("release({:?}): pointer outside heap region", ptr);
      return Err(HeapError::InvalidPointer);
    };

    if !self.used_list.remove(&mut self.region, offset) {
      let err = self.classify_stray(offset);
      warn!("release({:?}): {}", ptr, err);
      return Err(err);
    }

    let chunk = self.region.read(offset);
    debug_assert!(chunk.is_live(), "used chunk {offset} not marked live");
    self.region.write(
      offset,
      Chunk {
        state: ChunkState::Released,
        ..chunk
      },
    );

    let prev = self.free_list.insert_sorted(&mut self.region, offset);

    self.used -= chunk.size;
    self.free += chunk.size;

    let mut chunk = self.region.read(offset);

    if let Some(next) = chunk.next {
      if next == chunk.end(offset) {
        let neighbor = self.region.read(next);
        trace!("merge chunk {} with next {}", offset, next);

        chunk.size += neighbor.size + HEADER_SIZE;
        chunk.next = neighbor.next;
        self.region.write(offset, chunk);

        self.free += HEADER_SIZE;
        self.overhead -= HEADER_SIZE;
      }
    }

    if let Some(prev) = prev {
      let mut before = self.region.read(prev);
      if before.end(prev) == offset {
        trace!("merge chunk {} into previous {}", offset, prev);

        before.size += chunk.size + HEADER_SIZE;
        before.next = chunk.next;
        self.region.write(prev, before);

        self.free += HEADER_SIZE;
        self.overhead -= HEADER_SIZE;
      }
    }

    debug!("release({:?}): {} bytes free", ptr, self.free);

    Ok(())
  }

  /// Payload size of a live allocation, which may exceed the requested size.
  pub fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> Result<usize, HeapError> {
    let offset = self
      .region
      .chunk_offset(ptr)
      .ok_or(HeapError::InvalidPointer)?;

    if !self.used_list.contains(&self.region, offset) {
      return Err(HeapError::InvalidPointer);
    }

    Ok(self.region.read(offset).size)
  }

  pub fn stats(&self) -> Stats {
    Stats {
      free: self.free,
      used: self.used,
      overhead: self.overhead,
      total: self.region.len(),
    }
  }

  pub fn region_size(&self) -> usize {
    self.region.len()
  }

  /// Free chunks in ascending address order.
  pub fn free_chunks(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
    self
      .free_list
      .iter(&self.region)
      .map(|(offset, chunk)| ChunkSpan { offset, size: chunk.size })
  }

  /// Used chunks, most recently allocated first.
  pub fn used_chunks(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
    self
      .used_list
      .iter(&self.region)
      .map(|(offset, chunk)| ChunkSpan { offset, size: chunk.size })
  }

  fn largest_free(&self) -> usize {
    self.free_chunks().map(|span| span.size).max().unwrap_or(0)
  }

  /// Tells a second release apart from a pointer that never was an
  /// allocation. Only `release` writes the `Released` state, and the header
  /// keeps it inside whichever free chunk absorbed it; zeroed memory and
  /// headers written by `init` or a split read back as `Free`.
  fn classify_stray(
    &self,
    offset: usize,
  ) -> HeapError {
    let inside_free = self
      .free_list
      .iter(&self.region)
      .any(|(at, chunk)| at <= offset && offset < chunk.end(at));

    if inside_free && self.region.read(offset).state == ChunkState::Released {
      HeapError::DoubleRelease
    } else {
      HeapError::InvalidPointer
    }
  }
}

impl<P: RegionProvider> fmt::Debug for Heap<P> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("stats", &self.stats())
      .field("free_chunks", &self.free_chunks().collect::<Vec<_>>())
      .field("used_chunks", &self.used_chunks().collect::<Vec<_>>())
      .finish()
  }
}
