use core::mem;

use crate::align;

/// In-region header layout. `tagged_size` holds the payload size with the
/// chunk state packed into its two low bits.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct RawHeader {
  next: usize,
  tagged_size: usize,
}

/// Bytes taken by one chunk header, rounded to the machine word.
pub const HEADER_SIZE: usize = align!(mem::size_of::<RawHeader>());

const NIL: usize = usize::MAX;
const STATE_MASK: usize = 0b11;

/// Where a chunk header came from. Untouched zeroed memory decodes as `Free`,
/// so only headers written by a release ever read back as `Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChunkState {
  Free = 0,
  Live = 1,
  Released = 2,
}

/// Decoded chunk header. `next` is the region offset of the following chunk
/// on whichever list currently holds this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
  pub next: Option<usize>,
  pub size: usize,
  pub state: ChunkState,
}

impl Chunk {
  pub fn new(
    size: usize,
    state: ChunkState,
    next: Option<usize>,
  ) -> Self {
    debug_assert!(align::is_aligned(size), "unaligned chunk size {size}");
    Self { next, size, state }
  }

  pub fn is_live(&self) -> bool {
    self.state == ChunkState::Live
  }

  /// Offset one past the end of this chunk's payload, i.e. where a
  /// memory-adjacent successor header would start.
  pub fn end(
    &self,
    offset: usize,
  ) -> usize {
    offset + HEADER_SIZE + self.size
  }

  pub(crate) fn encode(&self) -> RawHeader {
    RawHeader {
      next: self.next.unwrap_or(NIL),
      tagged_size: self.size | self.state as usize,
    }
  }

  pub(crate) fn decode(raw: RawHeader) -> Self {
    let state = match raw.tagged_size & STATE_MASK {
      1 => ChunkState::Live,
      2 => ChunkState::Released,
      _ => ChunkState::Free,
    };

    Self {
      next: (raw.next != NIL).then_some(raw.next),
      size: raw.tagged_size & !STATE_MASK,
      state,
    }
  }
}

/// Public view of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSpan {
  /// Offset of the chunk header from the start of the region.
  pub offset: usize,
  /// Payload bytes following the header.
  pub size: usize,
}

impl ChunkSpan {
  /// Offset of the first payload byte.
  pub fn payload_offset(&self) -> usize {
    self.offset + HEADER_SIZE
  }
}
