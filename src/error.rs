use thiserror::Error;

/// Everything that can go wrong when driving a [`Heap`](crate::Heap).
///
/// None of these leave the heap in a modified state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
  /// The region could not be reserved, or fewer bytes are free in total than
  /// the request needs.
  #[error("out of memory: requested {requested} bytes, {free} free")]
  OutOfMemory { requested: usize, free: usize },

  /// Enough bytes are free in total but no single free chunk is large
  /// enough.
  #[error("heap fragmented: requested {requested} bytes, largest free chunk is {largest}")]
  Fragmented { requested: usize, largest: usize },

  #[error("invalid argument: {0}")]
  InvalidArgument(&'static str),

  /// The pointer was not handed out by this heap, or does not point at the
  /// start of an allocation.
  #[error("pointer does not belong to a live allocation of this heap")]
  InvalidPointer,

  #[error("allocation released twice")]
  DoubleRelease,
}
