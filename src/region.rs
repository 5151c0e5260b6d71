use core::ptr::{self, NonNull};

use log::debug;

use crate::{
  align,
  chunk::{Chunk, HEADER_SIZE, RawHeader},
  error::HeapError,
};

/// Source of the raw memory a heap manages.
///
/// # Safety
///
/// `reserve` must return either `None` or a pointer to at least `size`
/// zeroed, readable and writable bytes, aligned to the machine word, which
/// stay valid and untouched by anyone else until `unreserve` is called with
/// the same pointer and size.
pub unsafe trait RegionProvider {
  fn reserve(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// # Safety
  ///
  /// `base` and `size` must come from a successful `reserve` on this provider.
  unsafe fn unreserve(
    &mut self,
    base: NonNull<u8>,
    size: usize,
  );
}

/// Anonymous private mappings obtained with `mmap(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mmap;

unsafe impl RegionProvider for Mmap {
  fn reserve(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      return None;
    }

    NonNull::new(address as *mut u8)
  }

  unsafe fn unreserve(
    &mut self,
    base: NonNull<u8>,
    size: usize,
  ) {
    let rc = unsafe { libc::munmap(base.as_ptr() as *mut libc::c_void, size) };
    if rc != 0 {
      log::error!("munmap({:?}, {}) failed", base, size);
    }
  }
}

/// The single contiguous range a heap owns. All header reads and writes go
/// through offset-addressed accessors that assert the header lies inside the
/// range and on a word boundary.
pub(crate) struct Region<P: RegionProvider> {
  base: NonNull<u8>,
  len: usize,
  provider: P,
}

impl<P: RegionProvider> Region<P> {
  pub fn reserve(
    mut provider: P,
    len: usize,
  ) -> Result<Self, HeapError> {
    let base = provider
      .reserve(len)
      .ok_or(HeapError::OutOfMemory { requested: len, free: 0 })?;

    assert!(
      align::is_aligned(base.as_ptr() as usize),
      "region provider returned unaligned base {:?}",
      base
    );

    debug!("reserved region of {} bytes at {:?}", len, base);

    Ok(Self { base, len, provider })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  fn header_ptr(
    &self,
    offset: usize,
  ) -> *mut RawHeader {
    assert!(
      self.holds_header(offset),
      "chunk header at offset {offset} outside region of {} bytes",
      self.len
    );
    unsafe { self.base.as_ptr().add(offset) as *mut RawHeader }
  }

  /// Whether a whole, word-aligned header fits at `offset`.
  pub fn holds_header(
    &self,
    offset: usize,
  ) -> bool {
    align::is_aligned(offset)
      && offset
        .checked_add(HEADER_SIZE)
        .is_some_and(|end| end <= self.len)
  }

  pub fn read(
    &self,
    offset: usize,
  ) -> Chunk {
    Chunk::decode(unsafe { self.header_ptr(offset).read() })
  }

  pub fn write(
    &mut self,
    offset: usize,
    chunk: Chunk,
  ) {
    debug_assert!(
      chunk.end(offset) <= self.len,
      "chunk at {offset} with payload {} overruns region of {} bytes",
      chunk.size,
      self.len
    );
    unsafe { self.header_ptr(offset).write(chunk.encode()) }
  }

  /// Rewrites only the `next` link of the chunk at `offset`.
  pub fn set_next(
    &mut self,
    offset: usize,
    next: Option<usize>,
  ) {
    let chunk = self.read(offset);
    self.write(offset, Chunk { next, ..chunk });
  }

  pub fn payload(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    assert!(self.holds_header(offset));
    unsafe { self.base.add(offset + HEADER_SIZE) }
  }

  /// Maps a payload pointer back to the offset of its chunk header, if the
  /// pointer could be a payload start inside this region.
  pub fn chunk_offset(
    &self,
    payload: NonNull<u8>,
  ) -> Option<usize> {
    let offset = (payload.as_ptr() as usize)
      .checked_sub(self.base.as_ptr() as usize)?
      .checked_sub(HEADER_SIZE)?;

    self.holds_header(offset).then_some(offset)
  }
}

impl<P: RegionProvider> Drop for Region<P> {
  fn drop(&mut self) {
    debug!("releasing region of {} bytes at {:?}", self.len, self.base);
    unsafe { self.provider.unreserve(self.base, self.len) }
  }
}
