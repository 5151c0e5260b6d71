//! # wordheap - A Best-Fit Heap over a Fixed Region
//!
//! This crate provides a small `malloc`/`free` style allocator that manages a
//! single region reserved once from the operating system with `mmap(2)`.
//!
//! ## Overview
//!
//! The region is carved into chunks. Every chunk starts with a two-word
//! header followed by its payload:
//!
//! ```text
//!   Single Chunk:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Chunk Header       │           Payload              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ next: offset    │  │  ┌──────────────────────────┐  │
//!   │  │ size: N | state │  │  │     N bytes usable       │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │   HEADER_SIZE bytes   │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! Chunks sit on exactly one of two lists threaded through their headers:
//!
//! ```text
//!   Region (ascending addresses):
//!
//!   ┌────┬──────┬────┬──────┬────┬──────┬────┬──────────────────┐
//!   │ H  │ used │ H  │ free │ H  │ used │ H  │       free       │
//!   └────┴──────┴────┴──────┴────┴──────┴────┴──────────────────┘
//!          ▲              │                          ▲
//!          │              └──── free list ───────────┘
//!          └── used list (most recent first)
//! ```
//!
//! - **allocate** scans the free list for the smallest chunk that fits and
//!   splits it when the remainder can hold a header of its own.
//! - **release** puts the chunk back on the free list at its address and
//!   merges it with free chunks directly before and after it, so no two free
//!   chunks are ever adjacent.
//!
//! ## Crate Structure
//!
//! ```text
//!   wordheap
//!   ├── align      - Word alignment (align!, checked_align)
//!   ├── chunk      - Chunk header layout (internal) and ChunkSpan
//!   ├── region     - RegionProvider, Mmap, bounds-checked header access
//!   ├── list       - Free/used list search and splicing (internal)
//!   ├── heap       - Heap: init, allocate, release, stats
//!   └── error      - HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use wordheap::{Heap, HeapError};
//!
//! let mut heap = Heap::init(1024)?;
//!
//! let ptr = heap.allocate(128)?;
//! unsafe { ptr.cast::<u64>().write(42) };
//!
//! heap.release(ptr)?;
//! assert_eq!(heap.release(ptr), Err(HeapError::DoubleRelease));
//!
//! println!("{}", heap.stats());
//! # Ok::<(), HeapError>(())
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: a `Heap` is neither `Send` nor `Sync`
//! - **Fixed size**: the region never grows
//! - **Word alignment only**: payloads are aligned to `usize`
//! - **Unix-only**: the default provider requires `libc` and `mmap`
//!
//! ## Safety
//!
//! The heap never dereferences caller pointers; `release` and `usable_size`
//! only compare them against the chunks it owns. Reading and writing the
//! returned payload is up to the caller and requires `unsafe`.

pub mod align;
mod chunk;
mod error;
mod heap;
mod list;
mod region;

pub use align::WORD_SIZE;
pub use chunk::{ChunkSpan, HEADER_SIZE};
pub use error::HeapError;
pub use heap::{Heap, Stats};
pub use region::{Mmap, RegionProvider};
