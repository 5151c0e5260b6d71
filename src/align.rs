/// Size in bytes of a native machine word.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Rounds the given size up to the next machine word multiple.
///
/// # Examples
///
/// ```rust
/// use wordheap::align;
///
/// match core::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
///
/// Overflows for values close to `usize::MAX`; use [`checked_align`] on
/// caller supplied sizes.
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::WORD_SIZE - 1) & !($crate::align::WORD_SIZE - 1)
  };
}

/// Like [`align!`], but returns `None` instead of overflowing.
pub fn checked_align(value: usize) -> Option<usize> {
  value
    .checked_add(WORD_SIZE - 1)
    .map(|v| v & !(WORD_SIZE - 1))
}

pub(crate) fn is_aligned(value: usize) -> bool {
  value & (WORD_SIZE - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (WORD_SIZE * i + 1)..=(WORD_SIZE * (i + 1));

      let expected_alignment = WORD_SIZE * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), checked_align(size));
      }
    }
  }

  #[test]
  fn test_align_zero_and_exact() {
    assert_eq!(0, align!(0usize));
    assert_eq!(WORD_SIZE * 4, align!(WORD_SIZE * 4));
    assert!(is_aligned(WORD_SIZE * 3));
    assert!(!is_aligned(WORD_SIZE * 3 + 1));
  }

  #[test]
  fn test_checked_align_overflow() {
    assert_eq!(None, checked_align(usize::MAX));
    assert_eq!(None, checked_align(usize::MAX - WORD_SIZE + 2));
    assert_eq!(
      Some(usize::MAX - WORD_SIZE + 1),
      checked_align(usize::MAX - WORD_SIZE + 1)
    );
  }
}
