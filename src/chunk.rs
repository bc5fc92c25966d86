//! Splitting byte buffers into bounded-size body messages.
//!
//! [`chunk_bytes`] yields zero-copy slices of at most `max` bytes, each tagged
//! with whether it is the last one. An empty buffer still yields exactly one
//! empty, final chunk so a response body is never left without a closing
//! message.

use std::num::NonZeroUsize;

use bytes::Bytes;

/// One slice of a chunked buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk payload.
    pub payload: Bytes,
    /// Whether this is the final chunk of the buffer.
    pub is_last: bool,
}

/// Iterator over the chunks of a buffer.
#[derive(Clone, Debug)]
pub struct Chunks {
    data: Bytes,
    max: usize,
    offset: usize,
    emitted_empty: bool,
}

/// Split `data` into chunks of at most `max` bytes.
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use bytes::Bytes;
/// use gateway_bridge::chunk::chunk_bytes;
///
/// let max = NonZeroUsize::new(3).expect("non-zero");
/// let sizes: Vec<_> = chunk_bytes(Bytes::from_static(b"abcdefgh"), max)
///     .map(|chunk| (chunk.payload.len(), chunk.is_last))
///     .collect();
/// assert_eq!(sizes, [(3, false), (3, false), (2, true)]);
/// ```
#[must_use]
pub fn chunk_bytes(data: Bytes, max: NonZeroUsize) -> Chunks {
    Chunks {
        data,
        max: max.get(),
        offset: 0,
        emitted_empty: false,
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let total = self.data.len();
        if total == 0 {
            if self.emitted_empty {
                return None;
            }
            self.emitted_empty = true;
            return Some(Chunk {
                payload: Bytes::new(),
                is_last: true,
            });
        }
        if self.offset >= total {
            return None;
        }

        let end = (self.offset + self.max).min(total);
        let payload = self.data.slice(self.offset..end);
        self.offset = end;
        Some(Chunk {
            payload,
            is_last: end == total,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.data.is_empty() {
            usize::from(!self.emitted_empty)
        } else {
            (self.data.len() - self.offset).div_ceil(self.max)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks {}
