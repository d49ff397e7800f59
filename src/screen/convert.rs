//! Conversion from the rendering surface's bitmap to the panel's native format
//!
//! The surface stores 1 bit per pixel in 32-bit words, rows padded to `stride`
//! bytes. Within a word the first pixel sits in the lowest bit, so after
//! reversing the word the pixels read left to right from the highest bit.
//! A set bit is the draw color (dark); the panel wants the opposite.

use crate::error::EpdError;
use crate::panel::Geometry;
use crate::screen::FrameBuffer;

/// Borrowed view of a rendered 1-bpp bitmap, valid for one render call
#[derive(Debug, Clone, Copy)]
pub struct SourceBitmap<'a> {
    stride: usize,
    height: usize,
    words: &'a [u32],
}

impl<'a> SourceBitmap<'a> {
    /// `stride` is in bytes and must be a multiple of 4
    pub fn new(stride: usize, height: usize, words: &'a [u32]) -> Self {
        SourceBitmap {
            stride,
            height,
            words,
        }
    }

    /// Bytes per row, padding included
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Rows
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel words
    pub fn words(&self) -> &'a [u32] {
        self.words
    }
}

/// Convert `source` into a native frame for `geometry`
///
/// Pure: the same input always yields the same bytes. Padding columns past
/// the panel width are dropped.
pub fn to_native(source: &SourceBitmap<'_>, geometry: Geometry) -> Result<FrameBuffer, EpdError> {
    let width = usize::from(geometry.width());
    let rows = usize::from(geometry.height());
    let words_per_row = source.stride / 4;

    if source.stride % 4 != 0
        || words_per_row == 0
        || source.stride * 8 < width
        || source.height < rows
        || source.words.len() < words_per_row * rows
    {
        return Err(EpdError::SourceTooSmall {
            stride: source.stride,
            rows: source.height,
            words: source.words.len(),
        });
    }

    let mut bytes = Vec::with_capacity(geometry.block_count());
    for row in source.words.chunks_exact(words_per_row).take(rows) {
        for (index, word) in row.iter().enumerate() {
            let col = index * 32;
            if col >= width {
                break;
            }
            let word = word.reverse_bits();
            for offset in (0..32).step_by(8) {
                if col + offset >= width {
                    // don't spill padding into the next row
                    break;
                }
                bytes.push(!((word >> (24 - offset)) as u8));
            }
        }
    }

    FrameBuffer::from_bytes(geometry, bytes)
}
