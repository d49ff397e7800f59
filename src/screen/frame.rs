//! Native frame buffers and the dirty rectangle between two of them

use crate::error::EpdError;
use crate::panel::{Geometry, Window};

/// One full frame in the panel's native format
///
/// Row-major, one byte per 8 horizontal pixels, most significant bit first,
/// `1` = light. The buffer is owned and never cloned: the refresh engine moves
/// a freshly converted candidate into the committed slot once the panel shows it.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    geometry: Geometry,
    bytes: Vec<u8>,
}

impl FrameBuffer {
    /// An all-light frame
    pub fn light(geometry: Geometry) -> Self {
        FrameBuffer {
            geometry,
            bytes: vec![0xFF; geometry.block_count()],
        }
    }

    /// Wrap native bytes, which must cover the geometry exactly
    pub fn from_bytes(geometry: Geometry, bytes: Vec<u8>) -> Result<Self, EpdError> {
        if bytes.len() != geometry.block_count() {
            return Err(EpdError::BufferSize {
                expected: geometry.block_count(),
                actual: bytes.len(),
            });
        }
        Ok(FrameBuffer { geometry, bytes })
    }

    /// Resolution the frame was built for
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Native bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Give up the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bounding rectangle of every block that differs from `other`
    ///
    /// `None` when the frames are identical.
    pub fn dirty_rect(&self, other: &FrameBuffer) -> Option<DirtyRect> {
        debug_assert_eq!(self.geometry, other.geometry);

        let mut dirty: Option<DirtyRect> = None;
        for (index, _) in self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
        {
            let (x, y) = self.geometry.block_origin(index);
            dirty = Some(match dirty {
                None => DirtyRect {
                    min_x: x,
                    min_y: y,
                    max_x: x + 7,
                    max_y: y,
                },
                Some(rect) => DirtyRect {
                    min_x: rect.min_x.min(x),
                    min_y: rect.min_y.min(y),
                    max_x: rect.max_x.max(x + 7),
                    max_y: rect.max_y.max(y),
                },
            });
        }
        dirty
    }
}

/// Inclusive pixel bounds of a changed region, aligned to 8-pixel columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    /// Leftmost changed pixel column, a multiple of 8
    pub min_x: u16,
    /// Topmost changed row
    pub min_y: u16,
    /// Rightmost changed pixel column, always `7 mod 8`
    pub max_x: u16,
    /// Bottommost changed row
    pub max_y: u16,
}

impl DirtyRect {
    /// Width in pixels
    pub fn width(&self) -> u16 {
        self.max_x - self.min_x + 1
    }

    /// Height in rows
    pub fn height(&self) -> u16 {
        self.max_y - self.min_y + 1
    }

    /// Area in pixels
    pub fn area(&self) -> u32 {
        u32::from(self.width()) * u32::from(self.height())
    }

    /// Window for a partial update covering this rectangle
    pub fn window(&self) -> Window {
        Window::new(self.min_x, self.min_y, self.width(), self.height())
    }
}
