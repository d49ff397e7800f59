//! Panel geometry and the seam between the refresh engine and a panel driver

use crate::error::EpdError;
use crate::screen::FrameBuffer;

/// Fixed panel resolution in pixels
///
/// The width is always a multiple of 8 since the panel packs 8 horizontal
/// pixels into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    width: u16,
    height: u16,
}

impl Geometry {
    /// Build a geometry, rounding the width down to a whole number of bytes
    pub const fn new(width: u16, height: u16) -> Self {
        Geometry {
            width: width & !0x07,
            height,
        }
    }

    /// Pixels per row
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Rows
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Bytes per row of the native frame
    pub const fn row_bytes(&self) -> usize {
        self.width as usize / 8
    }

    /// Number of 8-pixel blocks, which is also the native frame length
    pub const fn block_count(&self) -> usize {
        self.width as usize * self.height as usize / 8
    }

    /// Total pixel area
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Pixel coordinates of the first pixel of block `index`
    pub const fn block_origin(&self, index: usize) -> (u16, u16) {
        let first_pixel = index * 8;
        (
            (first_pixel % self.width as usize) as u16,
            (first_pixel / self.width as usize) as u16,
        )
    }
}

/// A rectangular region handed to a partial update, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Left edge
    pub x: u16,
    /// Top edge
    pub y: u16,
    /// Width in pixels
    pub width: u16,
    /// Height in rows
    pub height: u16,
}

impl Window {
    /// Shorthand constructor
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Window {
            x,
            y,
            width,
            height,
        }
    }
}

/// Operations the refresh engine needs from a panel
///
/// Implemented by [`crate::epd4in2b::Epd4in2b`]; tests substitute recorders.
pub trait Panel {
    /// Resolution fixed at construction
    fn geometry(&self) -> Geometry;

    /// Reset and configure the controller
    fn init(&mut self) -> Result<(), EpdError>;

    /// Fill both transmission buffers with light pixels without refreshing
    fn clear_frame(&mut self) -> Result<(), EpdError>;

    /// Repaint the whole panel from `frame`, or all light when absent
    fn display_frame(&mut self, frame: Option<&FrameBuffer>) -> Result<(), EpdError>;

    /// Repaint only `window`, taking its pixels from the full-size `frame`
    fn display_partial_frame(
        &mut self,
        frame: Option<&FrameBuffer>,
        window: Window,
    ) -> Result<(), EpdError>;

    /// Power down into deep sleep
    fn sleep(&mut self) -> Result<(), EpdError>;
}
