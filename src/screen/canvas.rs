//! Drawing surface for the agenda layout
//!
//! Pixels are kept in the word-packed, stride-padded layout that
//! [`super::convert::to_native`] consumes, so any `embedded-graphics`
//! drawable can be rendered straight onto the panel.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::panel::Geometry;
use crate::screen::SourceBitmap;

/// 1-bpp canvas, `BinaryColor::On` is ink
pub struct Canvas {
    width: u32,
    height: u32,
    stride: usize,
    words: Vec<u32>,
}

impl Canvas {
    /// Blank canvas the size of the panel
    pub fn new(geometry: Geometry) -> Self {
        let width = u32::from(geometry.width());
        let height = u32::from(geometry.height());
        // rows are padded to whole 32-bit words
        let stride = (width as usize).div_ceil(32) * 4;
        Canvas {
            width,
            height,
            stride,
            words: vec![0; stride / 4 * height as usize],
        }
    }

    /// Bytes per row, padding included
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// View handed to the refresh engine
    pub fn bitmap(&self) -> SourceBitmap<'_> {
        SourceBitmap::new(self.stride, self.height as usize, &self.words)
    }

    /// Whether the pixel at `point` is inked; false outside the canvas
    pub fn pixel(&self, point: Point) -> bool {
        match self.locate(point) {
            Some((index, bit)) => self.words[index] & (1 << bit) != 0,
            None => false,
        }
    }

    fn locate(&self, point: Point) -> Option<(usize, u32)> {
        let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
            return None;
        };
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.stride / 4 + x as usize / 32;
        Some((index, x % 32))
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some((index, bit)) = self.locate(point) {
                match color {
                    BinaryColor::On => self.words[index] |= 1 << bit,
                    BinaryColor::Off => self.words[index] &= !(1 << bit),
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = match color {
            BinaryColor::On => u32::MAX,
            BinaryColor::Off => 0,
        };
        self.words.fill(fill);
        Ok(())
    }
}
