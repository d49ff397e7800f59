//! 4.2" bichromatic ePaper Display Driver
//!
//! Used in the 400x300 black/white(/red) panel driven in black/white mode with
//! waveforms loaded from registers.
//!
//! This driver is losely modeled after the
//! [epd-waveshare](https://github.com/caemor/epd-waveshare) drivers but built for
//! diff-driven partial refreshes.
//!
//! ### Usage
//! 1. hand the SPI device and pins to [`driver::Epd4in2b::new`]
//! 1. call [`driver::Epd4in2b::init`] once (and again after sleeping)
//! 1. send full frames with [`driver::Epd4in2b::display_frame`] or windows with
//!    [`driver::Epd4in2b::display_partial_frame`]
//!
//! Most callers go through [`crate::screen::Screen`], which decides between the two.

pub mod cmd;
pub mod driver;
pub mod flag;
pub mod interface;
pub mod lut;
pub mod pins;

pub use driver::{DriverState, Epd4in2b};
pub use interface::BusyWait;

use crate::panel::Geometry;

/// Display width, pixels horizontally
pub const WIDTH: u16 = 400;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 300;

/// Resolution of the panel this driver targets
pub const GEOMETRY: Geometry = Geometry::new(WIDTH, HEIGHT);
