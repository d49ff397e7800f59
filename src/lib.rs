//! Agenda display for a 4.2" bichromatic e-paper panel
//!
//! The crate is split the way the data flows:
//!
//! - [`screen::Canvas`] is drawn on with `embedded-graphics`
//! - [`screen::Screen`] converts the drawing into the panel's native format,
//!   diffs it against what the panel shows and picks a partial or full refresh
//! - [`epd4in2b::Epd4in2b`] puts the chosen refresh on the wire through
//!   `embedded-hal` SPI and GPIO
//!
//! `sim::SimBus` stands in for the hardware on the host.

pub mod config;
pub mod epd4in2b;
pub mod error;
pub mod panel;
pub mod screen;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

pub use config::Config;
pub use error::EpdError;
pub use panel::{Geometry, Panel, Window};
pub use screen::{Canvas, FullReason, Refresh, Screen};
