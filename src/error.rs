//! Error type shared by the panel driver and the refresh engine

pub use display_interface::DisplayError;
use thiserror::Error;

/// Everything that can go wrong between a render request and the panel
#[derive(Debug, Error)]
pub enum EpdError {
    /// A pin or bus write failed
    #[error("display interface error: {0:?}")]
    Interface(DisplayError),

    /// The busy line could not be sampled
    #[error("busy line could not be read")]
    BusyPin,

    /// The busy line never reported idle within the configured ceiling
    #[error("panel still busy after {waited_ms} ms")]
    DeviceUnresponsive {
        /// Time spent polling before giving up
        waited_ms: u32,
    },

    /// The SPI bus or GPIO pins could not be acquired at startup
    #[error("peripheral bus could not be acquired")]
    BusUnavailable,

    /// A frame handed to the driver does not match the panel geometry
    #[error("frame has {actual} bytes, panel needs {expected}")]
    BufferSize {
        /// Bytes the panel geometry requires
        expected: usize,
        /// Bytes that were supplied
        actual: usize,
    },

    /// A source bitmap is smaller than the panel or not word aligned
    #[error("source bitmap (stride {stride} bytes, {rows} rows, {words} words) cannot cover the panel")]
    SourceTooSmall {
        /// Stride of the source in bytes
        stride: usize,
        /// Rows available in the source
        rows: usize,
        /// 32-bit words available in the source
        words: usize,
    },

    /// A partial window starts outside the panel or has no area
    #[error("partial window {x},{y} {width}x{height} is outside the panel")]
    WindowOutOfBounds {
        /// Requested left edge
        x: u16,
        /// Requested top edge
        y: u16,
        /// Requested width
        width: u16,
        /// Requested height
        height: u16,
    },
}

impl From<DisplayError> for EpdError {
    fn from(err: DisplayError) -> Self {
        EpdError::Interface(err)
    }
}
