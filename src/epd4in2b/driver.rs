//! Driver for the 4.2" bichromatic e-paper panel
//!
//! ## Wire protocol
//!
//! Every operation is an ordered list of command bytes (DC low), data bytes
//! (DC high), fixed delays and busy waits. The controller keeps two
//! transmission buffers: buffer 1 holds the "old" plane and buffer 2 the
//! "new" plane, and the loaded waveform decides how each old/new pair is
//! driven during a refresh.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --init()--> Ready --display op--> Busy --idle--> Ready
//!                           Ready --sleep()--> Asleep --init()--> Ready
//! ```
//!
//! Display operations outside `Ready` are programming errors and panic.
//! A busy wait that times out leaves the driver `Busy`; only `init()`
//! (which pulses the reset line) recovers it.
//!
//! ## Pixel polarity
//!
//! Native bytes carry 8 horizontal pixels, most significant bit first,
//! `1` = light and `0` = dark.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::epd4in2b::interface::{BusyWait, DisplayInterface};
use crate::epd4in2b::lut::{Transition, Waveform};
use crate::epd4in2b::{cmd::Cmd, flag::Flag, GEOMETRY};
use crate::error::EpdError;
use crate::panel::{Geometry, Panel, Window};
use crate::screen::FrameBuffer;

/// Delay between finishing a plane and the next command
const PLANE_SETTLE_MS: u32 = 2;

/// Delay between the refresh command and the first busy poll
const REFRESH_SETTLE_MS: u32 = 100;

/// Delay while the power rails discharge before sleeping
const POWER_DOWN_SETTLE_MS: u32 = 100;

/// Data passes per partial refresh; with the low-artifact waveform a single
/// pass does not always make the transition stick
const PARTIAL_PASSES: usize = 2;

/// Where the driver is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Constructed, controller not configured yet
    Uninitialized,
    /// Configured and idle
    Ready,
    /// Waiting for the busy line after a refresh or power transition
    Busy,
    /// Deep sleep, needs a reset through `init()`
    Asleep,
}

/// 4.2" E-Paper Display Driver
///
/// ## Type Parameters
///
/// - `SPI` - SPI device for communication
/// - `BSY` - BUSY input pin (LOW when display is busy)
/// - `DC` - Data/Command output pin
/// - `RST` - Reset output pin
/// - `DELAY` - Delay provider for timing
pub struct Epd4in2b<SPI, BSY, DC, RST, DELAY> {
    interface: DisplayInterface<SPI, BSY, DC, RST, DELAY>,
    geometry: Geometry,
    state: DriverState,
}

impl<SPI, BSY, DC, RST, DELAY> Epd4in2b<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Create the driver for the standard 400x300 panel without touching the hardware
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        Self::with_geometry(spi, busy, dc, rst, delay, GEOMETRY)
    }

    /// Create the driver for a panel of a different resolution
    pub fn with_geometry(
        spi: SPI,
        busy: BSY,
        dc: DC,
        rst: RST,
        delay: DELAY,
        geometry: Geometry,
    ) -> Self {
        Epd4in2b {
            interface: DisplayInterface::new(spi, busy, dc, rst, delay),
            geometry,
            state: DriverState::Uninitialized,
        }
    }

    /// Replace the busy wait ceiling and poll interval
    pub fn with_busy_wait(mut self, busy_wait: BusyWait) -> Self {
        self.interface.set_busy_wait(busy_wait);
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Panel resolution
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Give the peripherals back
    pub fn release(self) -> (SPI, BSY, DC, RST, DELAY) {
        self.interface.release()
    }

    fn expect_ready(&self, operation: &str) {
        assert!(
            self.state == DriverState::Ready,
            "{operation} requires an initialized, awake panel (state is {:?})",
            self.state
        );
    }

    fn check_len(&self, buffer: &[u8]) -> Result<(), EpdError> {
        let expected = self.geometry.block_count();
        if buffer.len() != expected {
            return Err(EpdError::BufferSize {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(())
    }

    /// Wait for the busy line, staying `Busy` if it never clears
    fn wait_busy(&mut self) -> Result<(), EpdError> {
        self.state = DriverState::Busy;
        self.interface.wait_until_idle()?;
        self.state = DriverState::Ready;
        Ok(())
    }

    /// Refresh the panel from its transmission buffers and block until idle
    fn refresh(&mut self) -> Result<(), EpdError> {
        self.interface.cmd(Cmd::DISPLAY_REFRESH)?;
        self.interface.delay.delay_ms(REFRESH_SETTLE_MS);
        self.wait_busy()
    }

    /// Upload all five tables of a waveform
    fn load_waveform(&mut self, waveform: Waveform) -> Result<(), EpdError> {
        log::debug!("Loading {:?} waveform", waveform);
        for transition in Transition::ALL {
            self.interface
                .cmd_with_data(transition.command(), &waveform.encode(transition))?;
        }
        Ok(())
    }

    /// Write one full plane, light pixels when `buffer` is absent
    fn write_plane(&mut self, command: u8, buffer: Option<&[u8]>) -> Result<(), EpdError> {
        self.interface.cmd(command)?;
        match buffer {
            Some(buffer) => self.interface.data(buffer)?,
            None => self
                .interface
                .data_x_times(Flag::ALL_LIGHT, self.geometry.block_count())?,
        }
        self.interface.delay.delay_ms(PLANE_SETTLE_MS);
        Ok(())
    }

    /// Reset the controller and run the power-up configuration
    ///
    /// Valid from every state; this is also how a sleeping or stuck panel is
    /// brought back.
    pub fn init(&mut self) -> Result<(), EpdError> {
        log::info!(
            "Initializing {}x{} e-paper panel",
            self.geometry.width(),
            self.geometry.height()
        );

        self.interface.reset()?;

        self.interface.cmd_with_data(
            Cmd::POWER_SETTING,
            &[
                Flag::POWER_VDS_VDG_EN,
                Flag::POWER_VCOM_VGHL_DEFAULT,
                Flag::POWER_VDH,
                Flag::POWER_VDL,
                Flag::POWER_VDHR,
            ],
        )?;
        self.interface
            .cmd_with_data(Cmd::BOOSTER_SOFT_START, &[Flag::BOOSTER_SOFT_START_PHASE; 3])?;
        self.interface.cmd(Cmd::POWER_ON)?;
        self.wait_busy()?;

        self.interface
            .cmd_with_data(Cmd::PANEL_SETTING, &[Flag::PANEL_BW_LUT_FROM_REGISTER])?;
        self.interface
            .cmd_with_data(Cmd::PLL_CONTROL, &[Flag::PLL_50HZ])?;
        self.interface
            .cmd_with_data(Cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[Flag::BORDER_FLOATING])?;

        self.state = DriverState::Ready;
        log::info!("Panel ready");
        Ok(())
    }

    /// Make both transmission buffers light without refreshing
    pub fn clear_frame(&mut self) -> Result<(), EpdError> {
        self.expect_ready("clear_frame");
        log::debug!("Clearing both transmission buffers");

        let (width, height) = (self.geometry.width(), self.geometry.height());
        self.interface.cmd_with_data(
            Cmd::RESOLUTION_SETTING,
            &[
                (width >> 8) as u8,
                (width & 0xFF) as u8,
                (height >> 8) as u8,
                (height & 0xFF) as u8,
            ],
        )?;

        for command in [Cmd::DATA_START_TRANSMISSION_1, Cmd::DATA_START_TRANSMISSION_2] {
            self.interface.cmd(command)?;
            self.interface.delay.delay_ms(PLANE_SETTLE_MS);
            self.interface
                .data_x_times(Flag::ALL_LIGHT, self.geometry.block_count())?;
            self.interface.delay.delay_ms(PLANE_SETTLE_MS);
        }
        Ok(())
    }

    /// Repaint the whole panel with the standard waveform
    ///
    /// Buffer 1 is filled light and buffer 2 receives `buffer`, or light
    /// pixels when it is `None`.
    pub fn display_frame(&mut self, buffer: Option<&[u8]>) -> Result<(), EpdError> {
        self.display_full(buffer, Waveform::Standard)
    }

    /// Like [`Self::display_frame`] but with the quick waveform
    pub fn display_frame_quick(&mut self, buffer: Option<&[u8]>) -> Result<(), EpdError> {
        self.display_full(buffer, Waveform::Quick)
    }

    fn display_full(&mut self, buffer: Option<&[u8]>, waveform: Waveform) -> Result<(), EpdError> {
        self.expect_ready("display_frame");
        if let Some(buffer) = buffer {
            self.check_len(buffer)?;
        }
        log::info!("Full refresh ({:?} waveform)", waveform);

        self.write_plane(Cmd::DATA_START_TRANSMISSION_1, None)?;
        self.write_plane(Cmd::DATA_START_TRANSMISSION_2, buffer)?;
        self.load_waveform(waveform)?;
        self.refresh()
    }

    /// Repaint only a window of the panel with the low-artifact waveform
    ///
    /// `buffer` is the full-size frame; only the bytes inside the window are
    /// sent. `x` is rounded down to a multiple of 8 and the window's right
    /// edge is extended to the end of its byte, then the window is clipped to
    /// the panel. The data is sent and refreshed twice.
    pub fn display_partial_frame(
        &mut self,
        buffer: Option<&[u8]>,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> Result<(), EpdError> {
        self.expect_ready("display_partial_frame");
        if let Some(buffer) = buffer {
            self.check_len(buffer)?;
        }

        let out_of_bounds = EpdError::WindowOutOfBounds {
            x,
            y,
            width,
            height,
        };
        if width == 0
            || height == 0
            || x >= self.geometry.width()
            || y >= self.geometry.height()
        {
            return Err(out_of_bounds);
        }

        let x_start = x & !0x07;
        let x_end = (x.saturating_add(width - 1) | 0x07).min(self.geometry.width() - 1);
        let y_start = y;
        let y_end = y.saturating_add(height - 1).min(self.geometry.height() - 1);
        log::debug!(
            "Partial refresh of columns {}..={} rows {}..={}",
            x_start,
            x_end,
            y_start,
            y_end
        );

        self.load_waveform(Waveform::LowArtifact)?;
        self.interface.cmd(Cmd::PARTIAL_IN)?;
        self.interface.cmd_with_data(
            Cmd::PARTIAL_WINDOW,
            &[
                (x_start >> 8) as u8,
                (x_start & 0xFF) as u8,
                (x_end >> 8) as u8,
                (x_end & 0xFF) as u8,
                (y_start >> 8) as u8,
                (y_start & 0xFF) as u8,
                (y_end >> 8) as u8,
                (y_end & 0xFF) as u8,
                Flag::PARTIAL_SCAN_INSIDE_ONLY,
            ],
        )?;

        let row_bytes = self.geometry.row_bytes();
        let first_col = usize::from(x_start) / 8;
        let last_col = usize::from(x_end) / 8;
        let window_bytes = (last_col - first_col + 1) * usize::from(y_end - y_start + 1);

        for _ in 0..PARTIAL_PASSES {
            self.interface.cmd(Cmd::DATA_START_TRANSMISSION_2)?;
            match buffer {
                Some(buffer) => {
                    for row in usize::from(y_start)..=usize::from(y_end) {
                        let start = row * row_bytes + first_col;
                        let end = row * row_bytes + last_col;
                        self.interface.data(&buffer[start..=end])?;
                    }
                }
                None => self.interface.data_x_times(Flag::ALL_LIGHT, window_bytes)?,
            }
            self.refresh()?;
        }

        self.interface.cmd(Cmd::PARTIAL_OUT)?;
        Ok(())
    }

    /// Power the panel down into deep sleep
    ///
    /// Only `init()` (through its reset pulse) wakes the panel again.
    pub fn sleep(&mut self) -> Result<(), EpdError> {
        self.expect_ready("sleep");
        log::info!("Putting panel to deep sleep");

        self.interface
            .cmd_with_data(Cmd::VCOM_AND_DATA_INTERVAL_SETTING, &[Flag::BORDER_FLOATING])?;
        self.interface.cmd(Cmd::VCM_DC_SETTING)?;
        self.interface.cmd(Cmd::PANEL_SETTING)?;
        self.interface.delay.delay_ms(POWER_DOWN_SETTLE_MS);

        self.interface
            .cmd_with_data(Cmd::POWER_SETTING, &Flag::POWER_ALL_OFF)?;
        self.interface.delay.delay_ms(POWER_DOWN_SETTLE_MS);

        self.interface.cmd(Cmd::POWER_OFF)?;
        self.wait_busy()?;
        self.interface
            .cmd_with_data(Cmd::DEEP_SLEEP, &[Flag::DEEP_SLEEP_CHECK])?;

        self.state = DriverState::Asleep;
        Ok(())
    }
}

impl<SPI, BSY, DC, RST, DELAY> Panel for Epd4in2b<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn init(&mut self) -> Result<(), EpdError> {
        Epd4in2b::init(self)
    }

    fn clear_frame(&mut self) -> Result<(), EpdError> {
        Epd4in2b::clear_frame(self)
    }

    fn display_frame(&mut self, frame: Option<&FrameBuffer>) -> Result<(), EpdError> {
        Epd4in2b::display_frame(self, frame.map(FrameBuffer::as_bytes))
    }

    fn display_partial_frame(
        &mut self,
        frame: Option<&FrameBuffer>,
        window: Window,
    ) -> Result<(), EpdError> {
        Epd4in2b::display_partial_frame(
            self,
            frame.map(FrameBuffer::as_bytes),
            window.x,
            window.y,
            window.width,
            window.height,
        )
    }

    fn sleep(&mut self) -> Result<(), EpdError> {
        Epd4in2b::sleep(self)
    }
}
