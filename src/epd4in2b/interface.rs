//! Display interface using SPI
//!
//! Everything the panel understands is a command byte (DC low) or a data byte
//! (DC high), plus the reset pulse and the busy line.
use crate::error::{DisplayError, EpdError};
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

const RESET_SETTLE_MS: u32 = 200;

/// Send repeated bytes in chunks of this size
const CHUNK_SIZE: usize = 32;

/// How long to wait for the busy line before declaring the panel unresponsive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyWait {
    /// Ceiling on the total wait
    pub timeout_ms: u32,
    /// Delay between two samples of the busy line
    pub poll_ms: u32,
}

impl Default for BusyWait {
    fn default() -> Self {
        BusyWait {
            timeout_ms: 15_000,
            poll_ms: 1,
        }
    }
}

/// The connection to the panel controller
pub struct DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    /// SPI device
    spi: SPI,
    /// Low while the panel is busy, high when idle
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Reseting
    rst: RST,
    /// Delay provider for settle times
    pub(crate) delay: DELAY,
    busy_wait: BusyWait,
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY> {
    /// Bundle the peripherals
    pub fn new(spi: SPI, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        DisplayInterface {
            spi,
            busy,
            dc,
            rst,
            delay,
            busy_wait: BusyWait::default(),
        }
    }

    /// Replace the busy wait policy
    pub fn set_busy_wait(&mut self, busy_wait: BusyWait) {
        self.busy_wait = busy_wait;
    }

    /// Current busy wait policy
    pub fn busy_wait(&self) -> BusyWait {
        self.busy_wait
    }

    /// Give the peripherals back
    pub fn release(self) -> (SPI, BSY, DC, RST, DELAY) {
        (self.spi, self.busy, self.dc, self.rst, self.delay)
    }
}

impl<SPI, BSY, DC, RST, DELAY> DisplayInterface<SPI, BSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Basic function for sending commands
    pub(crate) fn cmd(&mut self, command: u8) -> Result<(), EpdError> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;

        match self.spi.write(&[command]) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("SPI write error for command 0x{:02X}: {:?}", command, e);
                Err(DisplayError::BusWriteError.into())
            }
        }
    }

    /// Basic function for sending an array of u8-values of data over spi
    pub(crate) fn data(&mut self, data: &[u8]) -> Result<(), EpdError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.spi
            .write(data)
            .map_err(|_| DisplayError::BusWriteError)?;
        Ok(())
    }

    /// Basic function for sending a command and the data belonging to it.
    pub(crate) fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), EpdError> {
        self.cmd(command)?;
        self.data(data)
    }

    /// Send the same byte `repetitions` times, used to fill a plane with one color
    pub(crate) fn data_x_times(&mut self, val: u8, repetitions: usize) -> Result<(), EpdError> {
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;

        let buffer = [val; CHUNK_SIZE];
        let full_chunks = repetitions / CHUNK_SIZE;
        let remainder = repetitions % CHUNK_SIZE;

        for _ in 0..full_chunks {
            self.spi
                .write(&buffer)
                .map_err(|_| DisplayError::BusWriteError)?;
        }
        if remainder > 0 {
            self.spi
                .write(&buffer[..remainder])
                .map_err(|_| DisplayError::BusWriteError)?;
        }

        log::debug!("Sent 0x{:02X} x {}", val, repetitions);
        Ok(())
    }

    /// Pulse the reset line low, then high, letting the controller settle after each edge
    pub(crate) fn reset(&mut self) -> Result<(), EpdError> {
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    /// Poll the busy line until the panel reports idle
    ///
    /// Fails with [`EpdError::DeviceUnresponsive`] once `timeout_ms` of polling
    /// has passed; a stuck busy line cannot hang the caller.
    pub(crate) fn wait_until_idle(&mut self) -> Result<(), EpdError> {
        let BusyWait {
            timeout_ms,
            poll_ms,
        } = self.busy_wait;
        let poll_ms = poll_ms.max(1);
        let mut waited_ms: u32 = 0;

        loop {
            // 0: busy, 1: idle
            if self.busy.is_high().map_err(|_| EpdError::BusyPin)? {
                if waited_ms > 0 {
                    log::debug!("Panel idle after {} ms", waited_ms);
                }
                return Ok(());
            }
            if waited_ms >= timeout_ms {
                log::error!("Busy line still low after {} ms, giving up", waited_ms);
                return Err(EpdError::DeviceUnresponsive { waited_ms });
            }
            self.delay.delay_ms(poll_ms);
            waited_ms = waited_ms.saturating_add(poll_ms);
        }
    }
}
