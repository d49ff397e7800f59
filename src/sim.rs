//! Simulated panel wiring for host runs and tests
//!
//! [`SimBus`] hands out an SPI device, the two output pins, the busy input
//! and a delay that all share one recorder. Everything the driver puts on
//! the wire is kept as a [`WireEvent`] and also interpreted the way the
//! controller would: data lands in the two transmission buffers (inside the
//! partial window when one is active) and a refresh copies buffer 2 onto the
//! simulated glass, which [`SimBus::shown`] returns.
//!
//! Delays do not sleep, they only add to [`SimBus::elapsed_ms`].

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::epd4in2b::{cmd::Cmd, flag::Flag, Epd4in2b};
use crate::panel::Geometry;

/// Busy polls the simulated controller stays busy after a long operation
const DEFAULT_BUSY_CYCLES: u32 = 3;

/// One thing observed on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// Byte sent with DC low
    Command(u8),
    /// Bytes sent with DC high in one SPI transaction
    Data(Vec<u8>),
    /// Reset line driven to the given level, `false` = low
    Reset(bool),
    /// Busy line sampled
    BusyRead {
        /// Whether the controller reported busy
        busy: bool,
    },
}

/// Inclusive byte columns and rows of the active partial window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteWindow {
    first_col: usize,
    last_col: usize,
    first_row: usize,
    last_row: usize,
}

impl ByteWindow {
    fn from_args(args: &[u8]) -> Self {
        let word = |i: usize| usize::from(u16::from_be_bytes([args[i], args[i + 1]]));
        ByteWindow {
            first_col: word(0) / 8,
            last_col: word(2) / 8,
            first_row: word(4),
            last_row: word(6),
        }
    }

    fn cols(&self) -> usize {
        (self.last_col + 1).saturating_sub(self.first_col).max(1)
    }
}

#[derive(Debug)]
struct SimState {
    geometry: Geometry,
    events: Vec<WireEvent>,
    dc_high: bool,
    command: Option<u8>,
    args: Vec<u8>,
    cursor: usize,
    buffer1: Vec<u8>,
    buffer2: Vec<u8>,
    shown: Vec<u8>,
    partial: bool,
    window: Option<ByteWindow>,
    busy_cycles: u32,
    busy_left: u32,
    stuck: bool,
    asleep: bool,
    elapsed_ns: u64,
}

impl SimState {
    fn new(geometry: Geometry) -> Self {
        let light = vec![Flag::ALL_LIGHT; geometry.block_count()];
        SimState {
            geometry,
            events: Vec::new(),
            dc_high: false,
            command: None,
            args: Vec::new(),
            cursor: 0,
            buffer1: light.clone(),
            buffer2: light.clone(),
            shown: light,
            partial: false,
            window: None,
            busy_cycles: DEFAULT_BUSY_CYCLES,
            busy_left: 0,
            stuck: false,
            asleep: false,
            elapsed_ns: 0,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if self.dc_high {
            self.events.push(WireEvent::Data(bytes.to_vec()));
            for &byte in bytes {
                self.data(byte);
            }
        } else {
            for &byte in bytes {
                self.events.push(WireEvent::Command(byte));
                self.command(byte);
            }
        }
    }

    fn command(&mut self, command: u8) {
        self.command = Some(command);
        self.args.clear();
        self.cursor = 0;

        match command {
            Cmd::POWER_ON | Cmd::POWER_OFF => self.busy_left = self.busy_cycles,
            Cmd::DISPLAY_REFRESH => {
                self.refresh();
                self.busy_left = self.busy_cycles;
            }
            Cmd::PARTIAL_IN => self.partial = true,
            Cmd::PARTIAL_OUT => self.partial = false,
            _ => {}
        }
    }

    fn data(&mut self, byte: u8) {
        match self.command {
            Some(Cmd::DATA_START_TRANSMISSION_1) => {
                if let Some(index) = self.plane_index() {
                    self.buffer1[index] = byte;
                }
                self.cursor += 1;
            }
            Some(Cmd::DATA_START_TRANSMISSION_2) => {
                if let Some(index) = self.plane_index() {
                    self.buffer2[index] = byte;
                }
                self.cursor += 1;
            }
            Some(Cmd::PARTIAL_WINDOW) => {
                self.args.push(byte);
                if self.args.len() == 8 {
                    self.window = Some(ByteWindow::from_args(&self.args));
                }
            }
            Some(Cmd::DEEP_SLEEP) if byte == Flag::DEEP_SLEEP_CHECK => self.asleep = true,
            _ => self.args.push(byte),
        }
    }

    /// Buffer index the next plane byte lands on
    fn plane_index(&self) -> Option<usize> {
        let row_bytes = self.geometry.row_bytes();
        let index = match (self.partial, self.window) {
            (true, Some(window)) => {
                let row = window.first_row + self.cursor / window.cols();
                let col = window.first_col + self.cursor % window.cols();
                if row > window.last_row {
                    return None;
                }
                row * row_bytes + col
            }
            _ => self.cursor,
        };
        (index < self.geometry.block_count()).then_some(index)
    }

    fn refresh(&mut self) {
        let row_bytes = self.geometry.row_bytes();
        match (self.partial, self.window) {
            (true, Some(window)) => {
                for row in window.first_row..=window.last_row {
                    let start = row * row_bytes + window.first_col;
                    let end = row * row_bytes + window.last_col;
                    if end < self.shown.len() {
                        self.shown[start..=end].copy_from_slice(&self.buffer2[start..=end]);
                    }
                }
            }
            _ => self.shown.copy_from_slice(&self.buffer2),
        }
    }

    fn reset(&mut self, high: bool) {
        self.events.push(WireEvent::Reset(high));
        if !high {
            self.asleep = false;
            self.partial = false;
            self.busy_left = 0;
        }
    }

    fn sample_busy(&mut self) -> bool {
        let busy = if self.stuck {
            true
        } else if self.busy_left > 0 {
            self.busy_left -= 1;
            true
        } else {
            false
        };
        self.events.push(WireEvent::BusyRead { busy });
        busy
    }
}

/// Shared handle to the simulated panel
#[derive(Debug, Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    /// A simulated panel showing an all-light image
    pub fn new(geometry: Geometry) -> Self {
        SimBus {
            state: Rc::new(RefCell::new(SimState::new(geometry))),
        }
    }

    /// SPI device, chip select is implied by the transaction
    pub fn spi(&self) -> SimSpi {
        SimSpi { bus: self.clone() }
    }

    /// Busy input, low while the controller works
    pub fn busy(&self) -> SimBusy {
        SimBusy { bus: self.clone() }
    }

    /// Data/command output
    pub fn dc(&self) -> SimPin {
        SimPin {
            bus: self.clone(),
            role: PinRole::DataCommand,
        }
    }

    /// Reset output
    pub fn rst(&self) -> SimPin {
        SimPin {
            bus: self.clone(),
            role: PinRole::Reset,
        }
    }

    /// Delay that only advances the simulated clock
    pub fn delay(&self) -> SimDelay {
        SimDelay { bus: self.clone() }
    }

    /// Driver wired to this bus
    pub fn driver(&self) -> Epd4in2b<SimSpi, SimBusy, SimPin, SimPin, SimDelay> {
        let geometry = self.state.borrow().geometry;
        Epd4in2b::with_geometry(
            self.spi(),
            self.busy(),
            self.dc(),
            self.rst(),
            self.delay(),
            geometry,
        )
    }

    /// Everything recorded so far
    pub fn events(&self) -> Vec<WireEvent> {
        self.state.borrow().events.clone()
    }

    /// Everything recorded so far, clearing the log
    pub fn take_events(&self) -> Vec<WireEvent> {
        std::mem::take(&mut self.state.borrow_mut().events)
    }

    /// Drop the recorded events
    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Command bytes in the order they were sent
    pub fn commands(&self) -> Vec<u8> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                WireEvent::Command(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    /// How often `command` was sent
    pub fn count_command(&self, command: u8) -> usize {
        self.commands().iter().filter(|&&c| c == command).count()
    }

    /// Image on the simulated glass, native format
    pub fn shown(&self) -> Vec<u8> {
        self.state.borrow().shown.clone()
    }

    /// Time spent in delays
    pub fn elapsed_ms(&self) -> u64 {
        self.state.borrow().elapsed_ns / 1_000_000
    }

    /// Busy polls after each power transition or refresh
    pub fn set_busy_cycles(&self, cycles: u32) {
        self.state.borrow_mut().busy_cycles = cycles;
    }

    /// Hold the busy line low forever
    pub fn set_stuck(&self, stuck: bool) {
        self.state.borrow_mut().stuck = stuck;
    }

    /// Whether the controller accepted a deep sleep command since its last reset
    pub fn asleep(&self) -> bool {
        self.state.borrow().asleep
    }
}

/// Simulated SPI device
#[derive(Debug)]
pub struct SimSpi {
    bus: SimBus,
}

impl spi::ErrorType for SimSpi {
    type Error = Infallible;
}

impl SpiDevice for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.bus.state.borrow_mut();
        for operation in operations {
            match operation {
                Operation::Write(bytes) => state.write(bytes),
                Operation::Transfer(read, write) => {
                    state.write(write);
                    read.fill(0);
                }
                Operation::TransferInPlace(bytes) => {
                    state.write(bytes);
                    bytes.fill(0);
                }
                Operation::Read(bytes) => bytes.fill(0),
                Operation::DelayNs(ns) => state.elapsed_ns += u64::from(*ns),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinRole {
    DataCommand,
    Reset,
}

/// Simulated output pin
#[derive(Debug)]
pub struct SimPin {
    bus: SimBus,
    role: PinRole,
}

impl SimPin {
    fn set(&mut self, high: bool) {
        let mut state = self.bus.state.borrow_mut();
        match self.role {
            PinRole::DataCommand => state.dc_high = high,
            PinRole::Reset => state.reset(high),
        }
    }
}

impl digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// Simulated busy input
#[derive(Debug)]
pub struct SimBusy {
    bus: SimBus,
}

impl digital::ErrorType for SimBusy {
    type Error = Infallible;
}

impl InputPin for SimBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.bus.state.borrow_mut().sample_busy())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.bus.state.borrow_mut().sample_busy())
    }
}

/// Simulated delay
#[derive(Debug)]
pub struct SimDelay {
    bus: SimBus,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.bus.state.borrow_mut().elapsed_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.state.borrow_mut().elapsed_ns += u64::from(ms) * 1_000_000;
    }
}
