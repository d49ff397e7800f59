//! Waveform lookup tables
//!
//! The controller drives every pixel through a sequence of up to seven
//! phases. Each phase is sent as a 6-byte descriptor:
//!
//! | byte | meaning                                                         |
//! |------|-----------------------------------------------------------------|
//! | 0    | level select, two bits per sub-phase A..D (00 GND, 01 VDH, 10 VDL, 11 float) |
//! | 1-4  | frame count of sub-phases A..D                                  |
//! | 5    | repeat count of the whole phase                                 |
//!
//! One table exists per transition (VCOM plus the four old/new pixel
//! combinations). The VCOM table carries two trailing bytes after its
//! phases, so it is 44 bytes on the wire while the others are 42.

use crate::epd4in2b::cmd::Cmd;

/// Phases per table
pub const PHASES: usize = 7;

/// One phase descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// Packed level selects for sub-phases A..D
    pub levels: u8,
    /// Frame counts for sub-phases A..D
    pub frames: [u8; 4],
    /// How often the phase is repeated
    pub repeat: u8,
}

impl Phase {
    /// Unused phase slot
    pub const IDLE: Phase = Phase::new(0x00, [0x00; 4], 0x00);

    /// Build a phase descriptor
    pub const fn new(levels: u8, frames: [u8; 4], repeat: u8) -> Self {
        Phase {
            levels,
            frames,
            repeat,
        }
    }

    /// Wire encoding
    pub const fn to_bytes(self) -> [u8; 6] {
        [
            self.levels,
            self.frames[0],
            self.frames[1],
            self.frames[2],
            self.frames[3],
            self.repeat,
        ]
    }
}

/// A complete table for one transition
pub type Table = [Phase; PHASES];

/// Which pixel transition a table controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Common electrode voltage
    Vcom,
    /// Light pixel staying light
    WhiteToWhite,
    /// Dark pixel turning light
    BlackToWhite,
    /// Light pixel turning dark
    WhiteToBlack,
    /// Dark pixel staying dark
    BlackToBlack,
}

impl Transition {
    /// Upload order expected by the controller
    pub const ALL: [Transition; 5] = [
        Transition::Vcom,
        Transition::WhiteToWhite,
        Transition::BlackToWhite,
        Transition::WhiteToBlack,
        Transition::BlackToBlack,
    ];

    /// Command that selects this table
    pub const fn command(self) -> u8 {
        match self {
            Transition::Vcom => Cmd::LUT_FOR_VCOM,
            Transition::WhiteToWhite => Cmd::LUT_WHITE_TO_WHITE,
            Transition::BlackToWhite => Cmd::LUT_BLACK_TO_WHITE,
            Transition::WhiteToBlack => Cmd::LUT_WHITE_TO_BLACK,
            Transition::BlackToBlack => Cmd::LUT_BLACK_TO_BLACK,
        }
    }

    /// Bytes sent after the select command
    pub const fn wire_len(self) -> usize {
        match self {
            Transition::Vcom => 44,
            _ => 42,
        }
    }
}

/// The three waveform sets the driver can load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Full-quality refresh with the characteristic flashing
    Standard,
    /// Single short phase, fast but prone to ghosting
    Quick,
    /// Tuned for partial windows: no flashing and little disturbance outside
    /// the window, but pixels need two passes to settle
    LowArtifact,
}

impl Waveform {
    /// Table for one transition of this waveform
    pub fn table(self, transition: Transition) -> &'static Table {
        match (self, transition) {
            (Waveform::Standard, Transition::Vcom) => &STANDARD_VCOM,
            (Waveform::Standard, Transition::WhiteToWhite) => &STANDARD_TO_WHITE,
            (Waveform::Standard, Transition::BlackToWhite) => &STANDARD_TO_WHITE,
            (Waveform::Standard, Transition::WhiteToBlack) => &STANDARD_TO_BLACK,
            (Waveform::Standard, Transition::BlackToBlack) => &STANDARD_TO_BLACK,
            (Waveform::Quick, Transition::Vcom) => &QUICK_VCOM,
            (Waveform::Quick, Transition::WhiteToWhite) => &QUICK_TO_WHITE,
            (Waveform::Quick, Transition::BlackToWhite) => &QUICK_TO_WHITE,
            (Waveform::Quick, Transition::WhiteToBlack) => &QUICK_TO_BLACK,
            (Waveform::Quick, Transition::BlackToBlack) => &QUICK_TO_BLACK,
            (Waveform::LowArtifact, Transition::Vcom) => &LOW_ARTIFACT_VCOM,
            (Waveform::LowArtifact, Transition::WhiteToWhite) => &LOW_ARTIFACT_WW,
            (Waveform::LowArtifact, Transition::BlackToWhite) => &LOW_ARTIFACT_BW,
            (Waveform::LowArtifact, Transition::WhiteToBlack) => &LOW_ARTIFACT_WB,
            (Waveform::LowArtifact, Transition::BlackToBlack) => &LOW_ARTIFACT_BB,
        }
    }

    /// Bytes to send after `transition.command()`
    pub fn encode(self, transition: Transition) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .table(transition)
            .iter()
            .flat_map(|phase| phase.to_bytes())
            .collect();
        bytes.resize(transition.wire_len(), 0x00);
        bytes
    }
}

const STANDARD_VCOM: Table = [
    Phase::new(0x40, [0x17, 0x00, 0x00, 0x00], 0x02),
    Phase::new(0x00, [0x17, 0x17, 0x00, 0x00], 0x02),
    Phase::new(0x00, [0x0A, 0x01, 0x00, 0x00], 0x01),
    Phase::new(0x00, [0x0E, 0x0E, 0x00, 0x00], 0x02),
    Phase::IDLE,
    Phase::IDLE,
    Phase::IDLE,
];

// Shared by white->white and black->white
const STANDARD_TO_WHITE: Table = [
    Phase::new(0x40, [0x17, 0x00, 0x00, 0x00], 0x02),
    Phase::new(0x90, [0x17, 0x17, 0x00, 0x00], 0x02),
    Phase::new(0x40, [0x0A, 0x01, 0x00, 0x00], 0x01),
    Phase::new(0xA0, [0x0E, 0x0E, 0x00, 0x00], 0x02),
    Phase::IDLE,
    Phase::IDLE,
    Phase::IDLE,
];

// Shared by white->black and black->black
const STANDARD_TO_BLACK: Table = [
    Phase::new(0x80, [0x17, 0x00, 0x00, 0x00], 0x02),
    Phase::new(0x90, [0x17, 0x17, 0x00, 0x00], 0x02),
    Phase::new(0x80, [0x0A, 0x01, 0x00, 0x00], 0x01),
    Phase::new(0x50, [0x0E, 0x0E, 0x00, 0x00], 0x02),
    Phase::IDLE,
    Phase::IDLE,
    Phase::IDLE,
];

const QUICK_VCOM: Table = single_phase(0x00, [0x0E, 0x00, 0x00, 0x00]);
const QUICK_TO_WHITE: Table = single_phase(0xA0, [0x0E, 0x00, 0x00, 0x00]);
const QUICK_TO_BLACK: Table = single_phase(0x50, [0x0E, 0x00, 0x00, 0x00]);

/// Sub-phase A sustains, sub-phase B drives the change
const LOW_ARTIFACT_FRAMES: [u8; 4] = [2, 45, 0x01, 0x00];

const LOW_ARTIFACT_VCOM: Table = single_phase(0x00, LOW_ARTIFACT_FRAMES);
const LOW_ARTIFACT_WW: Table = single_phase(0x80, LOW_ARTIFACT_FRAMES); // 10 00 00 00
const LOW_ARTIFACT_BW: Table = single_phase(0xA0, LOW_ARTIFACT_FRAMES); // 10 10 00 00
const LOW_ARTIFACT_WB: Table = single_phase(0x50, LOW_ARTIFACT_FRAMES); // 01 01 00 00
const LOW_ARTIFACT_BB: Table = single_phase(0x40, LOW_ARTIFACT_FRAMES); // 01 00 00 00

const fn single_phase(levels: u8, frames: [u8; 4]) -> Table {
    [
        Phase::new(levels, frames, 0x01),
        Phase::IDLE,
        Phase::IDLE,
        Phase::IDLE,
        Phase::IDLE,
        Phase::IDLE,
        Phase::IDLE,
    ]
}
