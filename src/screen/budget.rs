//! Per-block partial refresh budget
//!
//! The low-artifact waveform leaves a little ghosting each time it is used.
//! Every block touched by a partial refresh is charged one unit; once any
//! block would reach the limit the refresh is upgraded to a full one and all
//! counters start over.

use crate::panel::Geometry;
use crate::screen::DirtyRect;

/// Partial refresh counters, one per 8-pixel block
#[derive(Debug)]
pub struct PartialBudget {
    geometry: Geometry,
    limit: u8,
    counters: Vec<u8>,
}

impl PartialBudget {
    /// Zeroed counters for every block of `geometry`
    pub fn new(geometry: Geometry, limit: u8) -> Self {
        PartialBudget {
            geometry,
            limit,
            counters: vec![0; geometry.block_count()],
        }
    }

    /// Partial refreshes allowed before a block forces a full refresh
    pub fn limit(&self) -> u8 {
        self.limit
    }

    /// Counter of block `index`
    pub fn count(&self, index: usize) -> u8 {
        self.counters.get(index).copied().unwrap_or(0)
    }

    /// Highest counter on the panel
    pub fn max(&self) -> u8 {
        self.counters.iter().copied().max().unwrap_or(0)
    }

    /// Block indices charged for a partial refresh of `rect`
    ///
    /// Every block in the rectangle counts, including rows and columns that
    /// did not change themselves.
    fn blocks(&self, rect: DirtyRect) -> impl Iterator<Item = usize> {
        let row_bytes = self.geometry.row_bytes();
        let cols = usize::from(rect.min_x / 8)..=usize::from(rect.max_x / 8);
        (usize::from(rect.min_y)..=usize::from(rect.max_y))
            .flat_map(move |row| cols.clone().map(move |col| row * row_bytes + col))
    }

    /// Whether charging `rect` would bring any block to the limit
    pub fn would_exhaust(&self, rect: DirtyRect) -> bool {
        self.blocks(rect)
            .any(|index| self.count(index).saturating_add(1) >= self.limit)
    }

    /// Charge one partial refresh to every block of `rect`
    pub fn charge(&mut self, rect: DirtyRect) {
        let indices: Vec<usize> = self.blocks(rect).collect();
        for index in indices {
            if let Some(counter) = self.counters.get_mut(index) {
                *counter = counter.saturating_add(1);
            }
        }
    }

    /// Start over after a full refresh
    pub fn reset(&mut self) {
        self.counters.fill(0);
    }
}
