//! Refresh engine
//!
//! [`Screen`] remembers what the panel currently shows and turns every render
//! request into the cheapest refresh that keeps the image clean:
//!
//! - nothing changed: no refresh at all
//! - the changed region covers more than half the panel: full refresh
//! - a block in the changed region has used up its partial budget: full refresh
//! - otherwise: partial refresh of the changed region's bounding rectangle

mod budget;
mod canvas;
pub mod convert;
mod frame;

pub use budget::PartialBudget;
pub use canvas::Canvas;
pub use convert::SourceBitmap;
pub use frame::{DirtyRect, FrameBuffer};

use crate::config::Config;
use crate::error::EpdError;
use crate::panel::{Geometry, Panel};

/// Why a full refresh was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullReason {
    /// More than half the panel changed
    LargeArea,
    /// A block in the changed region ran out of partial budget
    BudgetExhausted,
    /// The caller asked for it
    Forced,
}

/// What a render did to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Frame identical to the one shown, nothing sent
    Unchanged,
    /// Only the rectangle was refreshed
    Partial(DirtyRect),
    /// The whole panel was refreshed
    Full(FullReason),
}

/// Owns the panel, the frame it shows and the partial budget
pub struct Screen<P> {
    panel: P,
    geometry: Geometry,
    committed: FrameBuffer,
    budget: PartialBudget,
    hard_wipe_cycles: u8,
}

impl<P: Panel> Screen<P> {
    /// Take ownership of `panel`; assumes it currently shows an all-light frame
    pub fn new(panel: P, config: &Config) -> Self {
        let geometry = panel.geometry();
        Screen {
            panel,
            geometry,
            committed: FrameBuffer::light(geometry),
            budget: PartialBudget::new(geometry, config.partial_budget),
            hard_wipe_cycles: config.hard_wipe_cycles,
        }
    }

    /// Initialize (or re-initialize) the panel
    pub fn init(&mut self) -> Result<(), EpdError> {
        self.panel.init()
    }

    /// Panel resolution
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Frame the panel is known to show
    pub fn committed(&self) -> &FrameBuffer {
        &self.committed
    }

    /// Partial refresh counters
    pub fn budget(&self) -> &PartialBudget {
        &self.budget
    }

    /// The panel driver
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// The panel driver, mutably
    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    /// Hand the panel back
    pub fn into_panel(self) -> P {
        self.panel
    }

    /// Decide how `candidate` should reach the panel without touching anything
    pub fn plan(&self, candidate: &FrameBuffer) -> Refresh {
        let Some(rect) = self.committed.dirty_rect(candidate) else {
            return Refresh::Unchanged;
        };
        if 2 * u64::from(rect.area()) > u64::from(self.geometry.area()) {
            Refresh::Full(FullReason::LargeArea)
        } else if self.budget.would_exhaust(rect) {
            Refresh::Full(FullReason::BudgetExhausted)
        } else {
            Refresh::Partial(rect)
        }
    }

    /// Show `source`, refreshing as little as possible
    ///
    /// When the panel reports an error the committed frame and budget stay as
    /// they were, so the next render diffs against what is known to be shown.
    pub fn render(&mut self, source: &SourceBitmap<'_>) -> Result<Refresh, EpdError> {
        let candidate = convert::to_native(source, self.geometry)?;
        let refresh = self.plan(&candidate);

        match refresh {
            Refresh::Unchanged => {
                log::debug!("Not refreshing, because nothing changed");
                return Ok(refresh);
            }
            Refresh::Full(reason) => {
                log::info!("Full refresh: {:?}", reason);
                self.panel.display_frame(Some(&candidate))?;
                self.budget.reset();
            }
            Refresh::Partial(rect) => {
                log::info!(
                    "Partial refresh of {}x{} at ({}, {})",
                    rect.width(),
                    rect.height(),
                    rect.min_x,
                    rect.min_y
                );
                self.panel
                    .display_partial_frame(Some(&candidate), rect.window())?;
                self.budget.charge(rect);
            }
        }

        self.committed = candidate;
        Ok(refresh)
    }

    /// Show `source` with a full refresh regardless of what changed
    pub fn full_rerender(&mut self, source: &SourceBitmap<'_>) -> Result<Refresh, EpdError> {
        let candidate = convert::to_native(source, self.geometry)?;
        self.panel.display_frame(Some(&candidate))?;
        self.budget.reset();
        self.committed = candidate;
        Ok(Refresh::Full(FullReason::Forced))
    }

    /// Blank the panel with a full refresh
    pub fn clear(&mut self) -> Result<(), EpdError> {
        log::info!("Clearing screen");
        self.panel.clear_frame()?;
        self.panel.display_frame(None)?;
        self.committed = FrameBuffer::light(self.geometry);
        self.budget.reset();
        Ok(())
    }

    /// Repeated full clears to shake off burn-in, then a regular clear
    pub fn hard_wipe(&mut self) -> Result<(), EpdError> {
        log::info!("Hard wipe, {} cycles", self.hard_wipe_cycles);
        for _ in 0..self.hard_wipe_cycles {
            self.panel.clear_frame()?;
            self.panel.display_frame(None)?;
        }
        self.clear()
    }

    /// Put the panel to sleep; a later `init()` wakes it
    pub fn shutdown(&mut self) -> Result<(), EpdError> {
        self.panel.sleep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Window;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Init,
        Clear,
        Full(Option<Vec<u8>>),
        Partial(Window),
        Sleep,
    }

    struct Recorder {
        geometry: Geometry,
        calls: Vec<Call>,
        fail_next: bool,
    }

    impl Recorder {
        fn new(geometry: Geometry) -> Self {
            Recorder {
                geometry,
                calls: Vec::new(),
                fail_next: false,
            }
        }

        fn check(&mut self) -> Result<(), EpdError> {
            if std::mem::take(&mut self.fail_next) {
                Err(EpdError::DeviceUnresponsive { waited_ms: 10 })
            } else {
                Ok(())
            }
        }
    }

    impl Panel for Recorder {
        fn geometry(&self) -> Geometry {
            self.geometry
        }

        fn init(&mut self) -> Result<(), EpdError> {
            self.calls.push(Call::Init);
            Ok(())
        }

        fn clear_frame(&mut self) -> Result<(), EpdError> {
            self.calls.push(Call::Clear);
            Ok(())
        }

        fn display_frame(&mut self, frame: Option<&FrameBuffer>) -> Result<(), EpdError> {
            self.check()?;
            self.calls
                .push(Call::Full(frame.map(|f| f.as_bytes().to_vec())));
            Ok(())
        }

        fn display_partial_frame(
            &mut self,
            _frame: Option<&FrameBuffer>,
            window: Window,
        ) -> Result<(), EpdError> {
            self.check()?;
            self.calls.push(Call::Partial(window));
            Ok(())
        }

        fn sleep(&mut self) -> Result<(), EpdError> {
            self.calls.push(Call::Sleep);
            Ok(())
        }
    }

    const GEOMETRY: Geometry = Geometry::new(64, 16);

    fn screen() -> Screen<Recorder> {
        Screen::new(Recorder::new(GEOMETRY), &Config::default())
    }

    /// Canvas with the given 8x1 blocks inked
    fn canvas_with(blocks: &[(i32, i32)]) -> Canvas {
        use embedded_graphics::pixelcolor::BinaryColor;
        use embedded_graphics::prelude::*;
        use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

        let mut canvas = Canvas::new(GEOMETRY);
        for &(block_x, y) in blocks {
            Rectangle::new(Point::new(block_x * 8, y), Size::new(8, 1))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(&mut canvas)
                .unwrap();
        }
        canvas
    }

    #[test]
    fn blank_render_is_unchanged() {
        let mut screen = screen();
        let canvas = Canvas::new(GEOMETRY);
        assert_eq!(screen.render(&canvas.bitmap()).unwrap(), Refresh::Unchanged);
        assert!(screen.panel().calls.is_empty());
    }

    #[test]
    fn small_change_is_partial_and_commits() {
        let mut screen = screen();
        let canvas = canvas_with(&[(2, 5)]);

        let refresh = screen.render(&canvas.bitmap()).unwrap();
        let rect = DirtyRect {
            min_x: 16,
            min_y: 5,
            max_x: 23,
            max_y: 5,
        };
        assert_eq!(refresh, Refresh::Partial(rect));
        assert_eq!(
            screen.panel().calls,
            vec![Call::Partial(Window::new(16, 5, 8, 1))]
        );
        assert_eq!(screen.committed().as_bytes()[5 * 8 + 2], 0x00);
        assert_eq!(screen.budget().count(5 * 8 + 2), 1);

        // second identical render sends nothing
        assert_eq!(screen.render(&canvas.bitmap()).unwrap(), Refresh::Unchanged);
        assert_eq!(screen.panel().calls.len(), 1);
    }

    #[test]
    fn large_change_is_full_and_resets_budget() {
        let mut screen = screen();
        screen.render(&canvas_with(&[(1, 1)]).bitmap()).unwrap();
        assert_eq!(screen.budget().max(), 1);

        // opposite corners span the whole panel
        let canvas = canvas_with(&[(0, 0), (7, 15)]);
        assert_eq!(
            screen.render(&canvas.bitmap()).unwrap(),
            Refresh::Full(FullReason::LargeArea)
        );
        assert_eq!(screen.budget().max(), 0);
        assert!(matches!(screen.panel().calls.last(), Some(Call::Full(Some(_)))));
    }

    #[test]
    fn failed_refresh_keeps_committed_frame() {
        let mut screen = screen();
        screen.panel_mut().fail_next = true;
        let canvas = canvas_with(&[(1, 1)]);

        let err = screen.render(&canvas.bitmap()).unwrap_err();
        assert!(matches!(err, EpdError::DeviceUnresponsive { .. }));
        assert_eq!(screen.committed(), &FrameBuffer::light(GEOMETRY));
        assert_eq!(screen.budget().max(), 0);

        // the retry still sees the change
        assert!(matches!(
            screen.render(&canvas.bitmap()).unwrap(),
            Refresh::Partial(_)
        ));
    }

    #[test]
    fn hard_wipe_clears_repeatedly() {
        let config = Config {
            hard_wipe_cycles: 3,
            ..Config::default()
        };
        let mut screen = Screen::new(Recorder::new(GEOMETRY), &config);
        screen.render(&canvas_with(&[(3, 3)]).bitmap()).unwrap();

        screen.hard_wipe().unwrap();
        let calls = &screen.panel().calls;
        let clears = calls.iter().filter(|c| **c == Call::Clear).count();
        let blank_fulls = calls.iter().filter(|c| **c == Call::Full(None)).count();
        assert_eq!((clears, blank_fulls), (4, 4));
        assert_eq!(screen.committed(), &FrameBuffer::light(GEOMETRY));
        assert_eq!(screen.budget().max(), 0);
    }

    #[test]
    fn full_rerender_and_shutdown() {
        let mut screen = screen();
        screen.init().unwrap();
        let canvas = canvas_with(&[(4, 4)]);
        assert_eq!(
            screen.full_rerender(&canvas.bitmap()).unwrap(),
            Refresh::Full(FullReason::Forced)
        );
        assert_eq!(screen.render(&canvas.bitmap()).unwrap(), Refresh::Unchanged);
        screen.shutdown().unwrap();

        let calls = screen.into_panel().calls;
        assert_eq!(calls.first(), Some(&Call::Init));
        assert_eq!(calls.last(), Some(&Call::Sleep));
        assert_eq!(calls.len(), 3);
    }
}
