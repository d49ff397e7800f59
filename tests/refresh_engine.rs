//! Integration test: refresh engine driving the simulated panel end to end
//!
//! Draws on a canvas, renders through the screen and checks both the chosen
//! refresh and what the simulated glass ends up showing.
//!
//! Does NOT require physical hardware.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

use epaper_agenda::epd4in2b::{cmd::Cmd, flag::Flag};
use epaper_agenda::epd4in2b::{BusyWait, DriverState, Epd4in2b, GEOMETRY};
use epaper_agenda::sim::{SimBus, SimBusy, SimDelay, SimPin, SimSpi};
use epaper_agenda::{Canvas, Config, EpdError, FullReason, Refresh, Screen};

type SimScreen = Screen<Epd4in2b<SimSpi, SimBusy, SimPin, SimPin, SimDelay>>;

fn screen_on(bus: &SimBus, config: &Config) -> SimScreen {
    let mut screen = Screen::new(bus.driver().with_busy_wait(config.busy_wait()), config);
    screen.init().unwrap();
    screen
}

fn fill(canvas: &mut Canvas, x: i32, y: i32, width: u32, height: u32, color: BinaryColor) {
    Rectangle::new(Point::new(x, y), Size::new(width, height))
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(canvas)
        .unwrap();
}

#[test]
fn unchanged_canvas_sends_nothing() {
    let bus = SimBus::new(GEOMETRY);
    let mut screen = screen_on(&bus, &Config::default());
    bus.clear_events();

    let canvas = Canvas::new(GEOMETRY);
    assert_eq!(screen.render(&canvas.bitmap()).unwrap(), Refresh::Unchanged);
    assert!(bus.events().is_empty());
}

#[test]
fn small_change_is_partial_and_shown() {
    let bus = SimBus::new(GEOMETRY);
    let mut screen = screen_on(&bus, &Config::default());

    let mut canvas = Canvas::new(GEOMETRY);
    fill(&mut canvas, 100, 50, 20, 10, BinaryColor::On);

    let refresh = screen.render(&canvas.bitmap()).unwrap();
    let Refresh::Partial(rect) = refresh else {
        panic!("expected a partial refresh, got {refresh:?}");
    };
    // 100..=119 widens to whole bytes 96..=119
    assert_eq!((rect.min_x, rect.max_x), (96, 119));
    assert_eq!((rect.min_y, rect.max_y), (50, 59));
    assert_eq!(bus.count_command(Cmd::PARTIAL_IN), 1);
    assert_eq!(bus.shown(), screen.committed().as_bytes());

    // same canvas again
    bus.clear_events();
    assert_eq!(screen.render(&canvas.bitmap()).unwrap(), Refresh::Unchanged);
    assert!(bus.events().is_empty());
}

#[test]
fn dirty_area_threshold_at_half_the_panel() {
    let bus = SimBus::new(GEOMETRY);
    let mut screen = screen_on(&bus, &Config::default());

    // 400 x 153 rows is 51% of the panel
    let mut canvas = Canvas::new(GEOMETRY);
    fill(&mut canvas, 0, 0, 400, 1, BinaryColor::On);
    fill(&mut canvas, 0, 152, 8, 1, BinaryColor::On);
    assert_eq!(
        screen.render(&canvas.bitmap()).unwrap(),
        Refresh::Full(FullReason::LargeArea)
    );
    assert_eq!(bus.count_command(Cmd::PARTIAL_IN), 0);
    assert_eq!(bus.shown(), screen.committed().as_bytes());

    // 400 x 147 rows is 49%
    let bus = SimBus::new(GEOMETRY);
    let mut screen = screen_on(&bus, &Config::default());
    let mut canvas = Canvas::new(GEOMETRY);
    fill(&mut canvas, 0, 0, 400, 1, BinaryColor::On);
    fill(&mut canvas, 0, 146, 8, 1, BinaryColor::On);
    assert!(matches!(
        screen.render(&canvas.bitmap()).unwrap(),
        Refresh::Partial(_)
    ));
    assert_eq!(bus.shown(), screen.committed().as_bytes());
}

#[test]
fn repeated_partials_escalate_to_full() {
    let bus = SimBus::new(GEOMETRY);
    let config = Config::default();
    let mut screen = screen_on(&bus, &config);

    let mut canvas = Canvas::new(GEOMETRY);
    for i in 0..config.partial_budget {
        // toggle one block so every render changes it
        let color = if i % 2 == 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        };
        fill(&mut canvas, 200, 100, 8, 1, color);
        let refresh = screen.render(&canvas.bitmap()).unwrap();

        if i + 1 < config.partial_budget {
            assert!(matches!(refresh, Refresh::Partial(_)), "render {i}: {refresh:?}");
        } else {
            assert_eq!(refresh, Refresh::Full(FullReason::BudgetExhausted));
        }
        assert_eq!(bus.shown(), screen.committed().as_bytes());
    }
    assert_eq!(screen.budget().max(), 0);

    // counters start over after the full refresh
    fill(&mut canvas, 200, 100, 8, 1, BinaryColor::On);
    assert!(matches!(
        screen.render(&canvas.bitmap()).unwrap(),
        Refresh::Partial(_)
    ));
    assert_eq!(screen.budget().max(), 1);
}

#[test]
fn stuck_panel_keeps_committed_frame_until_recovered() {
    let bus = SimBus::new(GEOMETRY);
    // long enough for the busy cycles after power on, only a stuck line trips it
    let config = Config {
        busy_timeout_ms: 50,
        busy_poll_ms: 10,
        ..Config::default()
    };
    let mut screen = screen_on(&bus, &config);
    assert_eq!(screen.panel().state(), DriverState::Ready);

    let mut canvas = Canvas::new(GEOMETRY);
    fill(&mut canvas, 16, 16, 16, 16, BinaryColor::On);

    bus.set_stuck(true);
    let err = screen.render(&canvas.bitmap()).unwrap_err();
    assert!(matches!(err, EpdError::DeviceUnresponsive { waited_ms: 50 }));
    assert_eq!(screen.panel().state(), DriverState::Busy);
    assert!(screen.committed().as_bytes().iter().all(|&b| b == 0xFF));
    assert_eq!(screen.budget().max(), 0);

    bus.set_stuck(false);
    screen.init().unwrap();
    assert!(matches!(
        screen.render(&canvas.bitmap()).unwrap(),
        Refresh::Partial(_)
    ));
    assert_eq!(bus.shown(), screen.committed().as_bytes());
}

#[test]
fn hard_wipe_then_clear_and_sleep() {
    let bus = SimBus::new(GEOMETRY);
    let config = Config {
        hard_wipe_cycles: 2,
        ..Config::default()
    };
    let mut screen = screen_on(&bus, &config);

    let mut canvas = Canvas::new(GEOMETRY);
    fill(&mut canvas, 0, 0, 400, 300, BinaryColor::On);
    assert_eq!(
        screen.full_rerender(&canvas.bitmap()).unwrap(),
        Refresh::Full(FullReason::Forced)
    );
    assert!(bus.shown().iter().all(|&b| b == Flag::ALL_DARK));

    bus.clear_events();
    screen.hard_wipe().unwrap();
    // two wipe cycles plus the final clear
    assert_eq!(bus.count_command(Cmd::DISPLAY_REFRESH), 3);
    assert_eq!(bus.count_command(Cmd::RESOLUTION_SETTING), 3);
    assert!(bus.shown().iter().all(|&b| b == Flag::ALL_LIGHT));

    screen.shutdown().unwrap();
    assert!(bus.asleep());
    let epd = screen.into_panel();
    assert_eq!(epd.state(), DriverState::Asleep);
}

#[test]
fn busy_wait_comes_from_config() {
    let config = Config {
        busy_timeout_ms: 250,
        busy_poll_ms: 25,
        ..Config::default()
    };
    assert_eq!(
        config.busy_wait(),
        BusyWait {
            timeout_ms: 250,
            poll_ms: 25
        }
    );
}
