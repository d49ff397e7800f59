use embedded_graphics::image::{Image, ImageRaw};
use embedded_graphics::mono_font::iso_8859_15::{FONT_10X20, FONT_5X8};
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::{prelude::*, text::Text};

use epaper_agenda::epd4in2b::pins::Pins;
use epaper_agenda::{Canvas, Geometry};

// Splash image packed at build time, empty when splash.png was missing
const SPLASH_IMAGE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/splash.bin"));

/// Draw the agenda header with the given date and time
fn draw_agenda(canvas: &mut Canvas, date: &str, time: &str) -> anyhow::Result<()> {
    canvas.clear(BinaryColor::Off)?;

    let label_style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
    Text::new("Today", Point::new(10, 12), label_style).draw(canvas)?;

    let text_style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(BinaryColor::On) // On = dark pixels
        .build();
    Text::new(date, Point::new(10, 36), text_style).draw(canvas)?;
    Text::new(time, Point::new(300, 36), text_style).draw(canvas)?;

    let width = canvas.size().width as i32;
    Line::new(Point::new(0, 44), Point::new(width - 1, 44))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 2))
        .draw(canvas)?;
    Ok(())
}

/// Draw the build-time splash image, returns false when none was embedded
fn draw_splash(canvas: &mut Canvas, geometry: Geometry) -> anyhow::Result<bool> {
    if SPLASH_IMAGE.len() != geometry.block_count() {
        log::warn!(
            "Splash image not available ({} bytes embedded), skipping",
            SPLASH_IMAGE.len()
        );
        return Ok(false);
    }

    canvas.clear(BinaryColor::Off)?;
    let raw = ImageRaw::<BinaryColor>::new(SPLASH_IMAGE, u32::from(geometry.width()));
    Image::new(&raw, Point::zero()).draw(canvas)?;
    Ok(true)
}

fn log_pin_map() {
    log::info!(
        "Panel wiring: CS {} DC {} RST {} BUSY {} SCK {} MOSI {} POWER {}",
        Pins::CS,
        Pins::DC,
        Pins::RST,
        Pins::BSY,
        Pins::SCK,
        Pins::MOSI,
        Pins::POWER
    );
}

#[cfg(target_os = "espidf")]
mod device {
    use std::time::Duration;

    use esp_idf_svc::hal::delay::Delay;
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::hal::spi;

    use epaper_agenda::epd4in2b::pins::Pins;
    use epaper_agenda::epd4in2b::{Epd4in2b, GEOMETRY};
    use epaper_agenda::{Canvas, Config, EpdError, Refresh, Screen};

    /// Read the local date (YYYY-MM-DD) and time (HH:MM) from the RTC
    fn local_time() -> (String, String) {
        use core::mem::MaybeUninit;
        use esp_idf_svc::sys::{localtime_r, time, time_t, tm};

        unsafe {
            let mut now: time_t = 0;
            time(&mut now as *mut _);

            let mut timeinfo = MaybeUninit::<tm>::uninit();
            localtime_r(&now as *const _, timeinfo.as_mut_ptr());
            let timeinfo = timeinfo.assume_init();

            // tm_year is years since 1900, tm_mon is 0-11
            (
                format!(
                    "{:04}-{:02}-{:02}",
                    1900 + timeinfo.tm_year,
                    1 + timeinfo.tm_mon,
                    timeinfo.tm_mday
                ),
                format!("{:02}:{:02}", timeinfo.tm_hour, timeinfo.tm_min),
            )
        }
    }

    fn bus_unavailable(what: &str, err: impl core::fmt::Debug) -> EpdError {
        log::error!("Could not acquire {}: {:?}", what, err);
        EpdError::BusUnavailable
    }

    // https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
    pub fn run() -> anyhow::Result<()> {
        // It is necessary to call this function once. Otherwise some patches to the runtime
        // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
        esp_idf_svc::sys::link_patches();

        // Bind the log crate to the ESP Logging facilities
        esp_idf_svc::log::EspLogger::initialize_default();

        let config = Config::from_build_env();
        log::info!("Starting with {:?}", config);
        super::log_pin_map();

        let peripherals = Peripherals::take().map_err(|e| bus_unavailable("peripherals", e))?;
        let pins = peripherals.pins;

        // Mode 0 and MSB first are the esp-idf-hal defaults, chip select is active low
        log::info!("Configuring SPI");
        let driver = spi::SpiDeviceDriver::new_single(
            peripherals.spi2,
            pins.gpio12,                    // SCK - Pins::SCK
            pins.gpio11,                    // MOSI - Pins::MOSI
            Option::<gpio::AnyIOPin>::None, // No MISO needed for display
            Some(pins.gpio45),              // CS - Pins::CS
            &spi::SpiDriverConfig::new().dma(spi::Dma::Disabled),
            &spi::SpiConfig::new().baudrate(2.MHz().into()),
        )
        .map_err(|e| bus_unavailable("SPI device", e))?;

        log::info!("Enabling display power (pin {})", Pins::POWER);
        let mut power_pin =
            gpio::PinDriver::output(pins.gpio7).map_err(|e| bus_unavailable("power pin", e))?;
        power_pin
            .set_high()
            .map_err(|e| bus_unavailable("power pin", e))?;

        let delay = Delay::default();
        delay.delay_ms(100); // Wait for power to stabilize

        let epd = Epd4in2b::new(
            driver,
            gpio::PinDriver::input(pins.gpio48).map_err(|e| bus_unavailable("busy pin", e))?, // Pins::BSY
            gpio::PinDriver::output(pins.gpio46).map_err(|e| bus_unavailable("dc pin", e))?, // Pins::DC
            gpio::PinDriver::output(pins.gpio47).map_err(|e| bus_unavailable("rst pin", e))?, // Pins::RST
            delay,
        )
        .with_busy_wait(config.busy_wait());

        let mut screen = Screen::new(epd, &config);
        screen.init()?;
        screen.hard_wipe()?;

        let mut canvas = Canvas::new(GEOMETRY);
        if super::draw_splash(&mut canvas, GEOMETRY)? {
            screen.full_rerender(&canvas.bitmap())?;
            std::thread::sleep(Duration::from_secs(config.refresh_interval_secs));
        }

        loop {
            let (date, time) = local_time();
            super::draw_agenda(&mut canvas, &date, &time)?;

            match screen.render(&canvas.bitmap()) {
                Ok(Refresh::Unchanged) => {}
                Ok(refresh) => log::info!("{} {} shown ({:?})", date, time, refresh),
                Err(EpdError::DeviceUnresponsive { waited_ms }) => {
                    log::warn!("Panel stuck for {} ms, re-initializing", waited_ms);
                    screen.init()?;
                    screen.full_rerender(&canvas.bitmap())?;
                }
                Err(e) => return Err(e.into()),
            }

            std::thread::sleep(Duration::from_secs(config.refresh_interval_secs));
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    device::run()
}

/// Dry run against the simulated panel
///
/// Renders a few minutes of agenda updates, checks that the simulated glass
/// ends up showing the committed frame and puts the panel to sleep.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use epaper_agenda::epd4in2b::{cmd::Cmd, GEOMETRY};
    use epaper_agenda::sim::SimBus;
    use epaper_agenda::{Config, Refresh, Screen};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_build_env();
    log::info!("Dry run with {:?}", config);
    log_pin_map();

    let bus = SimBus::new(GEOMETRY);
    let epd = bus.driver().with_busy_wait(config.busy_wait());
    let mut screen = Screen::new(epd, &config);
    screen.init()?;
    screen.hard_wipe()?;

    let mut canvas = Canvas::new(GEOMETRY);
    if draw_splash(&mut canvas, GEOMETRY)? {
        screen.full_rerender(&canvas.bitmap())?;
    }

    let (mut partial, mut full) = (0, 0);
    for minute in 0..12 {
        let time = format!("08:{:02}", minute);
        draw_agenda(&mut canvas, "2026-10-16", &time)?;
        match screen.render(&canvas.bitmap())? {
            Refresh::Unchanged => {}
            Refresh::Partial(_) => partial += 1,
            Refresh::Full(_) => full += 1,
        }
    }

    anyhow::ensure!(
        bus.shown() == screen.committed().as_bytes(),
        "simulated panel does not show the committed frame"
    );

    screen.shutdown()?;
    anyhow::ensure!(bus.asleep(), "simulated panel did not enter deep sleep");

    log::info!(
        "Dry run done: {} partial and {} full refreshes, {} refresh commands, {} ms of panel time",
        partial,
        full,
        bus.count_command(Cmd::DISPLAY_REFRESH),
        bus.elapsed_ms()
    );
    Ok(())
}
