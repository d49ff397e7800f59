//! Runtime tunables
//!
//! Defaults match the 4.2" panel. The device has no environment at runtime,
//! so overrides are baked in at build time:
//!
//! ```text
//! EPD_PARTIAL_BUDGET=6 EPD_BUSY_TIMEOUT_MS=30000 cargo build --release
//! ```

use std::str::FromStr;

use crate::epd4in2b::BusyWait;

/// Tunables for the panel driver and the refresh engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Partial refreshes a block may take before a full refresh is forced
    pub partial_budget: u8,
    /// Ceiling on a single busy wait
    pub busy_timeout_ms: u32,
    /// Busy line poll interval
    pub busy_poll_ms: u32,
    /// Clear cycles run by a hard wipe
    pub hard_wipe_cycles: u8,
    /// Time between two renders of the agenda
    pub refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            partial_budget: 10,
            busy_timeout_ms: 15_000,
            busy_poll_ms: 1,
            hard_wipe_cycles: 9,
            refresh_interval_secs: 10,
        }
    }
}

impl Config {
    /// Defaults with any `EPD_*` overrides present at build time
    pub fn from_build_env() -> Self {
        let mut config = Config::default();
        override_with(
            &mut config.partial_budget,
            "EPD_PARTIAL_BUDGET",
            option_env!("EPD_PARTIAL_BUDGET"),
            true,
        );
        override_with(
            &mut config.busy_timeout_ms,
            "EPD_BUSY_TIMEOUT_MS",
            option_env!("EPD_BUSY_TIMEOUT_MS"),
            false,
        );
        override_with(
            &mut config.busy_poll_ms,
            "EPD_BUSY_POLL_MS",
            option_env!("EPD_BUSY_POLL_MS"),
            true,
        );
        override_with(
            &mut config.hard_wipe_cycles,
            "EPD_HARD_WIPE_CYCLES",
            option_env!("EPD_HARD_WIPE_CYCLES"),
            false,
        );
        override_with(
            &mut config.refresh_interval_secs,
            "EPD_REFRESH_INTERVAL_SECS",
            option_env!("EPD_REFRESH_INTERVAL_SECS"),
            false,
        );
        config
    }

    /// Busy wait policy for the driver
    pub fn busy_wait(&self) -> BusyWait {
        BusyWait {
            timeout_ms: self.busy_timeout_ms,
            poll_ms: self.busy_poll_ms,
        }
    }
}

/// Replace `slot` with the parsed `raw` value, keeping the default otherwise
///
/// With `reject_zero` a zero value is refused as well.
fn override_with<T>(slot: &mut T, name: &str, raw: Option<&str>, reject_zero: bool)
where
    T: FromStr + Default + PartialEq + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if reject_zero && value == T::default() => {
            log::warn!("{} must not be zero, keeping {}", name, slot)
        }
        Ok(value) => {
            log::info!("{} = {} (was {})", name, value, slot);
            *slot = value;
        }
        Err(_) => log::warn!("{} = {:?} is not a valid number, keeping {}", name, raw, slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_parses_and_rejects() {
        let mut budget: u8 = 10;
        override_with(&mut budget, "EPD_PARTIAL_BUDGET", Some(" 4 "), true);
        assert_eq!(budget, 4);

        override_with(&mut budget, "EPD_PARTIAL_BUDGET", Some("0"), true);
        assert_eq!(budget, 4);

        override_with(&mut budget, "EPD_PARTIAL_BUDGET", Some("lots"), true);
        assert_eq!(budget, 4);

        override_with(&mut budget, "EPD_PARTIAL_BUDGET", None, true);
        assert_eq!(budget, 4);
    }

    #[test]
    fn zero_wipe_cycles_is_accepted() {
        let mut cycles: u8 = 9;
        override_with(&mut cycles, "EPD_HARD_WIPE_CYCLES", Some("0"), false);
        assert_eq!(cycles, 0);

        let mut poll_ms: u32 = 1;
        override_with(&mut poll_ms, "EPD_BUSY_POLL_MS", Some("0"), true);
        assert_eq!(poll_ms, 1);
    }

    #[test]
    fn busy_wait_from_config() {
        let config = Config {
            busy_timeout_ms: 500,
            busy_poll_ms: 5,
            ..Config::default()
        };
        assert_eq!(
            config.busy_wait(),
            BusyWait {
                timeout_ms: 500,
                poll_ms: 5
            }
        );
    }
}
