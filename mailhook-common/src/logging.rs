//! Log setup and the direction-tagged logging macros.
//!
//! Every event carries a `direction` field:
//! - `incoming`: what peers sent us (SMTP commands, webhook responses)
//! - `outgoing`: what we sent to peers (SMTP replies, webhook requests)
//! - `internal`: everything else
//!
//! The macros default to `TRACE`; pass `level = INFO` (etc.) as the first
//! argument to override it.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::Targets, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable holding the maximum level shown
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[doc(hidden)]
#[macro_export]
macro_rules! log {
    ($level:ident, $direction:literal, $($arg:tt)+) => {
        $crate::tracing::event!(
            $crate::tracing::Level::$level,
            direction = $direction,
            $($arg)+
        )
    };
}

#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($level, "outgoing", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::log!(TRACE, "outgoing", $($arg)+)
    };
}

#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($level, "incoming", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::log!(TRACE, "incoming", $($arg)+)
    };
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($level, "internal", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::log!(TRACE, "internal", $($arg)+)
    };
}

/// `TRACE` in debug builds, `INFO` otherwise
const fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    }
}

/// Parse a `LOG_LEVEL` value, falling back to `default` when it is unset or invalid.
fn parse_level(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value.map_or(default, |level| {
        LevelFilter::from_str(level.trim()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    })
}

/// Only events from our own crates, up to `level`
fn targets(level: LevelFilter) -> Targets {
    Targets::new().with_target("mailhook", level)
}

/// Install the global subscriber.
///
/// Calling this again is a no-op.
pub fn init() {
    let level = parse_level(
        std::env::var(LOG_LEVEL_ENV).ok().as_deref(),
        default_level(),
    );

    let _ = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(targets(level)),
        )
        .try_init();
}
