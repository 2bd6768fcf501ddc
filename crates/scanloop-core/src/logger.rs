//! Stderr logger for the capture loop.
//!
//! Lines look like `[  1.234s DEBUG scanloop-decode scanloop_decode] message`:
//! elapsed time, level, emitting thread and crate. The thread name is what
//! tells the control loop and the decode worker apart.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::Uptime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Environment variable read by [`level_from_env`].
pub const LOG_ENV: &str = "SCANLOOP_LOG";

struct ThreadLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for ThreadLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let thread = std::thread::current();
        let crate_name = crate_of(record.target());
        let mut out = std::io::stderr().lock();
        let _ = writeln!(
            out,
            "[{:7.3}s {:>5} {} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            thread.name().unwrap_or("-"),
            crate_name,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Leading path segment of a `log` target.
fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

static LOGGER: OnceLock<ThreadLogger> = OnceLock::new();

/// Install the logger with the provided level filter.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| ThreadLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Level named by `SCANLOOP_LOG` (`off`, `error` .. `trace`), or `default`
/// when unset or unparsable.
pub fn level_from_env(default: LevelFilter) -> LevelFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(default)
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`, or by
/// `SCANLOOP_LOG` when `RUST_LOG` is unset (default `info`).
///
/// Decode spans are reported when they close, which is where the worker's
/// per-frame timing shows up. `json` switches to one object per line.
/// Events from the `log` facade are bridged in as well.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let directive = std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let output: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_names(true)
            .with_timer(Uptime::default())
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
    {
        log::debug!("tracing subscriber already installed: {err}");
    }
}
