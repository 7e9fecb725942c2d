//! Log capture for unit tests.
//!
//! Records are kept per thread, so tests running in parallel only see what
//! their own thread logged.

use log::{Level, Log, Metadata, Record};
use std::cell::RefCell;
use std::sync::Once;

static INSTALL: Once = Once::new();
static LOGGER: CaptureLogger = CaptureLogger;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| records.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

/// Install the capture logger (once per process) and clear this thread's buffer.
pub(crate) fn capture_logs() {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("another logger is already installed");
        log::set_max_level(log::LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Drain everything this thread logged since the last call.
pub(crate) fn take_logs() -> Vec<(Level, String)> {
    RECORDS.with(|records| records.borrow_mut().drain(..).collect())
}

/// Number of captured records at `level` whose message starts with `prefix`.
pub(crate) fn count(records: &[(Level, String)], level: Level, prefix: &str) -> usize {
    records
        .iter()
        .filter(|(l, message)| *l == level && message.starts_with(prefix))
        .count()
}
