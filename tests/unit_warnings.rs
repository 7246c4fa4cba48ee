use std::cell::RefCell;
use std::sync::Once;

use log::{Level, Log, Metadata, Record};

use exo_payload::units::parse_unit;

thread_local! {
    static WARNINGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Collects warnings per test thread so parallel tests stay independent.
struct Capture;

impl Log for Capture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn {
            WARNINGS.with(|w| w.borrow_mut().push(record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: Capture = Capture;
static INIT: Once = Once::new();

fn warnings_from(f: impl FnOnce()) -> Vec<String> {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(log::LevelFilter::Warn);
    });
    WARNINGS.with(|w| w.borrow_mut().clear());
    f();
    WARNINGS.with(|w| w.borrow_mut().drain(..).collect())
}

#[test]
fn garbage_unit_warns_once() {
    let warnings = warnings_from(|| {
        assert!(parse_unit("furlongs").is_dimensionless());
    });
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Unrecognised physical units"));
    assert!(warnings[0].contains("furlongs"));
}

#[test]
fn empty_unit_is_silent() {
    let warnings = warnings_from(|| {
        assert!(parse_unit("").is_dimensionless());
    });
    assert!(warnings.is_empty());
}

#[test]
fn valid_unit_is_silent() {
    let warnings = warnings_from(|| {
        assert_eq!(parse_unit("K").symbol(), "K");
        assert_eq!(parse_unit("W/m**2/um").symbol(), "W/m**2/um");
    });
    assert!(warnings.is_empty());
}
