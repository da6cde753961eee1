use chrono::Local;
use log::LevelFilter;
use simplelog::*;
use std::fs::File;

/// Map a textual level to the log filter; anything else is a configuration
/// error and fails immediately.
fn parse_level(loglevel: &str) -> LevelFilter {
    match loglevel {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => panic!(
            "loglevel must be debug/info/warn/error/off, got '{}'",
            loglevel
        ),
    }
}

/// Console logger. Safe to call more than once (a global logger can only be
/// installed once, later calls are no-ops).
pub fn init_console_logger(loglevel: &str) {
    let level = parse_level(loglevel);
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

/// Console plus a date-stamped log file in the working directory.
pub fn init_combined_logger(loglevel: &str) {
    let level = parse_level(loglevel);
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let name = format!("log_{}.txt", date_and_time);
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Ok(file) = File::create(&name) {
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    let _ = CombinedLogger::init(loggers);
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_console_logger("info");
        init_console_logger("debug");
    }

    #[test]
    #[should_panic(expected = "loglevel must be")]
    fn test_unknown_level_rejected() {
        init_console_logger("verbose");
    }
}
