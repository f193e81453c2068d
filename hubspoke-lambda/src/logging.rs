//! Logger setup for the Lambda process

use hubspoke_core::config::{ConfigNotice, LogLevel};

/// Install the process-wide logger and report configuration diagnostics
///
/// Lambda captures stderr into CloudWatch, which timestamps each line, so
/// only the level and target are printed. Returns false if a logger was
/// already installed; the existing one stays in place.
pub fn init(level: LogLevel, notices: &[ConfigNotice]) -> bool {
    let installed = match env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .format_timestamp(None)
        .format_target(true)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Logger already initialized, keeping it: {}", e);
            false
        }
    };

    for notice in notices {
        notice.emit();
    }
    installed
}
