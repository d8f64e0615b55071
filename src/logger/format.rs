//! Plain-text log formatting: `HH:MM:SS [TAG] [LEVEL] message`, errors
//! and warnings to stderr, everything else to stdout.
use super::tags::LogTag;
use chrono::Local;
use std::io::Write;

pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let time = Local::now().format("%H:%M:%S");
    let line = format!("{time} [{}] [{log_type}] {message}", tag.as_str());

    if log_type == "ERROR" || log_type == "WARNING" {
        let _ = writeln!(std::io::stderr(), "{line}");
    } else {
        let _ = writeln!(std::io::stdout(), "{line}");
    }
}
