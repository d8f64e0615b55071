//! Structured logging with per-tag level gating.
//!
//! ```
//! use crate::logger::{self, LogTag};
//! logger::info(LogTag::Bookkeeper, "processed wallet");
//! logger::debug(LogTag::Parser, "selector 0x617ba037 matched aave_v3");
//! ```
//!
//! Call `logger::init_from_flags` once at startup (the CLI does this)
//! before any logging occurs.

mod config;
mod core;
mod format;
mod levels;
mod tags;

pub use config::init_from_flags;
pub use levels::LogLevel;
pub use tags::LogTag;

pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}
