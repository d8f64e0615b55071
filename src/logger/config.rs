/// Runtime logger configuration: minimum level, per-tag debug/verbose
/// flags, and an optional tag allowlist.
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub debug_tags: HashMap<String, bool>,
    pub verbose_tags: HashMap<String, bool>,
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashMap::new(),
            verbose_tags: HashMap::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<Arc<RwLock<LoggerConfig>>> =
    Lazy::new(|| Arc::new(RwLock::new(LoggerConfig::default())));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// Initialize from parsed CLI flags rather than scanning `env::args()`
/// directly — the CLI layer owns argument parsing via `clap`.
pub fn init_from_flags(verbose: bool, quiet: bool, debug_tags: &[String], verbose_tags: &[String]) {
    let mut config = LoggerConfig::default();
    for tag in debug_tags {
        config.debug_tags.insert(tag.clone(), true);
    }
    for tag in verbose_tags {
        config.verbose_tags.insert(tag.clone(), true);
    }
    if verbose {
        config.min_level = LogLevel::Verbose;
    }
    if quiet {
        config.min_level = LogLevel::Warning;
    }
    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .debug_tags
        .get(&tag.to_debug_key())
        .copied()
        .unwrap_or(false)
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .verbose_tags
        .get(&tag.to_debug_key())
        .copied()
        .unwrap_or(false)
}
