use super::schemas::Config;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

pub const CONFIG_FILE_PATH: &str = "ledger.toml";

pub fn load_config() -> Result<(), String> {
    load_config_from_path(CONFIG_FILE_PATH)
}

pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{path}': {e}"))?;
        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("failed to parse config file '{path}': {e}"))?
    } else {
        Config::default()
    };

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "config already initialized".to_string())
}

pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let lock = CONFIG
        .get()
        .expect("config not initialized; call load_config() first");
    let config = lock.read().expect("failed to acquire config read lock");
    f(&config)
}

pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.loaders.reorg_safety_margin_blocks, 50);
        assert_eq!(config.loaders.evm_page_size, 10_000);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let s = toml::to_string_pretty(&config).unwrap();
        assert!(s.contains("[database]"));
        assert!(s.contains("[rate_limits]"));
    }
}
