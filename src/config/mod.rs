//! Typed, TOML-backed configuration for the ambient operator knobs
//! (database path, rate-limit budgets, provider keys, retry counts).
//!
//! The VND/USD rate and the VND exemption threshold are deliberately
//! *not* part of this global-config pattern: per the tax engine's
//! design, they are threaded explicitly through `TaxEngine::new` —
//! see `crate::tax::TaxConfig`. Reaching for `with_config` inside the
//! tax engine would reintroduce the module-level configuration this
//! crate is built to avoid.

#[macro_use]
mod macros;

pub mod schemas;
mod utils;

pub use schemas::{Config, DatabaseConfig, LoaderConfig, PriceProviderConfig, RateLimitConfig};
pub use utils::{is_config_initialized, load_config, load_config_from_path, with_config, CONFIG};
