//! Embedded link configuration
//!
//! `device.toml` is compiled into the image; `build.rs` has already checked
//! it, so a parse failure here means the two parsers disagree.

use defmt::*;
use tidewatch_core::config::{parse_link_config, LinkConfig};

/// Edit device.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../device.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load() -> LinkConfig {
    match parse_link_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            warn!("device.toml rejected ({}), using defaults", e);
            LinkConfig::default()
        }
    }
}
