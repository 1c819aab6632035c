//! Link configuration
//!
//! Server address, device identity and every session timing knob. The
//! firmware embeds a TOML file and parses it with [`parse_link_config`].

pub mod parse;
pub mod types;

pub use parse::{parse_link_config, ParseError};
pub use types::*;
