//! Minimal TOML reader for the link configuration
//!
//! Handles only what `device.toml` needs:
//! - `[server]`, `[device]`, `[timing]` and `[session]` headers
//! - `key = value` with string, integer or boolean values
//! - Comments (`# ...`), including trailing ones
//!
//! Keys that are not recognised are ignored. Missing keys keep defaults.

use heapless::String;
use tidewatch_protocol::DeviceSerial;

use super::types::LinkConfig;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// String longer than its buffer
    ValueTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Server,
    Device,
    Timing,
    Session,
}

/// Parse a configuration file, starting from [`LinkConfig::default`]
pub fn parse_link_config(input: &str) -> Result<LinkConfig, ParseError> {
    let mut config = LinkConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config)?;
    }

    if config.timing.backoff_max_ms < config.timing.backoff_initial_ms {
        return Err(ParseError::InvalidValue);
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "server" => Ok(Section::Server),
        "device" => Ok(Section::Device),
        "timing" => Ok(Section::Timing),
        "session" => Ok(Section::Session),
        _ => Err(ParseError::InvalidSection),
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Strip a trailing comment; a '#' inside a string is kept
    let value = value
        .match_indices('#')
        .find(|(pos, _)| value[..*pos].matches('"').count() % 2 == 0)
        .map_or(value, |(pos, _)| value[..pos].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut LinkConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => {}
        Section::Server => match key {
            "host" => {
                config.server_host =
                    String::try_from(parse_string(value)).map_err(|_| ParseError::ValueTooLong)?;
            }
            "port" => config.server_port = parse_int(value)?,
            _ => {}
        },
        Section::Device => {
            if key == "serial" {
                config.serial =
                    DeviceSerial::parse(parse_string(value)).ok_or(ParseError::InvalidValue)?;
            }
        }
        Section::Timing => {
            let timing = &mut config.timing;
            match key {
                "at_timeout_ms" => timing.at_timeout_ms = parse_int(value)?,
                "registration_timeout_ms" => timing.registration_timeout_ms = parse_int(value)?,
                "open_timeout_ms" => timing.open_timeout_ms = parse_int(value)?,
                "ready_timeout_ms" => timing.ready_timeout_ms = parse_int(value)?,
                "status_poll_ms" => timing.status_poll_ms = parse_int(value)?,
                "heartbeat_ms" => timing.heartbeat_ms = parse_int(value)?,
                "time_sync_ms" => timing.time_sync_ms = parse_int(value)?,
                "backoff_initial_ms" => timing.backoff_initial_ms = parse_int(value)?,
                "backoff_max_ms" => timing.backoff_max_ms = parse_int(value)?,
                _ => {}
            }
        }
        Section::Session => {
            if key == "wait_for_ready" {
                config.wait_for_ready = parse_bool(value)?;
            }
        }
    }
    Ok(())
}

/// Strip surrounding quotes if present
fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Integer with optional `_` digit separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let mut digits: String<24> = String::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).map_err(|_| ParseError::InvalidValue)?;
    }
    digits.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}
