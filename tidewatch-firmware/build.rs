//! Build script for tidewatch-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates device.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMING_KEYS: &[&str] = &[
    "at_timeout_ms",
    "registration_timeout_ms",
    "open_timeout_ms",
    "ready_timeout_ms",
    "status_poll_ms",
    "heartbeat_ms",
    "time_sync_ms",
    "backoff_initial_ms",
    "backoff_max_ms",
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds device.toml for its server address,         ║\n\
            ║  serial number and session timing. Create one in the             ║\n\
            ║  tidewatch-firmware directory.                                   ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in device.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_server(&config, &mut errors);
    validate_device(&config, &mut errors);
    validate_timing(&config, &mut errors);
    validate_session(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid device.toml                                      ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Only the sections the firmware parser understands are allowed
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = config.as_table() else {
        return;
    };
    for (name, value) in table {
        if !["server", "device", "timing", "session"].contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

fn validate_server(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(server) = config.get("server") else {
        return;
    };

    match server.get("host") {
        Some(toml::Value::String(host)) if host.is_empty() || host.len() > 64 => {
            errors.push("[server] host must be 1-64 characters".to_string());
        }
        Some(toml::Value::String(_)) | None => {}
        Some(_) => errors.push("[server] host must be a string".to_string()),
    }

    match server.get("port") {
        Some(toml::Value::Integer(port)) if !(1..=65535).contains(port) => {
            errors.push("[server] port must be 1-65535".to_string());
        }
        Some(toml::Value::Integer(_)) | None => {}
        Some(_) => errors.push("[server] port must be an integer".to_string()),
    }
}

fn validate_device(config: &toml::Value, errors: &mut Vec<String>) {
    match config.get("device").and_then(|d| d.get("serial")) {
        Some(toml::Value::String(serial)) => {
            if serial.len() != 12 || !serial.bytes().all(|b| b.is_ascii_graphic()) {
                errors.push("[device] serial must be 12 printable ASCII characters".to_string());
            }
        }
        Some(_) => errors.push("[device] serial must be a string".to_string()),
        None => {}
    }
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(timing) = config.get("timing") else {
        return;
    };

    for key in TIMING_KEYS {
        match timing.get(*key) {
            Some(toml::Value::Integer(ms)) if *ms < 0 || *ms > i64::from(u32::MAX) => {
                errors.push(format!("[timing] {} out of range", key));
            }
            Some(toml::Value::Integer(_)) | None => {}
            Some(_) => errors.push(format!("[timing] {} must be an integer", key)),
        }
    }

    let initial = timing.get("backoff_initial_ms").and_then(|v| v.as_integer());
    let max = timing.get("backoff_max_ms").and_then(|v| v.as_integer());
    let initial = initial.unwrap_or(2000);
    let max = max.unwrap_or(30000);
    if max < initial {
        errors.push("[timing] backoff_max_ms must be >= backoff_initial_ms".to_string());
    }
}

fn validate_session(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(value) = config.get("session").and_then(|s| s.get("wait_for_ready")) {
        if !value.is_bool() {
            errors.push("[session] wait_for_ready must be true or false".to_string());
        }
    }
}
