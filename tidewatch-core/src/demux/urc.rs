//! Hex payload extraction from `+MIPURC` receive notifications
//!
//! The modem reports inbound channel data as
//! `+MIPURC: "recv",<ch>,<conn>,<len>,"<HEX>"`.

/// Hex token of a receive notification, or `None` for any other line
///
/// Takes the last comma-separated field with quotes and whitespace removed.
/// If that is empty the last quoted string is used instead.
pub fn recv_hex_token(line: &str) -> Option<&str> {
    if !line.starts_with("+MIPURC") || !line.contains("recv") {
        return None;
    }

    let last_field = line
        .rsplit(',')
        .next()
        .map(|f| f.trim().trim_matches('"').trim())
        .filter(|f| !f.is_empty());

    last_field.or_else(|| last_quoted(line))
}

fn last_quoted(line: &str) -> Option<&str> {
    let end = line.rfind('"')?;
    let start = line[..end].rfind('"')?;
    let quoted = line[start + 1..end].trim();
    (!quoted.is_empty()).then_some(quoted)
}
