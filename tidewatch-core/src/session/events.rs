//! Classification of modem text lines

/// A line from the modem, reduced to what the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemEvent {
    /// `+MATREADY`
    Ready,
    /// `OK`
    Ok,
    /// `ERROR` or `+CME ERROR: <n>`
    Error,
    /// `+CEREG: <n>,<stat>` or `+CEREG: <stat>`
    Registration { stat: Option<u8> },
    /// `+MIPOPEN: <ch>,<code>`
    ChannelOpen {
        channel: Option<u8>,
        code: Option<u16>,
    },
    /// `+MIPCLOSE...`
    ChannelClosed,
    /// `+MIPSTATE...`
    ChannelState { connected: bool },
    /// `+MIPURC: "disconn",...`
    Disconnected,
    /// `+MIPURC: "recv",...`
    DataReceived,
    /// Echoes, intermediate results and anything unknown
    Other,
}

impl ModemEvent {
    /// Classify one trimmed line
    pub fn parse(line: &str) -> Self {
        match line {
            "OK" => return ModemEvent::Ok,
            "ERROR" => return ModemEvent::Error,
            _ => {}
        }

        let Some((prefix, rest)) = split_response(line) else {
            return ModemEvent::Other;
        };

        match prefix {
            "MATREADY" => ModemEvent::Ready,
            "CME ERROR" => ModemEvent::Error,
            "CEREG" => {
                let mut fields = fields(rest);
                let first = fields.next();
                let stat = fields.next().or(first).and_then(|f| f.parse().ok());
                ModemEvent::Registration { stat }
            }
            "MIPOPEN" => {
                let mut fields = fields(rest);
                let channel = fields.next().and_then(|f| f.parse().ok());
                let code = fields.next().and_then(|f| f.parse().ok());
                ModemEvent::ChannelOpen { channel, code }
            }
            "MIPCLOSE" => ModemEvent::ChannelClosed,
            "MIPSTATE" => ModemEvent::ChannelState {
                connected: fields(rest).any(|f| f == "CONNECTED"),
            },
            "MIPURC" => match fields(rest).next() {
                Some("disconn") => ModemEvent::Disconnected,
                Some("recv") => ModemEvent::DataReceived,
                _ => ModemEvent::Other,
            },
            _ => ModemEvent::Other,
        }
    }

    /// Channel open reported success
    pub fn is_open_success(&self) -> bool {
        matches!(self, ModemEvent::ChannelOpen { code: Some(0), .. })
    }
}

/// Split `+PREFIX: rest` into `("PREFIX", "rest")`
///
/// A bare `+PREFIX` yields an empty rest.
fn split_response(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('+')?;
    match body.find(':') {
        Some(pos) => Some((body[..pos].trim(), body[pos + 1..].trim())),
        None => Some((body.trim(), "")),
    }
}

/// Comma-separated fields with whitespace and quotes stripped
fn fields<'a>(rest: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    rest.split(',')
        .map(|f| f.trim().trim_matches('"'))
        .filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_results() {
        assert_eq!(ModemEvent::parse("OK"), ModemEvent::Ok);
        assert_eq!(ModemEvent::parse("ERROR"), ModemEvent::Error);
        assert_eq!(ModemEvent::parse("+CME ERROR: 50"), ModemEvent::Error);
        // substring matches are not results
        assert_eq!(ModemEvent::parse("BOOK"), ModemEvent::Other);
        assert_eq!(ModemEvent::parse("AT+CEREG?"), ModemEvent::Other);
    }

    #[test]
    fn test_registration() {
        assert_eq!(
            ModemEvent::parse("+CEREG: 0,1"),
            ModemEvent::Registration { stat: Some(1) }
        );
        assert_eq!(
            ModemEvent::parse("+CEREG: 2,5,\"1A2B\",\"01C2D3E4\",7"),
            ModemEvent::Registration { stat: Some(5) }
        );
        assert_eq!(
            ModemEvent::parse("+CEREG: 2"),
            ModemEvent::Registration { stat: Some(2) }
        );
        assert_eq!(
            ModemEvent::parse("+CEREG:"),
            ModemEvent::Registration { stat: None }
        );
    }

    #[test]
    fn test_channel_open() {
        let ok = ModemEvent::parse("+MIPOPEN: 0,0");
        assert_eq!(
            ok,
            ModemEvent::ChannelOpen {
                channel: Some(0),
                code: Some(0)
            }
        );
        assert!(ok.is_open_success());
        assert!(!ModemEvent::parse("+MIPOPEN: 0,563").is_open_success());
        assert!(!ModemEvent::parse("+MIPOPEN: 0").is_open_success());
    }

    #[test]
    fn test_channel_state_exact_match() {
        assert_eq!(
            ModemEvent::parse("+MIPSTATE: 0,\"TCP\",\"47.104.5.75\",9909,\"CONNECTED\""),
            ModemEvent::ChannelState { connected: true }
        );
        assert_eq!(
            ModemEvent::parse("+MIPSTATE: 0,\"TCP\",\"47.104.5.75\",9909,\"DISCONNECTED\""),
            ModemEvent::ChannelState { connected: false }
        );
        assert_eq!(
            ModemEvent::parse("+MIPSTATE: 0"),
            ModemEvent::ChannelState { connected: false }
        );
    }

    #[test]
    fn test_notifications() {
        assert_eq!(ModemEvent::parse("+MATREADY"), ModemEvent::Ready);
        assert_eq!(ModemEvent::parse("+MIPCLOSE: 0"), ModemEvent::ChannelClosed);
        assert_eq!(ModemEvent::parse("+MIPCLOSE"), ModemEvent::ChannelClosed);
        assert_eq!(
            ModemEvent::parse("+MIPURC: \"disconn\",0,1"),
            ModemEvent::Disconnected
        );
        assert_eq!(
            ModemEvent::parse("+MIPURC: \"recv\",0,0,2,\"2452\""),
            ModemEvent::DataReceived
        );
        assert_eq!(ModemEvent::parse("+CSQ: 20,99"), ModemEvent::Other);
    }
}
