//! Consumer of complete text lines from the modem

/// Receives each complete, trimmed, non-empty line exactly once
pub trait LineHandler {
    /// Handle one line received at `now_ms` (monotonic uptime)
    fn handle_line(&mut self, line: &str, now_ms: u32);
}

impl<T: LineHandler + ?Sized> LineHandler for &mut T {
    fn handle_line(&mut self, line: &str, now_ms: u32) {
        (**self).handle_line(line, now_ms);
    }
}
