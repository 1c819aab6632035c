//! Session driver
//!
//! All behavior is a function of the current state and either a modem
//! line ([`Session::handle_event`]) or the passage of time
//! ([`Session::tick`]).

use tidewatch_protocol::{
    wire_wrap, MonitorEvent, Packet, RealtimeMonitorData, StartupStatus, CMD_HEARTBEAT,
    CMD_TIME_SYNC,
};

use super::events::ModemEvent;
use super::state::{RetryAction, SessionState};
use crate::config::LinkConfig;
use crate::timer::{Backoff, Deadline, PendingRetry, RetryScheduler};
use crate::traits::{CommandDispatcher, LineHandler, ModemError};

/// Modem bring-up and channel keeper
#[derive(Debug)]
pub struct Session<D> {
    dispatcher: D,
    config: LinkConfig,
    state: SessionState,
    /// Reply deadline for the command in flight
    action_deadline: Deadline,
    retry: RetryScheduler<RetryAction>,
    channel_connected: bool,
    next_status_poll: Deadline,
    next_heartbeat: Deadline,
    next_time_sync: Deadline,
    last_error: Option<ModemError>,
}

impl<D: CommandDispatcher> Session<D> {
    pub fn new(dispatcher: D, config: LinkConfig) -> Self {
        let backoff = Backoff::new(
            config.timing.backoff_initial_ms,
            config.timing.backoff_max_ms,
        );
        Self {
            dispatcher,
            config,
            state: SessionState::Idle,
            action_deadline: Deadline::disarmed(),
            retry: RetryScheduler::new(backoff),
            channel_connected: false,
            next_status_poll: Deadline::disarmed(),
            next_heartbeat: Deadline::disarmed(),
            next_time_sync: Deadline::disarmed(),
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the data channel is known to be up
    pub fn is_connected(&self) -> bool {
        self.channel_connected
    }

    pub fn backoff_ms(&self) -> u32 {
        self.retry.backoff_ms()
    }

    pub fn pending_retry(&self) -> Option<PendingRetry<RetryAction>> {
        self.retry.pending()
    }

    /// Reply deadline of the command in flight, if any
    pub fn action_deadline(&self) -> Option<u32> {
        self.action_deadline.at()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Most recent command write failure, cleared on read
    pub fn take_error(&mut self) -> Option<ModemError> {
        self.last_error.take()
    }

    /// Advance timers: a due retry fires first, then the current state's
    /// timeout or periodic work runs
    pub fn tick(&mut self, now: u32) {
        if let Some(action) = self.retry.tick(now) {
            self.run_retry(action, now);
        }

        let timing = self.config.timing;
        match self.state {
            SessionState::Idle => {
                if self.config.wait_for_ready {
                    self.state = SessionState::WaitReady;
                    self.action_deadline.arm(now, timing.ready_timeout_ms);
                } else {
                    self.start_probe(now);
                }
            }
            SessionState::WaitReady => {
                if self.action_deadline.take_expired(now) {
                    self.start_probe(now);
                }
            }
            SessionState::Probing => {
                if self.action_deadline.take_expired(now) {
                    self.retry.schedule_with_backoff(RetryAction::Probe, now);
                }
            }
            SessionState::CheckingRegistration => {
                if self.action_deadline.take_expired(now) {
                    self.retry
                        .schedule_with_backoff(RetryAction::QueryRegistration, now);
                }
            }
            SessionState::ConfiguringEncoding => {
                if self.action_deadline.take_expired(now) {
                    self.close_channel(now);
                }
            }
            SessionState::ClosingChannel => {
                if self.action_deadline.take_expired(now) {
                    self.open_channel(now);
                }
            }
            SessionState::OpeningChannel => {
                if self.action_deadline.take_expired(now) {
                    self.open_failed(now);
                }
            }
            SessionState::Monitoring => self.monitor(now),
        }
    }

    /// React to one classified modem line
    pub fn handle_event(&mut self, event: ModemEvent, now: u32) {
        use ModemEvent::*;
        use SessionState::*;

        if event == Disconnected {
            self.channel_connected = false;
            if self.state == Monitoring {
                self.lose_channel(now);
            }
            return;
        }

        match (self.state, event) {
            (WaitReady, Ready) => self.start_probe(now),

            (Probing, Ok) => {
                self.retry.reset_backoff();
                self.retry.cancel();
                self.query_registration(now);
            }

            (CheckingRegistration, Registration { stat: Some(1 | 5) }) => {
                self.retry.cancel();
                self.configure_encoding(now);
            }

            // ERROR here means the setting is already applied or unsupported
            (ConfiguringEncoding, Ok | Error) => self.close_channel(now),

            // Closing a channel that is not open reports ERROR
            (ClosingChannel, Ok | Error | ChannelClosed) => self.open_channel(now),

            (OpeningChannel, ChannelOpen { .. }) if event.is_open_success() => {
                self.enter_monitoring(now)
            }
            (OpeningChannel, ChannelOpen { .. } | Error) => self.open_failed(now),

            (Monitoring, ChannelState { connected: true }) => self.channel_connected = true,
            (Monitoring, ChannelState { connected: false }) => {
                self.channel_connected = false;
                self.lose_channel(now);
            }

            _ => {}
        }
    }

    /// Send a heartbeat frame
    pub fn send_heartbeat(&mut self) -> Result<(), ModemError> {
        let packet = Packet::empty(self.config.serial, CMD_HEARTBEAT);
        self.send_packet(&packet)
    }

    /// Ask the platform for the current time
    pub fn send_time_sync_request(&mut self) -> Result<(), ModemError> {
        let packet = Packet::empty(self.config.serial, CMD_TIME_SYNC);
        self.send_packet(&packet)
    }

    pub fn send_realtime_data(&mut self, data: &RealtimeMonitorData) -> Result<(), ModemError> {
        let packet = data.to_packet(self.config.serial)?;
        self.send_packet(&packet)
    }

    /// Upload a monitor event; the image is truncated to the protocol limit
    ///
    /// The payload, the encoded packet and its hex text are all held at once,
    /// roughly four times the image size. Callers must size the heap for the
    /// largest image they pass in.
    pub fn send_monitor_event(&mut self, event: &MonitorEvent<'_>) -> Result<(), ModemError> {
        let packet = event.to_packet(self.config.serial)?;
        self.send_packet(&packet)
    }

    pub fn send_startup_status(&mut self, status: &StartupStatus) -> Result<(), ModemError> {
        let packet = status.to_packet(self.config.serial)?;
        self.send_packet(&packet)
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), ModemError> {
        if !self.channel_connected {
            return Err(ModemError::ChannelDown);
        }
        let command = wire_wrap(&packet.encode());
        self.dispatcher.send_wrapped(&command)
    }

    fn run_retry(&mut self, action: RetryAction, now: u32) {
        match action {
            RetryAction::Probe => self.start_probe(now),
            RetryAction::QueryRegistration => self.query_registration(now),
            RetryAction::OpenChannel => self.open_channel(now),
        }
    }

    fn monitor(&mut self, now: u32) {
        let timing = self.config.timing;

        // A pending reopen makes the poll pointless
        if !self.retry.is_pending() && self.next_status_poll.expired(now) {
            let result = self.dispatcher.poll_channel_state();
            self.record(result);
            self.next_status_poll.arm(now, timing.status_poll_ms);
        }

        if !self.channel_connected {
            return;
        }

        if self.next_heartbeat.expired(now) {
            let result = self.send_heartbeat();
            self.record(result);
            self.next_heartbeat.arm(now, timing.heartbeat_ms);
        }

        if self.next_time_sync.expired(now) {
            let result = self.send_time_sync_request();
            self.record(result);
            self.next_time_sync.arm(now, timing.time_sync_ms);
        }
    }

    fn start_probe(&mut self, now: u32) {
        let result = self.dispatcher.probe();
        self.enter(SessionState::Probing, now, self.config.timing.at_timeout_ms, result);
    }

    fn query_registration(&mut self, now: u32) {
        let result = self.dispatcher.query_registration();
        let timeout = self.config.timing.registration_timeout_ms;
        self.enter(SessionState::CheckingRegistration, now, timeout, result);
    }

    fn configure_encoding(&mut self, now: u32) {
        let result = self.dispatcher.configure_encoding();
        let timeout = self.config.timing.at_timeout_ms;
        self.enter(SessionState::ConfiguringEncoding, now, timeout, result);
    }

    fn close_channel(&mut self, now: u32) {
        let result = self.dispatcher.close_channel();
        let timeout = self.config.timing.at_timeout_ms;
        self.enter(SessionState::ClosingChannel, now, timeout, result);
    }

    fn open_channel(&mut self, now: u32) {
        let result = self
            .dispatcher
            .open_channel(&self.config.server_host, self.config.server_port);
        let timeout = self.config.timing.open_timeout_ms;
        self.enter(SessionState::OpeningChannel, now, timeout, result);
    }

    /// Move to `state` with a reply deadline for the command just written
    fn enter(
        &mut self,
        state: SessionState,
        now: u32,
        timeout_ms: u32,
        result: Result<(), ModemError>,
    ) {
        self.record(result);
        self.state = state;
        self.action_deadline.arm(now, timeout_ms);
    }

    fn enter_monitoring(&mut self, now: u32) {
        let timing = self.config.timing;

        self.state = SessionState::Monitoring;
        self.action_deadline.disarm();
        self.channel_connected = true;
        self.retry.reset_backoff();
        self.retry.cancel();

        self.next_status_poll.arm(now, timing.status_poll_ms);
        self.next_heartbeat.arm(now, timing.heartbeat_ms);
        // Sync the clock right away on every (re)connect
        self.next_time_sync.arm(now, 0);
    }

    fn open_failed(&mut self, now: u32) {
        self.channel_connected = false;
        self.action_deadline.disarm();
        self.retry.schedule_with_backoff(RetryAction::OpenChannel, now);
    }

    /// Channel dropped while monitoring: stay put until the reopen fires
    fn lose_channel(&mut self, now: u32) {
        if !self.retry.is_pending() {
            self.retry.schedule_with_backoff(RetryAction::OpenChannel, now);
        }
    }

    fn record(&mut self, result: Result<(), ModemError>) {
        if let Err(err) = result {
            self.last_error = Some(err);
        }
    }
}

impl<D: CommandDispatcher> LineHandler for Session<D> {
    fn handle_line(&mut self, line: &str, now_ms: u32) {
        self.handle_event(ModemEvent::parse(line), now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    /// Records each command by name
    #[derive(Default)]
    struct Script {
        sent: Vec<String>,
    }

    impl Script {
        fn take(&mut self) -> Vec<String> {
            core::mem::take(&mut self.sent)
        }
    }

    impl CommandDispatcher for Script {
        fn probe(&mut self) -> Result<(), ModemError> {
            self.sent.push("AT".to_string());
            Ok(())
        }
        fn query_registration(&mut self) -> Result<(), ModemError> {
            self.sent.push("CEREG".to_string());
            Ok(())
        }
        fn configure_encoding(&mut self) -> Result<(), ModemError> {
            self.sent.push("MIPCFG".to_string());
            Ok(())
        }
        fn close_channel(&mut self) -> Result<(), ModemError> {
            self.sent.push("MIPCLOSE".to_string());
            Ok(())
        }
        fn open_channel(&mut self, _host: &str, _port: u16) -> Result<(), ModemError> {
            self.sent.push("MIPOPEN".to_string());
            Ok(())
        }
        fn poll_channel_state(&mut self) -> Result<(), ModemError> {
            self.sent.push("MIPSTATE".to_string());
            Ok(())
        }
        fn send_wrapped(&mut self, command: &str) -> Result<(), ModemError> {
            self.sent.push(command.to_string());
            Ok(())
        }
    }

    fn session() -> Session<Script> {
        Session::new(Script::default(), LinkConfig::default())
    }

    fn feed(s: &mut Session<Script>, lines: &[&str], now: u32) {
        for line in lines {
            s.handle_line(line, now);
        }
    }

    fn connected_session(now: u32) -> Session<Script> {
        let mut s = session();
        s.tick(now);
        feed(
            &mut s,
            &["OK", "+CEREG: 0,1", "OK", "OK", "+MIPOPEN: 0,0"],
            now,
        );
        assert_eq!(s.state(), SessionState::Monitoring);
        s.dispatcher_mut().take();
        s
    }

    #[test]
    fn test_first_tick_probes() {
        let mut s = session();
        assert_eq!(s.state(), SessionState::Idle);
        s.tick(0);
        assert_eq!(s.state(), SessionState::Probing);
        assert_eq!(s.dispatcher_mut().take(), ["AT"]);
    }

    #[test]
    fn test_wait_ready_entry() {
        let config = LinkConfig {
            wait_for_ready: true,
            ..LinkConfig::default()
        };
        let mut s = Session::new(Script::default(), config);
        s.tick(0);
        assert_eq!(s.state(), SessionState::WaitReady);
        assert!(s.dispatcher().sent.is_empty());

        s.handle_line("+MATREADY", 100);
        assert_eq!(s.state(), SessionState::Probing);
        assert_eq!(s.dispatcher_mut().take(), ["AT"]);
    }

    #[test]
    fn test_wait_ready_falls_back_to_probe() {
        let config = LinkConfig {
            wait_for_ready: true,
            ..LinkConfig::default()
        };
        let mut s = Session::new(Script::default(), config);
        s.tick(0);
        s.tick(4999);
        assert_eq!(s.state(), SessionState::WaitReady);
        s.tick(5000);
        assert_eq!(s.state(), SessionState::Probing);
    }

    #[test]
    fn test_bring_up_sequence() {
        let mut s = session();
        s.tick(0);
        feed(&mut s, &["OK"], 10);
        assert_eq!(s.state(), SessionState::CheckingRegistration);
        feed(&mut s, &["+CEREG: 0,2"], 20);
        assert_eq!(s.state(), SessionState::CheckingRegistration);
        feed(&mut s, &["+CEREG: 0,5"], 30);
        assert_eq!(s.state(), SessionState::ConfiguringEncoding);
        feed(&mut s, &["ERROR"], 40);
        assert_eq!(s.state(), SessionState::ClosingChannel);
        feed(&mut s, &["ERROR"], 50);
        assert_eq!(s.state(), SessionState::OpeningChannel);
        feed(&mut s, &["+MIPOPEN: 0,0"], 60);

        assert_eq!(s.state(), SessionState::Monitoring);
        assert!(s.is_connected());
        assert_eq!(
            s.dispatcher_mut().take(),
            ["AT", "CEREG", "MIPCFG", "MIPCLOSE", "MIPOPEN"]
        );
    }

    #[test]
    fn test_probe_timeout_retries_once() {
        let mut s = session();
        s.tick(0);
        s.tick(3000);
        assert_eq!(s.backoff_ms(), 4000);
        assert_eq!(
            s.pending_retry(),
            Some(PendingRetry {
                action: RetryAction::Probe,
                not_before: 7000
            })
        );

        // Repeated ticks do not grow the backoff again
        s.tick(3050);
        s.tick(6999);
        assert_eq!(s.backoff_ms(), 4000);
        assert_eq!(s.dispatcher_mut().take(), ["AT"]);

        s.tick(7000);
        assert_eq!(s.dispatcher_mut().take(), ["AT"]);
        assert_eq!(s.pending_retry(), None);
        assert_eq!(s.action_deadline(), Some(10_000));
    }

    #[test]
    fn test_late_reply_cancels_retry() {
        let mut s = session();
        s.tick(0);
        s.tick(3000);
        assert!(s.pending_retry().is_some());

        s.handle_line("OK", 3500);
        assert_eq!(s.pending_retry(), None);
        assert_eq!(s.backoff_ms(), 2000);
        s.tick(7000);
        assert_eq!(s.state(), SessionState::CheckingRegistration);
    }

    #[test]
    fn test_registration_timeout() {
        let mut s = session();
        s.tick(0);
        s.handle_line("OK", 0);
        s.tick(7999);
        assert!(s.pending_retry().is_none());
        s.tick(8000);
        assert_eq!(
            s.pending_retry().map(|p| p.action),
            Some(RetryAction::QueryRegistration)
        );
    }

    #[test]
    fn test_encoding_and_close_timeouts_proceed() {
        let mut s = session();
        s.tick(0);
        feed(&mut s, &["OK", "+CEREG: 0,1"], 0);
        s.tick(3000);
        assert_eq!(s.state(), SessionState::ClosingChannel);
        s.tick(6000);
        assert_eq!(s.state(), SessionState::OpeningChannel);
        assert_eq!(s.backoff_ms(), 2000);
    }

    #[test]
    fn test_open_failure_schedules_reopen() {
        let mut s = session();
        s.tick(0);
        feed(&mut s, &["OK", "+CEREG: 0,1", "OK", "OK"], 0);
        assert_eq!(s.state(), SessionState::OpeningChannel);

        s.handle_line("+MIPOPEN: 0,1", 1000);
        assert!(!s.is_connected());
        assert_eq!(s.backoff_ms(), 4000);
        let retry = s.pending_retry().unwrap();
        assert_eq!(retry.action, RetryAction::OpenChannel);
        assert!(retry.not_before >= 1000 + 4000);

        s.dispatcher_mut().take();
        s.tick(5000);
        assert_eq!(s.dispatcher_mut().take(), ["MIPOPEN"]);
    }

    #[test]
    fn test_open_timeout() {
        let mut s = session();
        s.tick(0);
        feed(&mut s, &["OK", "+CEREG: 0,1", "OK", "OK"], 0);
        s.tick(15_000);
        assert_eq!(s.backoff_ms(), 4000);
        s.tick(16_000);
        assert_eq!(s.backoff_ms(), 4000);
    }

    #[test]
    fn test_connect_forces_time_sync() {
        let mut s = connected_session(100);
        s.tick(100);

        let sent = s.dispatcher_mut().take();
        assert_eq!(sent.len(), 1);
        // $ R 0000 ... command 0x0001
        assert!(sent[0].starts_with("AT+MIPSEND=0,0,2452"));
        assert!(sent[0].ends_with("\r\n"));
    }

    #[test]
    fn test_periodic_traffic() {
        let mut s = connected_session(0);
        s.tick(0);
        s.dispatcher_mut().take();

        s.tick(10_000);
        assert_eq!(s.dispatcher_mut().take(), ["MIPSTATE"]);

        s.tick(30_000);
        let sent = s.dispatcher_mut().take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "MIPSTATE");
        assert!(sent[1].starts_with("AT+MIPSEND"));

        s.tick(30_001);
        assert!(s.dispatcher_mut().take().is_empty());
    }

    #[test]
    fn test_disconnected_poll_schedules_reopen() {
        let mut s = connected_session(0);
        s.handle_line("+MIPSTATE: 0,\"TCP\",\"47.104.5.75\",9909,\"DISCONNECTED\"", 500);

        assert!(!s.is_connected());
        assert_eq!(s.state(), SessionState::Monitoring);
        assert_eq!(s.backoff_ms(), 4000);

        // no heartbeat, time sync or poll while waiting
        s.tick(4499);
        assert!(s.dispatcher_mut().take().is_empty());

        s.tick(4500);
        assert_eq!(s.state(), SessionState::OpeningChannel);
        assert_eq!(s.dispatcher_mut().take(), ["MIPOPEN"]);
    }

    #[test]
    fn test_disconnect_urc_any_state() {
        let mut s = connected_session(0);
        s.handle_line("+MIPURC: \"disconn\",0,1", 100);
        assert!(!s.is_connected());
        assert_eq!(
            s.pending_retry().map(|p| p.action),
            Some(RetryAction::OpenChannel)
        );

        // a second disconnect does not stack backoff
        s.handle_line("+MIPURC: \"disconn\",0,1", 200);
        assert_eq!(s.backoff_ms(), 4000);

        let mut s = session();
        s.tick(0);
        s.handle_line("+MIPURC: \"disconn\",0,1", 0);
        assert_eq!(s.state(), SessionState::Probing);
        assert!(s.pending_retry().is_none());
    }

    #[test]
    fn test_reconnect_cancels_pending_reopen() {
        let mut s = connected_session(0);
        s.handle_line("+MIPURC: \"disconn\",0,1", 0);
        s.tick(4000);
        assert_eq!(s.state(), SessionState::OpeningChannel);

        s.handle_line("+MIPOPEN: 0,0", 4100);
        assert!(s.is_connected());
        assert_eq!(s.backoff_ms(), 2000);
        assert_eq!(s.pending_retry(), None);
    }

    #[test]
    fn test_senders_need_channel() {
        let mut s = session();
        assert_eq!(s.send_heartbeat(), Err(ModemError::ChannelDown));
        assert_eq!(
            s.send_startup_status(&StartupStatus::default()),
            Err(ModemError::ChannelDown)
        );

        let mut s = connected_session(0);
        assert_eq!(s.send_realtime_data(&RealtimeMonitorData::default()), Ok(()));
        let sent = s.dispatcher_mut().take();
        // header (21) + crc (2) + payload (15) + crc (2), two hex chars each
        assert_eq!(sent[0].len(), "AT+MIPSEND=0,0,".len() + 40 * 2 + 2);
    }

    #[test]
    fn test_dispatcher_error_recorded() {
        struct Broken;
        impl CommandDispatcher for Broken {
            fn probe(&mut self) -> Result<(), ModemError> {
                Err(ModemError::Write)
            }
            fn query_registration(&mut self) -> Result<(), ModemError> {
                Ok(())
            }
            fn configure_encoding(&mut self) -> Result<(), ModemError> {
                Ok(())
            }
            fn close_channel(&mut self) -> Result<(), ModemError> {
                Ok(())
            }
            fn open_channel(&mut self, _host: &str, _port: u16) -> Result<(), ModemError> {
                Ok(())
            }
            fn poll_channel_state(&mut self) -> Result<(), ModemError> {
                Ok(())
            }
            fn send_wrapped(&mut self, _command: &str) -> Result<(), ModemError> {
                Ok(())
            }
        }

        let mut s = Session::new(Broken, LinkConfig::default());
        s.tick(0);
        // the reply deadline still covers the failed write
        assert_eq!(s.state(), SessionState::Probing);
        assert_eq!(s.take_error(), Some(ModemError::Write));
        assert_eq!(s.take_error(), None);
        s.tick(3000);
        assert!(s.pending_retry().is_some());
    }
}
