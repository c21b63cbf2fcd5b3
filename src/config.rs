// MIT License - Copyright (c) 2026 Peter Wright
// Monitor configuration

use std::fmt;
use std::time::Duration;

use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_LIST_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL,
    DEFAULT_RETRY_DELAY,
};
use crate::monitor::RetryPolicy;
use crate::transport::{Protocol, SerialSettings};

/// The panel login passcode.
///
/// `Debug` and `Display` never print the value, so the passcode can sit in
/// config structs that get logged.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Passcode(String);

impl Passcode {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self(passcode.into())
    }

    /// The raw passcode, for sending to the panel only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(***)")
    }
}

impl fmt::Display for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<String> for Passcode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Passcode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Everything needed to connect to the panel and run the monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Serial line parameters
    pub serial: SerialSettings,
    /// Wire protocol spoken on the port
    pub protocol: Protocol,
    /// Login passcode (never logged)
    pub passcode: Passcode,
    /// Delay between point-list polls
    pub poll_interval: Duration,
    /// Idle timeout for ordinary commands (LOGIN, passcode, generic commands)
    pub command_timeout: Duration,
    /// Idle timeout for the point list
    pub list_timeout: Duration,
    /// Maximum re-login attempts after a failed poll
    pub max_retries: u32,
    /// Base delay between re-login attempts (doubles per attempt)
    pub retry_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let protocol = Protocol::default();
        Self {
            serial: SerialSettings {
                parity: protocol.default_parity(),
                ..SerialSettings::default()
            },
            protocol,
            passcode: Passcode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            list_timeout: DEFAULT_LIST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl MonitorConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Retry policy for re-authentication after a failed poll.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }
}

/// Builder for MonitorConfig.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
    parity_set: bool,
}

impl MonitorConfigBuilder {
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.serial.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.serial.baud_rate = baud_rate;
        self
    }

    pub fn parity(mut self, parity: crate::transport::Parity) -> Self {
        self.config.serial.parity = parity;
        self.parity_set = true;
        self
    }

    pub fn data_bits(mut self, bits: crate::transport::DataBits) -> Self {
        self.config.serial.data_bits = bits;
        self
    }

    pub fn stop_bits(mut self, bits: crate::transport::StopBits) -> Self {
        self.config.serial.stop_bits = bits;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.serial.read_timeout = timeout;
        self
    }

    /// Set the protocol. Unless parity was set explicitly, parity follows
    /// the protocol's convention (even for framed, none for interactive).
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.config.protocol = protocol;
        self
    }

    pub fn passcode(mut self, passcode: impl Into<Passcode>) -> Self {
        self.config.passcode = passcode.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    pub fn list_timeout(mut self, timeout: Duration) -> Self {
        self.config.list_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn build(mut self) -> MonitorConfig {
        if !self.parity_set {
            self.config.serial.parity = self.config.protocol.default_parity();
        }
        self.config
    }
}
