// MIT License - Copyright (c) 2026 Peter Wright
// Panel links

pub mod framed;
pub mod interactive;
pub mod serial;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FacpError, Result};

pub use framed::FramedLink;
pub use interactive::InteractiveLink;
pub use serial::{DataBits, Parity, SerialSettings, StopBits};

/// Which wire protocol the panel speaks on this port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Human-oriented command shell terminated by the `-` prompt.
    #[default]
    Interactive,
    /// Checksummed BEGIN/END frames with ACK handshake.
    Framed,
}

impl Protocol {
    /// Parity conventionally used by each protocol variant.
    pub fn default_parity(&self) -> Parity {
        match self {
            Self::Interactive => Parity::None,
            Self::Framed => Parity::Even,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Framed => "framed",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = FacpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "interactive" | "terminal" => Ok(Self::Interactive),
            "framed" => Ok(Self::Framed),
            other => Err(FacpError::Config(format!("unknown protocol: {other}"))),
        }
    }
}

/// A command/response channel to the panel.
///
/// The session issues every command through this trait, so it runs
/// unchanged over either protocol variant. Only one exchange may be in
/// flight at a time.
#[allow(async_fn_in_trait)]
pub trait PanelLink {
    /// Send one command and return the panel's reply.
    ///
    /// `reply_timeout` bounds how long the reply may stay idle; links with
    /// their own per-byte deadlines may ignore it.
    async fn exchange(&mut self, command: &str, reply_timeout: Duration) -> Result<String>;

    fn protocol(&self) -> Protocol;
}
