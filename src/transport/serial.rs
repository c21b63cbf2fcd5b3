// MIT License - Copyright (c) 2026 Peter Wright
// Serial port settings

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info};

use crate::constants::DEFAULT_READ_TIMEOUT;
use crate::error::{FacpError, Result};

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = FacpError;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            other => Err(FacpError::Config(format!("invalid data bits: {other}"))),
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = FacpError;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(FacpError::Config(format!("invalid stop bits: {other}"))),
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

impl FromStr for Parity {
    type Err = FacpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(FacpError::Config(format!("invalid parity: {other}"))),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Odd => "odd",
            Self::Even => "even",
        })
    }
}

/// Serial line parameters for the panel port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port path (e.g. "/dev/ttyUSB0" on Linux, "COM1" on Windows)
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    /// Per-byte read timeout
    pub read_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 19200,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SerialSettings {
    /// Open the port with these settings.
    pub fn open(&self) -> Result<SerialStream> {
        debug!(
            port = %self.port,
            baud_rate = self.baud_rate,
            parity = %self.parity,
            data_bits = ?self.data_bits,
            stop_bits = ?self.stop_bits,
            "Opening serial port"
        );

        let stream = tokio_serial::new(&self.port, self.baud_rate)
            .parity(self.parity.into())
            .data_bits(self.data_bits.into())
            .stop_bits(self.stop_bits.into())
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(self.read_timeout)
            .open_native_async()
            .map_err(|e| {
                error!(port = %self.port, error = %e, "Failed to open serial port");
                FacpError::Serial(e)
            })?;

        info!(port = %self.port, baud_rate = self.baud_rate, "Serial connection established");
        Ok(stream)
    }
}
