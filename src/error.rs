// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// All errors that can occur while talking to or monitoring the panel.
#[derive(Debug, thiserror::Error)]
pub enum FacpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Timed out waiting for {waiting_for}")]
    Timeout { waiting_for: &'static str },

    #[error("Frame truncated: expected 2 checksum bytes, got {received}")]
    Truncated { received: usize },

    #[error("Checksum mismatch (expected {expected:02X?}, got {received:02X?})")]
    ChecksumMismatch { expected: [u8; 2], received: [u8; 2] },

    #[error("Frame not acknowledged (got {received:?})")]
    NoAck { received: Option<u8> },

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Re-authentication failed after {attempts} attempts")]
    RecoveryExhausted { attempts: u32 },

    #[error("Malformed point line: {line:?}")]
    MalformedLine { line: String },

    #[error("Session is not logged in")]
    NotLoggedIn,

    #[error("Serial line disconnected")]
    Disconnected,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FacpError {
    /// Whether this error came from the link and should abort the current
    /// poll and trigger a re-login rather than end the monitor.
    pub fn is_link_error(&self) -> bool {
        matches!(
            self,
            FacpError::Io(_)
                | FacpError::Timeout { .. }
                | FacpError::Truncated { .. }
                | FacpError::ChecksumMismatch { .. }
                | FacpError::NoAck { .. }
                | FacpError::Disconnected
                | FacpError::NotLoggedIn
        )
    }

    /// Short, stable name of the error kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FacpError::Io(_) => "io",
            FacpError::Serial(_) => "serial",
            FacpError::Timeout { .. } => "timeout",
            FacpError::Truncated { .. } => "truncated",
            FacpError::ChecksumMismatch { .. } => "checksum_mismatch",
            FacpError::NoAck { .. } => "no_ack",
            FacpError::AuthenticationFailed => "authentication_failed",
            FacpError::RecoveryExhausted { .. } => "recovery_exhausted",
            FacpError::MalformedLine { .. } => "malformed_line",
            FacpError::NotLoggedIn => "not_logged_in",
            FacpError::Disconnected => "disconnected",
            FacpError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, FacpError>;
