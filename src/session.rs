// MIT License - Copyright (c) 2026 Peter Wright
// Panel session

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Passcode;
use crate::constants::{
    ACCESS_GRANTED, CMD_LOGIN, CMD_LOGOUT, CMD_POINT_LIST, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_LIST_TIMEOUT, PROMPT,
};
use crate::error::{FacpError, Result};
use crate::point::RawPoint;
use crate::transport::PanelLink;

/// Whether the panel has accepted our passcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

/// A logged-in conversation with the panel over one link.
///
/// A failed read while logged in leaves the state untouched; deciding
/// whether to re-authenticate is up to the caller.
pub struct Session<L> {
    link: L,
    state: SessionState,
    command_timeout: Duration,
    list_timeout: Duration,
}

impl<L: PanelLink> Session<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: SessionState::LoggedOut,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, command_timeout: Duration, list_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self.list_timeout = list_timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    /// Log in with `passcode`.
    ///
    /// Sends `LOGIN`, then the passcode, and succeeds if either reply
    /// contains `ACCESS GRANTED`. Returns `Ok(false)` when the panel rejects
    /// the passcode; link failures are returned as errors.
    pub async fn login(&mut self, passcode: &Passcode) -> Result<bool> {
        info!("Attempting login via {} link", self.link.protocol());
        self.state = SessionState::LoggedOut;

        let prompt = self.link.exchange(CMD_LOGIN, self.command_timeout).await?;
        debug!("Sending passcode...");
        let reply = self
            .link
            .exchange(passcode.expose(), self.command_timeout)
            .await?;

        let granted = prompt.contains(ACCESS_GRANTED) || reply.contains(ACCESS_GRANTED);
        if granted {
            self.state = SessionState::LoggedIn;
            info!("Login successful");
        } else {
            warn!("Login failed");
        }
        Ok(granted)
    }

    /// Log out. Best-effort: the state returns to logged-out even if the
    /// panel never answers.
    pub async fn logout(&mut self) -> Result<()> {
        if self.state == SessionState::LoggedOut {
            return Ok(());
        }
        self.state = SessionState::LoggedOut;
        info!("Logging out");
        self.link.exchange(CMD_LOGOUT, self.command_timeout).await?;
        Ok(())
    }

    /// Request the active point list and parse it into rows.
    pub async fn list_points(&mut self) -> Result<Vec<RawPoint>> {
        if !self.is_logged_in() {
            return Err(FacpError::NotLoggedIn);
        }
        let response = self.link.exchange(CMD_POINT_LIST, self.list_timeout).await?;
        let points = parse_point_list(&response);
        debug!("Parsed {} points from {}", points.len(), CMD_POINT_LIST);
        Ok(points)
    }

    /// Run an arbitrary command and return its raw reply.
    pub async fn command(&mut self, text: &str) -> Result<String> {
        info!("Sending command: {}", text);
        self.link.exchange(text, self.command_timeout).await
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

/// Parse point-list output into rows.
///
/// Blank lines, the bare prompt and any line echoing the list command are
/// skipped. Rows that don't split into an id and a status code are dropped
/// with a warning.
pub fn parse_point_list(response: &str) -> Vec<RawPoint> {
    let mut points = Vec::new();
    for line in response.lines() {
        let line = line.trim();
        if line.is_empty() || line.len() == 1 && line.starts_with(PROMPT) {
            continue;
        }
        if line.contains(CMD_POINT_LIST) {
            continue;
        }
        match RawPoint::parse(line) {
            Ok(point) => points.push(point),
            Err(e) => warn!("Dropping point-list row: {}", e),
        }
    }
    points
}
