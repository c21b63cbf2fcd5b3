// MIT License - Copyright (c) 2026 Peter Wright
// Shared test doubles

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use simplex_facp::{FacpError, PanelLink, Protocol, Result};

pub const PASSCODE: &str = "1234";

/// Scripted panel shell.
///
/// `LOGIN` prompts for the passcode, the passcode is granted unless a
/// rejection was queued, and each `CLIST` takes the next scripted reply
/// (repeating the last good one once the script runs out).
#[derive(Default)]
pub struct ScriptedPanel {
    pub logins: VecDeque<bool>,
    pub lists: VecDeque<Result<String>>,
    pub last_list: String,
    pub sent: Vec<String>,
}

impl ScriptedPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(mut self, rows: &[&str]) -> Self {
        let mut reply = String::from("CLIST\r\n");
        for row in rows {
            reply.push_str(row);
            reply.push_str("\r\n");
        }
        reply.push('-');
        self.lists.push_back(Ok(reply));
        self
    }

    pub fn fail(mut self, error: FacpError) -> Self {
        self.lists.push_back(Err(error));
        self
    }

    pub fn login_results(mut self, results: &[bool]) -> Self {
        self.logins.extend(results.iter().copied());
        self
    }

    pub fn count(&self, command: &str) -> usize {
        self.sent.iter().filter(|c| *c == command).count()
    }
}

impl PanelLink for ScriptedPanel {
    async fn exchange(&mut self, command: &str, _reply_timeout: Duration) -> Result<String> {
        self.sent.push(command.to_string());
        match command {
            "LOGIN" => Ok("LOGIN\r\nENTER PASSCODE:".to_string()),
            "LOGOUT" => Ok("LOGOUT\r\n-".to_string()),
            "CLIST" => match self.lists.pop_front() {
                Some(Ok(reply)) => {
                    self.last_list = reply.clone();
                    Ok(reply)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last_list.clone()),
            },
            _ => {
                if self.logins.pop_front().unwrap_or(true) {
                    Ok("ACCESS GRANTED\r\n-".to_string())
                } else {
                    Ok("ACCESS DENIED\r\n-".to_string())
                }
            }
        }
    }

    fn protocol(&self) -> Protocol {
        Protocol::Interactive
    }
}
