// MIT License - Copyright (c) 2026 Peter Wright
// Interactive command shell link

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

use crate::constants::{CR, PROMPT, SETTLE_INTERVAL};
use crate::error::{FacpError, Result};
use crate::transport::{PanelLink, Protocol};

/// Link to the panel's human-oriented command shell.
///
/// The shell has no framing or length header: a reply is taken as complete
/// once it ends in the `-` prompt and the line then stays quiet for the
/// settle interval. A panel that pauses mid-reply for longer than that will
/// have its reply cut short; this is a known limitation of prompt scraping.
pub struct InteractiveLink<S> {
    stream: S,
    settle_interval: Duration,
}

impl<S> InteractiveLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            settle_interval: SETTLE_INTERVAL,
        }
    }

    pub fn with_settle_interval(mut self, settle_interval: Duration) -> Self {
        self.settle_interval = settle_interval;
        self
    }

    /// Send `text` followed by a carriage return and capture the reply.
    ///
    /// Every received byte restarts the `idle_timeout` deadline. Capture is
    /// best-effort: if the line goes idle before the prompt appears, whatever
    /// arrived so far (possibly nothing) is returned. Only a failed write or
    /// a closed line is an error.
    pub async fn send_command(&mut self, text: &str, idle_timeout: Duration) -> Result<String> {
        let discarded = self.clear_input().await?;
        if discarded > 0 {
            debug!("Discarded {} stale bytes before command", discarded);
        }

        let mut line = Vec::with_capacity(text.len() + 1);
        line.extend_from_slice(text.as_bytes());
        line.push(CR);
        self.stream.write_all(&line).await?;
        self.stream.flush().await?;
        debug!("Command sent ({} bytes)", line.len());

        let started = Instant::now();
        let response = self.read_response(idle_timeout).await?;
        debug!(
            "Response received in {:.2}s ({} chars)",
            started.elapsed().as_secs_f64(),
            response.len()
        );
        Ok(response)
    }

    async fn read_response(&mut self, idle_timeout: Duration) -> Result<String> {
        let mut response = String::new();
        let mut buf = [0u8; 256];

        loop {
            let wait = if response.trim_end().ends_with(PROMPT) {
                self.settle_interval
            } else {
                idle_timeout
            };

            match timeout(wait, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    if response.is_empty() {
                        return Err(FacpError::Disconnected);
                    }
                    break;
                }
                // The shell speaks an 8-bit code page; map bytes 1:1 onto chars.
                Ok(Ok(n)) => response.extend(buf[..n].iter().map(|&b| char::from(b))),
                Ok(Err(e)) => return Err(FacpError::Io(e)),
                Err(_) => break,
            }
        }

        Ok(response)
    }

    /// Drop anything already buffered from the panel without waiting.
    async fn clear_input(&mut self) -> Result<usize> {
        let mut buf = [0u8; 256];
        let mut discarded = 0;
        loop {
            match timeout(Duration::ZERO, self.stream.read(&mut buf)).await {
                Ok(Ok(0)) | Err(_) => return Ok(discarded),
                Ok(Ok(n)) => discarded += n,
                Ok(Err(e)) => return Err(FacpError::Io(e)),
            }
        }
    }
}

impl<S> PanelLink for InteractiveLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn exchange(&mut self, command: &str, reply_timeout: Duration) -> Result<String> {
        self.send_command(command, reply_timeout).await
    }

    fn protocol(&self) -> Protocol {
        Protocol::Interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    const IDLE: Duration = Duration::from_millis(200);

    fn link() -> (InteractiveLink<DuplexStream>, DuplexStream) {
        let (ours, panel) = duplex(4096);
        let link = InteractiveLink::new(ours).with_settle_interval(Duration::from_millis(30));
        (link, panel)
    }

    async fn read_command(panel: &mut DuplexStream) -> String {
        let mut received = Vec::new();
        loop {
            let byte = panel.read_u8().await.unwrap();
            if byte == CR {
                return String::from_utf8(received).unwrap();
            }
            received.push(byte);
        }
    }

    #[tokio::test]
    async fn test_command_terminated_with_cr_and_reply_captured() {
        let (mut link, mut panel) = link();

        let fake_panel = tokio::spawn(async move {
            assert_eq!(read_command(&mut panel).await, "CTIME");
            panel.write_all(b"CTIME\r\n12:00:00\r\n-").await.unwrap();
            panel
        });

        let response = link.send_command("CTIME", IDLE).await.unwrap();
        assert_eq!(response, "CTIME\r\n12:00:00\r\n-");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_reply_split_across_writes_is_joined() {
        let (mut link, mut panel) = link();

        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(b"A1 F11\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            panel.write_all(b"P2 T01\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            panel.write_all(b"-").await.unwrap();
            panel
        });

        let response = link.send_command("CLIST", IDLE).await.unwrap();
        assert_eq!(response, "A1 F11\r\nP2 T01\r\n-");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_pause_after_dash_cuts_reply_short() {
        // Known limitation: a line ending in '-' followed by a pause longer
        // than the settle interval looks exactly like the prompt.
        let (mut link, mut panel) = link();

        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(b"A1 F1-\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(120)).await;
            panel.write_all(b"P2 T0-\r\n-").await.unwrap();
            panel
        });

        let response = link.send_command("CLIST", IDLE).await.unwrap();
        assert_eq!(response, "A1 F1-\r\n");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_dash_inside_reply_waits_for_settle() {
        let (mut link, mut panel) = link();

        // Status codes end in '-' too; bytes arriving within the settle
        // interval keep the capture open.
        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(b"A1 F1-").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            panel.write_all(b"\r\n-").await.unwrap();
            panel
        });

        let response = link.send_command("CLIST", IDLE).await.unwrap();
        assert_eq!(response, "A1 F1-\r\n-");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_no_reply_returns_empty() {
        let (mut link, _panel) = link();
        let response = link.send_command("LOGIN", Duration::from_millis(50)).await.unwrap();
        assert_eq!(response, "");
    }

    #[tokio::test]
    async fn test_reply_without_prompt_returned_after_idle() {
        let (mut link, mut panel) = link();

        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(b"ENTER PASSCODE:").await.unwrap();
            panel
        });

        let response = link.send_command("LOGIN", Duration::from_millis(80)).await.unwrap();
        assert_eq!(response, "ENTER PASSCODE:");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_input_cleared_before_command() {
        let (mut link, mut panel) = link();
        panel.write_all(b"old unsolicited output\r\n-").await.unwrap();
        // Let the stale bytes land in the buffer first.
        tokio::task::yield_now().await;

        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(b"REV 12\r\n-").await.unwrap();
            panel
        });

        let response = link.send_command("REV", IDLE).await.unwrap();
        assert_eq!(response, "REV 12\r\n-");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_high_bytes_decoded_one_to_one() {
        let (mut link, mut panel) = link();

        let fake_panel = tokio::spawn(async move {
            read_command(&mut panel).await;
            panel.write_all(&[0xA0, 0xB9, b'\r', b'\n', b'-']).await.unwrap();
            panel
        });

        let response = link.send_command("LIST", IDLE).await.unwrap();
        assert_eq!(response, "\u{a0}\u{b9}\r\n-");
        drop(fake_panel.await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_line_is_disconnected() {
        let (mut link, panel) = link();
        drop(panel);
        let err = link.send_command("CLIST", IDLE).await.unwrap_err();
        // Writing to a closed duplex fails with BrokenPipe.
        assert!(matches!(err, FacpError::Io(_) | FacpError::Disconnected));
    }

    #[test]
    fn test_protocol() {
        let (ours, _panel) = duplex(16);
        assert_eq!(InteractiveLink::new(ours).protocol(), Protocol::Interactive);
    }
}
