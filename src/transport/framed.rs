// MIT License - Copyright (c) 2026 Peter Wright
// Framed link

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::checksum;
use crate::constants::{ACK, BEGIN, END, SEQUENCE_BASE, SEQUENCE_MODULUS};
use crate::error::{FacpError, Result};
use crate::transport::{PanelLink, Protocol};

/// Build the wire frame `[BEGIN][sequence][body...][END][checksum x2]`.
///
/// The checksum covers everything from the sequence byte through END.
pub fn encode_frame(sequence: u8, body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 5);
    frame.push(BEGIN);
    frame.push(sequence);
    frame.extend_from_slice(body);
    frame.push(END);
    let sum = checksum::compute(&frame[1..]);
    frame.extend_from_slice(&sum);
    frame
}

/// Advance a sequence byte by one, wrapping within `0x40..=0x7F`.
pub fn next_sequence(sequence: u8) -> u8 {
    (sequence.wrapping_sub(SEQUENCE_BASE) + 1) % SEQUENCE_MODULUS + SEQUENCE_BASE
}

/// Checksummed, ACK-handshaked link to the panel.
///
/// Half-duplex and single-outstanding: each [`send`](Self::send) must be
/// followed by its [`receive`](Self::receive) (or an error) before the next
/// send. The outbound sequence counter advances on every send regardless of
/// what the panel numbers its own frames.
pub struct FramedLink<S> {
    stream: S,
    sequence: u8,
    read_timeout: Duration,
}

impl<S> FramedLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream,
            sequence: SEQUENCE_BASE,
            read_timeout,
        }
    }

    /// Sequence byte carried by the most recently sent frame.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Frame and send `body`, then wait for the panel's ACK byte.
    pub async fn send(&mut self, body: &str) -> Result<()> {
        self.sequence = next_sequence(self.sequence);
        let frame = encode_frame(self.sequence, body.as_bytes());

        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        debug!("Frame sent (seq {:#04X}, {} bytes)", self.sequence, frame.len());

        match self.read_byte().await? {
            Some(ACK) => {
                trace!("ACK received for seq {:#04X}", self.sequence);
                Ok(())
            }
            received => Err(FacpError::NoAck { received }),
        }
    }

    /// Read the next frame from the panel, validate it and acknowledge it.
    ///
    /// Returns the body with the sequence byte and markers stripped.
    pub async fn receive(&mut self) -> Result<String> {
        loop {
            match self.read_byte().await? {
                Some(BEGIN) => break,
                Some(byte) => trace!("Skipping byte {:#04X} before BEGIN", byte),
                None => return Err(FacpError::Timeout { waiting_for: "BEGIN" }),
            }
        }

        // sequence + body + END
        let mut frame = Vec::new();
        loop {
            match self.read_byte().await? {
                Some(byte) => {
                    frame.push(byte);
                    if byte == END {
                        break;
                    }
                }
                None => return Err(FacpError::Timeout { waiting_for: "END" }),
            }
        }

        let mut received = [0u8; 2];
        for (i, slot) in received.iter_mut().enumerate() {
            match self.read_byte().await? {
                Some(byte) => *slot = byte,
                None => return Err(FacpError::Truncated { received: i }),
            }
        }

        if !checksum::validate(&frame, received) {
            return Err(FacpError::ChecksumMismatch {
                expected: checksum::compute(&frame),
                received,
            });
        }

        self.stream.write_all(&[ACK]).await?;
        self.stream.flush().await?;

        let body = frame.get(1..frame.len() - 1).unwrap_or_default();
        debug!(
            "Frame received (seq {:#04X}, {} body bytes)",
            frame[0],
            body.len()
        );
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    /// Read one byte, or `None` if nothing arrives within the read timeout.
    async fn read_byte(&mut self) -> Result<Option<u8>> {
        match timeout(self.read_timeout, self.stream.read_u8()).await {
            Ok(Ok(byte)) => Ok(Some(byte)),
            Ok(Err(e)) if e.kind() == ErrorKind::UnexpectedEof => Err(FacpError::Disconnected),
            Ok(Err(e)) => Err(FacpError::Io(e)),
            Err(_) => Ok(None),
        }
    }
}

impl<S> PanelLink for FramedLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn exchange(&mut self, command: &str, _reply_timeout: Duration) -> Result<String> {
        self.send(command).await?;
        self.receive().await
    }

    fn protocol(&self) -> Protocol {
        Protocol::Framed
    }
}
