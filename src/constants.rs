// MIT License - Copyright (c) 2026 Peter Wright
// Wire constants

use std::time::Duration;

/// Framed link bytes.
pub const BEGIN: u8 = 0x1C; // Start of frame
pub const END: u8 = 0x17; // End of body, checksum follows
pub const ACK: u8 = 0x06; // Frame acknowledged

/// First value of the rolling sequence counter. Sequence bytes stay in
/// `0x40..=0x7F`; the first frame sent carries `0x41`.
pub const SEQUENCE_BASE: u8 = 0x40;

/// Sequence numbers wrap modulo 64.
pub const SEQUENCE_MODULUS: u8 = 64;

/// Added to each 6-bit checksum half so the encoded bytes are printable.
pub const CHECKSUM_OFFSET: u8 = 0x40;

/// Interactive shell line terminator sent after every command.
pub const CR: u8 = b'\r';

/// The panel's shell prompt. A reply is complete once it ends in this
/// character and the line has gone quiet.
pub const PROMPT: char = '-';

/// Panel commands.
pub const CMD_LOGIN: &str = "LOGIN";
pub const CMD_LOGOUT: &str = "LOGOUT";
pub const CMD_POINT_LIST: &str = "CLIST";

/// Marker the panel prints after a valid passcode.
pub const ACCESS_GRANTED: &str = "ACCESS GRANTED";

/// Per-byte read timeout on the serial line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Idle timeout for ordinary shell commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Idle timeout for the point list, which can run to hundreds of lines.
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(3);

/// Quiet period after the prompt before a reply is considered complete.
pub const SETTLE_INTERVAL: Duration = Duration::from_millis(100);

/// Default poll interval between point lists.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of re-login attempts after a failed poll.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay between re-login attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
