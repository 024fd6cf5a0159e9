//! AVR text frame parser.
//!
//! An AVR line is the Mode S payload as 14 or 28 hex digits, optionally
//! wrapped in framing: a leading `*`, or a leading `@` carrying a Beast
//! MLAT timestamp, and a trailing `;`. Whitespace is tolerated on both
//! ends.

use std::fmt;
use std::time::SystemTime;

use crate::decode;
use crate::frame::{Frame, FrameMode};
use crate::types::{self, icao_to_string, DecodeError, Icao, Result};

/// Parse an AVR text line into an undecoded [`Frame`].
///
/// `timestamp` is the receiver wall clock for the frame.
pub fn parse_avr(text: &str, timestamp: SystemTime) -> Result<Frame> {
    let mut frame = Frame::default();
    parse_into(&mut frame, text, timestamp)?;
    Ok(frame)
}

/// Parse an AVR line into an existing frame, for pooled allocation.
pub(crate) fn parse_into(frame: &mut Frame, text: &str, timestamp: SystemTime) -> Result<()> {
    frame.full.push_str(text);
    frame.timestamp = timestamp;

    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == ';');
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }
    if !trimmed.is_ascii() {
        return Err(DecodeError::BadHex);
    }
    if trimmed.len() < 14 {
        return Err(DecodeError::ShortFrame(trimmed.len()));
    }

    let start = match trimmed.as_bytes()[0] {
        b'@' => {
            // Beast timestamp + AVR format
            frame.mode = FrameMode::Mlat;
            parse_mlat_prefix(frame, &trimmed[1..12])?;
            13
        }
        b'*' => {
            frame.mode = FrameMode::Normal;
            1
        }
        _ => {
            frame.mode = FrameMode::Normal;
            0
        }
    };

    let hex = &trimmed[start..];
    if hex.is_empty() {
        return Err(DecodeError::ShortFrame(0));
    }
    if hex.len() & 1 != 0 {
        return Err(DecodeError::OddLength(hex.len()));
    }
    let n = hex.len() / 2;
    if n != 7 && n != 14 {
        return Err(DecodeError::BadLength(n));
    }

    types::push_hex(&mut frame.message, hex)
}

/// MLAT ticks ride in the hex digits after the `@`. Ticks count 500 ns
/// intervals since receiver power-on; the all-zero stamp means "no
/// timestamp" and is accepted as ticks 0.
fn parse_mlat_prefix(frame: &mut Frame, stamp: &str) -> Result<()> {
    if stamp == "00000000000" {
        return Ok(());
    }
    frame.beast_ticks =
        u64::from_str_radix(stamp, 16).map_err(|_| DecodeError::BadTimestamp(stamp.into()))?;
    frame.beast_ticks_ns = frame.beast_ticks * 500;
    Ok(())
}

// ---------------------------------------------------------------------------
// Beast -> AVR bridge
// ---------------------------------------------------------------------------

/// AVR-shaped view over a frame's Mode S payload.
///
/// Borrows the payload buffer; DF discrimination and ICAO recovery run
/// through the same routines the frame decoder uses. `Display` renders
/// the `*…;` AVR framing.
#[derive(Debug, Clone, Copy)]
pub struct AvrView<'a> {
    message: &'a [u8],
}

impl<'a> AvrView<'a> {
    pub(crate) fn new(message: &'a [u8]) -> Self {
        AvrView { message }
    }

    /// The shared 7/14-byte Mode S payload.
    pub fn message(&self) -> &'a [u8] {
        self.message
    }

    pub fn downlink_format(&self) -> u8 {
        decode::downlink_format_of(self.message)
    }

    /// ICAO address, explicit or recovered from the parity overlay.
    pub fn icao(&self) -> Option<Icao> {
        decode::recover_icao(self.message)
    }

    pub fn icao_str(&self) -> Option<String> {
        self.icao().map(icao_to_string)
    }
}

impl fmt::Display for AvrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{};", types::hex_encode(self.message))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
