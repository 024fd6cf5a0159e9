//! Beast binary record parser.
//!
//! Wire layout, after removing byte-stuffing:
//!
//! ```text
//! 0x1A <type:u8> <mlat:6B BE> <rssi:u8> <payload:2|7|14 B>
//! ```
//!
//! `type` selects the payload: 0x31 Mode A/C (2 bytes), 0x32 Mode S
//! short (7), 0x33 Mode S long (14). Any literal 0x1A after the leading
//! escape is doubled on the wire. The MLAT field counts ticks of the
//! receiver's 12 MHz clock since power-on; radarcape GPS stamps ride in
//! the same 48 bits and are recorded as raw ticks all the same.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;

use crate::frame::{Frame, FrameMode};
use crate::types::{DecodeError, Result};

/// Record escape byte.
pub const ESCAPE: u8 = 0x1A;

// Shortest possible record: escape + type + mlat + rssi + Mode A/C body
const MIN_RECORD_LEN: usize = 11;

/// Beast record type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BeastType {
    /// 0x31: Mode A/C, 2-byte body.
    ModeAc,
    /// 0x32: Mode S short, 7-byte body.
    ModeSShort,
    /// 0x33: Mode S long, 14-byte body.
    ModeSLong,
}

impl BeastType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x31 => Some(BeastType::ModeAc),
            0x32 => Some(BeastType::ModeSShort),
            0x33 => Some(BeastType::ModeSLong),
            _ => None,
        }
    }

    /// The wire type byte.
    pub fn byte(self) -> u8 {
        match self {
            BeastType::ModeAc => 0x31,
            BeastType::ModeSShort => 0x32,
            BeastType::ModeSLong => 0x33,
        }
    }

    pub(crate) fn body_len(self) -> usize {
        match self {
            BeastType::ModeAc => 2,
            BeastType::ModeSShort => 7,
            BeastType::ModeSLong => 14,
        }
    }
}

// ---------------------------------------------------------------------------
// Signal level
// ---------------------------------------------------------------------------

/// Received signal strength derived from the Beast signal byte.
///
/// `20 * log10(level / 255)` dBFS; a zero level has no defined power and
/// carries negative infinity, displayed as the literal `-Inf`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalRssi(f32);

impl SignalRssi {
    pub(crate) fn from_level(level: u8) -> Self {
        if level == 0 {
            SignalRssi(f32::NEG_INFINITY)
        } else {
            SignalRssi(20.0 * (level as f32 / 255.0).log10())
        }
    }

    /// Signal strength in dBFS.
    pub fn dbfs(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for SignalRssi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_infinite() {
            f.write_str("-Inf")
        } else {
            write!(f, "{:.1}", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// Parse one byte-stuffed Beast record into an undecoded [`Frame`].
///
/// `timestamp` is the receiver wall clock; the record's own MLAT ticks
/// are kept alongside it.
pub fn parse_beast(record: &[u8], timestamp: SystemTime) -> Result<Frame> {
    let mut frame = Frame::default();
    parse_into(&mut frame, record, timestamp)?;
    Ok(frame)
}

/// Parse a Beast record into an existing frame, for pooled allocation.
pub(crate) fn parse_into(frame: &mut Frame, record: &[u8], timestamp: SystemTime) -> Result<()> {
    if record.is_empty() {
        return Err(DecodeError::Empty);
    }
    if record.len() < MIN_RECORD_LEN {
        return Err(DecodeError::ShortFrame(record.len()));
    }
    if record[0] != ESCAPE {
        return Err(DecodeError::BadBeastFrame("record does not start with 0x1A"));
    }

    unstuff(&mut frame.raw, record)?;

    let Some(msg_type) = frame.raw.get(1).copied().and_then(BeastType::from_byte) else {
        return Err(DecodeError::BadBeastFrame("unknown message type"));
    };
    if frame.raw.len() != 9 + msg_type.body_len() {
        return Err(DecodeError::BadBeastFrame(
            "record length does not match message type",
        ));
    }

    frame.mode = FrameMode::Beast;
    frame.msg_type = Some(msg_type);
    frame.timestamp = timestamp;
    frame.mlat_timestamp.copy_from_slice(&frame.raw[2..8]);
    frame.beast_ticks = ticks_of(&frame.mlat_timestamp);
    frame.beast_ticks_ns = frame.beast_ticks * 500;
    frame.signal_level = frame.raw[8];
    frame.message.extend_from_slice(&frame.raw[9..]);

    Ok(())
}

/// Remove byte-stuffing: every 0x1A after the leading escape arrives
/// doubled; a lone one marks a truncated or mis-framed record.
fn unstuff(dst: &mut Vec<u8>, record: &[u8]) -> Result<()> {
    dst.push(ESCAPE);
    let mut i = 1;
    while i < record.len() {
        let byte = record[i];
        if byte == ESCAPE {
            if record.get(i + 1) != Some(&ESCAPE) {
                return Err(DecodeError::BadBeastFrame("lone 0x1A inside record"));
            }
            i += 1;
        }
        dst.push(byte);
        i += 1;
    }
    Ok(())
}

/// Big-endian 48-bit MLAT tick counter.
fn ticks_of(mlat: &[u8; 6]) -> u64 {
    mlat.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::icao_to_string;

    const MODE_AC: &[u8] = &[
        0x1A, 0x31, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    const MODE_S_SHORT: &[u8] = &[
        0x1A, 0x32, 0x22, 0x1B, 0x54, 0xF0, 0x81, 0x2B, 0x26, 0x5D, 0x7C, 0x49, 0xF8, 0x28,
        0xE9, 0x43,
    ];
    const MODE_S_LONG: &[u8] = &[
        0x1A, 0x33, 0x22, 0x1B, 0x54, 0xAC, 0xC2, 0xE9, 0x28, 0x8D, 0x7C, 0x49, 0xF8, 0x58,
        0x41, 0xD2, 0x6C, 0xCA, 0x39, 0x33, 0xE4, 0x1E, 0xCF,
    ];

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    /// Apply wire byte-stuffing to an unstuffed record.
    fn stuff(record: &[u8]) -> Vec<u8> {
        let mut out = vec![record[0]];
        for &b in &record[1..] {
            out.push(b);
            if b == ESCAPE {
                out.push(b);
            }
        }
        out
    }

    #[test]
    fn test_mode_ac_record() {
        let frame = parse_beast(MODE_AC, now()).unwrap();
        assert_eq!(frame.msg_type(), Some(BeastType::ModeAc));
        assert_eq!(frame.mode(), FrameMode::Beast);
        assert_eq!(frame.message().len(), 2);
        assert_eq!(frame.signal_rssi().to_string(), "-Inf");
        assert_eq!(frame.icao(), None);
        // Mode A/C has no Mode S payload to dispatch
        let mut frame = frame;
        assert!(matches!(frame.decode(), Err(DecodeError::NoOp)));
    }

    #[test]
    fn test_mode_s_short_record() {
        let frame = parse_beast(MODE_S_SHORT, now()).unwrap();
        assert_eq!(frame.msg_type(), Some(BeastType::ModeSShort));
        assert_eq!(frame.raw_record(), MODE_S_SHORT);
        assert_eq!(frame.signal_level(), 0x26);
        assert_eq!(frame.mlat_timestamp(), &[0x22, 0x1B, 0x54, 0xF0, 0x81, 0x2B]);
        assert_eq!(frame.beast_ticks(), 0x221B54F0812B);
        assert_eq!(frame.beast_ticks_ns(), 0x221B54F0812B * 500);
        assert_eq!(frame.message().len(), 7);
    }

    #[test]
    fn test_mode_s_long_record() {
        let mut frame = parse_beast(MODE_S_LONG, now()).unwrap();
        assert_eq!(frame.msg_type(), Some(BeastType::ModeSLong));
        assert_eq!(frame.signal_level(), 0x28);
        assert_eq!(frame.message().len(), 14);

        frame.decode().unwrap();
        assert_eq!(frame.downlink_format(), Some(17));
        assert_eq!(frame.icao_str().as_deref(), Some("7C49F8"));
    }

    #[test]
    fn test_short_record_decodes_df11() {
        let mut frame = parse_beast(MODE_S_SHORT, now()).unwrap();
        frame.decode().unwrap();
        assert_eq!(frame.downlink_format(), Some(11));
        assert_eq!(frame.icao_str().as_deref(), Some("7C49F8"));
        // The bridge view recovers the same address from the same bytes
        let view = frame.as_avr().unwrap();
        assert_eq!(view.icao().map(icao_to_string).as_deref(), Some("7C49F8"));
    }

    #[test]
    fn test_zero_prefixes_rejected() {
        // All-zero inputs of lengths 0 through 9 never form a record
        for len in 0..=9 {
            let bytes = vec![0u8; len];
            assert!(
                matches!(
                    parse_beast(&bytes, now()),
                    Err(DecodeError::Empty
                        | DecodeError::ShortFrame(_)
                        | DecodeError::BadBeastFrame(_))
                ),
                "length {len} should not parse"
            );
        }
    }

    #[test]
    fn test_unstuffing_restores_payload() {
        // This capture carries a literal 0x1A inside its payload
        let record: &[u8] = &[
            0x1A, 0x32, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0xE1, 0x98, 0x38,
            0x5F, 0x1A, 0x9D,
        ];
        let stuffed = stuff(record);
        assert_eq!(stuffed.len(), record.len() + 1);

        let frame = parse_beast(&stuffed, now()).unwrap();
        assert_eq!(frame.raw_record(), record);
        assert_eq!(
            frame.message(),
            &[0x02, 0xE1, 0x98, 0x38, 0x5F, 0x1A, 0x9D]
        );
    }

    #[test]
    fn test_lone_escape_rejected() {
        let mut record = MODE_S_SHORT.to_vec();
        record[10] = ESCAPE; // lone escape in the body
        assert!(matches!(
            parse_beast(&record, now()),
            Err(DecodeError::BadBeastFrame(_))
        ));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut record = MODE_S_SHORT.to_vec();
        record[1] = 0x34;
        assert!(matches!(
            parse_beast(&record, now()),
            Err(DecodeError::BadBeastFrame(_))
        ));
    }

    #[test]
    fn test_truncated_record_rejected() {
        assert!(matches!(
            parse_beast(&MODE_S_LONG[..16], now()),
            Err(DecodeError::BadBeastFrame(_))
        ));
    }

    #[test]
    fn test_rssi_formula() {
        for level in 1..=255u8 {
            let rssi = SignalRssi::from_level(level).dbfs();
            let expected = 20.0 * (level as f32 / 255.0).log10();
            assert!((rssi - expected).abs() < 1e-6);
        }
        assert_eq!(SignalRssi::from_level(255).dbfs(), 0.0);
        assert!(SignalRssi::from_level(0).dbfs().is_infinite());
    }

    #[test]
    fn test_rssi_display() {
        assert_eq!(SignalRssi::from_level(0).to_string(), "-Inf");
        // Full-scale level is 0.0 dBFS
        assert_eq!(SignalRssi::from_level(255).to_string(), "0.0");
    }
}
