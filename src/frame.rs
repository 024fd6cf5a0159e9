//! The Frame value object: one per received message.
//!
//! A frame moves through a single-step state machine: parsed (wire form
//! and 7/14-byte payload captured) then decoded (DF dispatched, fields
//! extracted) or failed. `decode` is idempotent; exclusive access is a
//! `&mut` borrow, so there is no lock — the second caller simply
//! observes the decoded flag.

use std::time::SystemTime;

use crate::avr::AvrView;
use crate::beast::{BeastType, SignalRssi};
use crate::crc;
use crate::decode::{self, DfFields};
use crate::types::{icao_to_string, Altitude, DecodeError, Icao, Result};

/// How the frame arrived on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    /// Plain AVR text.
    #[default]
    Normal,
    /// AVR text with a Beast MLAT timestamp prefix.
    Mlat,
    /// Beast binary record.
    Beast,
}

/// Options consulted by [`Frame::decode_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Attempt syndrome-table repair of 1-2 bit errors on extended
    /// squitters that fail the zero-syndrome check.
    pub repair_crc: bool,
}

/// One received Mode S message: its wire form, payload, and decoded
/// field set.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Original AVR text, empty for Beast frames.
    pub(crate) full: String,
    /// Original Beast record with escapes removed, empty for AVR frames.
    pub(crate) raw: Vec<u8>,
    pub(crate) mode: FrameMode,
    pub(crate) msg_type: Option<BeastType>,
    pub(crate) mlat_timestamp: [u8; 6],
    pub(crate) beast_ticks: u64,
    pub(crate) beast_ticks_ns: u64,
    pub(crate) signal_level: u8,
    pub(crate) timestamp: SystemTime,
    /// The 7/14-byte Mode S payload (2 bytes for Mode A/C records).
    pub(crate) message: Vec<u8>,
    pub(crate) downlink_format: u8,
    pub(crate) fields: Option<DfFields>,
    pub(crate) decoded: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Frame {
            full: String::new(),
            raw: Vec::new(),
            mode: FrameMode::Normal,
            msg_type: None,
            mlat_timestamp: [0; 6],
            beast_ticks: 0,
            beast_ticks_ns: 0,
            signal_level: 0,
            timestamp: SystemTime::UNIX_EPOCH,
            message: Vec::new(),
            downlink_format: 0,
            fields: None,
            decoded: false,
        }
    }
}

impl Frame {
    // -- decoding ----------------------------------------------------------

    /// Dispatch the payload to the per-DF field decoders.
    ///
    /// Idempotent: only the first call does work, later calls return
    /// `Ok` and leave every observable unchanged. Heartbeat frames fail
    /// with [`DecodeError::NoOp`], which callers drop silently.
    pub fn decode(&mut self) -> Result<()> {
        self.decode_with(&DecodeOptions::default())
    }

    /// [`Frame::decode`] with explicit options.
    pub fn decode_with(&mut self, options: &DecodeOptions) -> Result<()> {
        if self.decoded {
            return Ok(());
        }
        if self.msg_type == Some(BeastType::ModeAc) {
            // No Mode S payload to dispatch
            return Err(DecodeError::NoOp);
        }
        if self.message.is_empty() {
            return Err(DecodeError::Empty);
        }
        if self.mode != FrameMode::Beast && decode::is_noop(&self.message) {
            return Err(DecodeError::NoOp);
        }

        let (df, fields) = match decode::decode_message(&self.message) {
            Ok(decoded) => decoded,
            Err(DecodeError::BadCrc(syndrome))
                if options.repair_crc && decode::downlink_format_of(&self.message) != 11 =>
            {
                if !crc::repair(&mut self.message) {
                    return Err(DecodeError::BadCrc(syndrome));
                }
                decode::decode_message(&self.message)?
            }
            Err(err) => return Err(err),
        };

        self.downlink_format = df;
        self.fields = Some(fields);
        self.decoded = true;
        Ok(())
    }

    /// Project the Mode S payload as an AVR-shaped view without copying.
    ///
    /// `None` when the frame holds no Mode S payload (Mode A/C records,
    /// failed parses).
    pub fn as_avr(&self) -> Option<AvrView<'_>> {
        match self.message.len() {
            7 | 14 => Some(AvrView::new(&self.message)),
            _ => None,
        }
    }

    // -- wire form ---------------------------------------------------------

    /// The original AVR line, empty for Beast frames.
    pub fn text(&self) -> &str {
        &self.full
    }

    /// The original Beast record with escapes removed, empty for AVR
    /// frames.
    pub fn raw_record(&self) -> &[u8] {
        &self.raw
    }

    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Beast record type, for Beast-sourced frames.
    pub fn msg_type(&self) -> Option<BeastType> {
        self.msg_type
    }

    /// The 7/14-byte Mode S payload.
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    // -- timing and signal -------------------------------------------------

    /// Receiver wall clock assigned at parse time.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: SystemTime) {
        self.timestamp = timestamp;
    }

    /// Raw 6-byte MLAT counter from the Beast header.
    pub fn mlat_timestamp(&self) -> &[u8; 6] {
        &self.mlat_timestamp
    }

    /// MLAT ticks since receiver power-on.
    pub fn beast_ticks(&self) -> u64 {
        self.beast_ticks
    }

    /// MLAT ticks scaled to nanoseconds (500 ns per tick).
    pub fn beast_ticks_ns(&self) -> u64 {
        self.beast_ticks_ns
    }

    /// Raw Beast signal level byte (0 for AVR frames).
    pub fn signal_level(&self) -> u8 {
        self.signal_level
    }

    /// Signal strength in dBFS; `-Inf` for a zero level.
    pub fn signal_rssi(&self) -> SignalRssi {
        SignalRssi::from_level(self.signal_level)
    }

    // -- decoded fields ----------------------------------------------------

    pub fn decoded(&self) -> bool {
        self.decoded
    }

    /// Downlink Format, once decoded.
    pub fn downlink_format(&self) -> Option<u8> {
        self.decoded.then_some(self.downlink_format)
    }

    /// The per-DF field set, once decoded.
    pub fn fields(&self) -> Option<&DfFields> {
        self.fields.as_ref()
    }

    /// ICAO address, explicit or recovered from the parity overlay.
    pub fn icao(&self) -> Option<Icao> {
        self.fields.as_ref()?.icao()
    }

    /// ICAO address as 6 uppercase hex digits.
    pub fn icao_str(&self) -> Option<String> {
        self.icao().map(icao_to_string)
    }

    /// ADS-B type code, when the frame carries an ME body.
    pub fn message_type(&self) -> Option<u8> {
        self.fields.as_ref()?.message_extension()?;
        Some(self.message[4] >> 3)
    }

    /// ADS-B subtype, when the frame carries an ME body.
    pub fn message_subtype(&self) -> Option<u8> {
        Some(self.fields.as_ref()?.message_extension()?.sub_type())
    }

    /// Decoded altitude, from AC13 fields or an airborne position ME.
    pub fn altitude(&self) -> Option<Altitude> {
        self.fields.as_ref()?.altitude()
    }

    /// Squawk identity as four octal digits in decimal form.
    pub fn identity(&self) -> Option<u32> {
        self.fields.as_ref()?.identity()
    }

    /// Callsign, from an identification ME or a BDS 2,0 Comm-B register.
    pub fn flight(&self) -> Option<&str> {
        self.fields.as_ref()?.callsign()
    }

    /// Airborne/ground state, from whichever decoded field carries one.
    pub fn on_ground(&self) -> Option<bool> {
        self.fields.as_ref()?.on_ground()
    }

    // -- pooling -----------------------------------------------------------

    /// Zero every field, keeping buffer capacity for reuse.
    pub(crate) fn reset(&mut self) {
        self.full.clear();
        self.raw.clear();
        self.mode = FrameMode::Normal;
        self.msg_type = None;
        self.mlat_timestamp = [0; 6];
        self.beast_ticks = 0;
        self.beast_ticks_ns = 0;
        self.signal_level = 0;
        self.timestamp = SystemTime::UNIX_EPOCH;
        self.message.clear();
        self.downlink_format = 0;
        self.fields = None;
        self.decoded = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr::parse_avr;
    use crate::types::hex_encode;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    #[test]
    fn test_decode_is_idempotent() {
        let mut frame = parse_avr("*8D4840D6202CC371C32CE0576098;", now()).unwrap();
        frame.decode().unwrap();
        let snapshot = frame.clone();
        frame.decode().unwrap();
        assert_eq!(frame, snapshot);
    }

    #[test]
    fn test_identification_accessors() {
        let mut frame = parse_avr("*8D4840D6202CC371C32CE0576098;", now()).unwrap();
        frame.decode().unwrap();

        assert!(frame.decoded());
        assert_eq!(frame.downlink_format(), Some(17));
        assert_eq!(frame.icao(), Some(0x4840D6));
        assert_eq!(frame.icao_str().as_deref(), Some("4840D6"));
        assert_eq!(frame.message_type(), Some(4));
        assert_eq!(frame.message_subtype(), Some(0));
        assert_eq!(frame.flight(), Some("KLM1023 "));
        assert_eq!(frame.flight().map(str::trim_end), Some("KLM1023"));
        assert_eq!(frame.altitude(), None);
        assert_eq!(frame.identity(), None);
    }

    #[test]
    fn test_undecoded_frame_exposes_nothing() {
        let frame = parse_avr("*8D4840D6202CC371C32CE0576098;", now()).unwrap();
        assert!(!frame.decoded());
        assert_eq!(frame.downlink_format(), None);
        assert_eq!(frame.icao(), None);
        assert_eq!(frame.flight(), None);
    }

    #[test]
    fn test_all_zero_heartbeat_is_noop() {
        let mut frame = parse_avr("*00000000000000;", now()).unwrap();
        assert!(matches!(frame.decode(), Err(DecodeError::NoOp)));
        assert!(!frame.decoded());
    }

    #[test]
    fn test_df24_shaped_heartbeat_is_noop() {
        let mut frame = parse_avr("*C000000000000000000000000000;", now()).unwrap();
        assert!(matches!(frame.decode(), Err(DecodeError::NoOp)));
    }

    #[test]
    fn test_decode_with_repair() {
        // Flip one payload bit; plain decode refuses, repair recovers
        let mut data = crate::types::hex_decode("8D4840D6202CC371C32CE0576098").unwrap();
        data[5] ^= 0x01;
        let line = format!("*{};", hex_encode(&data));

        let mut frame = parse_avr(&line, now()).unwrap();
        assert!(matches!(frame.decode(), Err(DecodeError::BadCrc(_))));

        let mut frame = parse_avr(&line, now()).unwrap();
        frame
            .decode_with(&DecodeOptions { repair_crc: true })
            .unwrap();
        assert_eq!(frame.icao_str().as_deref(), Some("4840D6"));
        assert_eq!(hex_encode(frame.message()), "8D4840D6202CC371C32CE0576098");
    }

    #[test]
    fn test_reset_zeroes_every_field() {
        let mut frame = parse_avr("*8D4840D6202CC371C32CE0576098;", now()).unwrap();
        frame.decode().unwrap();
        frame.reset();
        assert_eq!(frame, Frame::default());
    }

    #[test]
    fn test_comm_b_accessors() {
        let mut frame = parse_avr("*A00017B1B129FB30E004002D88FB;", now()).unwrap();
        frame.decode().unwrap();
        assert_eq!(frame.downlink_format(), Some(20));
        assert!(frame.altitude().is_some());
        assert!(frame.icao().is_some());
        // Not an extended squitter: no ME accessors
        assert_eq!(frame.message_type(), None);
        assert_eq!(frame.message_subtype(), None);
    }
}
