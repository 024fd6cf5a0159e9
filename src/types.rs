//! Shared types, error enum, and field value types for modes-decode.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by this crate.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot decode an empty frame")]
    Empty,
    #[error("frame too short to be a Mode S frame ({0} characters)")]
    ShortFrame(usize),
    #[error("frame has an odd number of hex digits ({0})")]
    OddLength(usize),
    #[error("message length {0} is neither 7 nor 14 bytes")]
    BadLength(usize),
    #[error("bad Beast frame: {0}")]
    BadBeastFrame(&'static str),
    #[error("invalid hex digit in frame")]
    BadHex,
    #[error("failed to decode MLAT timestamp prefix: {0}")]
    BadTimestamp(String),
    #[error("DF{df} implies a {expected}-byte message, got {actual}")]
    LengthMismatch {
        df: u8,
        expected: usize,
        actual: usize,
    },
    #[error("CRC syndrome 0x{0:06X} is non-zero")]
    BadCrc(u32),
    #[error("no decoder for DF{0}")]
    UnknownDf(u8),
    #[error("address {0:06X} recovered from parity has not been seen in a validated frame")]
    UntrustedIcao(u32),
    /// Recognised heartbeat / keep-alive frame. Informational; drop silently.
    #[error("frame is a no-op heartbeat")]
    NoOp,
}

pub type Result<T> = std::result::Result<T, DecodeError>;

// ---------------------------------------------------------------------------
// ICAO address helpers
// ---------------------------------------------------------------------------

/// 24-bit ICAO aircraft address, stored in the low bits of a `u32`.
pub type Icao = u32;

/// Format an ICAO address as a 6-char uppercase hex string.
pub fn icao_to_string(icao: Icao) -> String {
    format!("{icao:06X}")
}

/// Parse a 6-char hex string into an ICAO address.
pub fn icao_from_hex(hex: &str) -> Option<Icao> {
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

// ---------------------------------------------------------------------------
// Downlink Format metadata
// ---------------------------------------------------------------------------

/// Metadata for a Downlink Format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfInfo {
    pub name: &'static str,
    pub bits: usize,
}

/// Known Downlink Format table.
pub const DF_TABLE: &[(u8, DfInfo)] = &[
    (
        0,
        DfInfo {
            name: "Short air-air surveillance",
            bits: 56,
        },
    ),
    (
        4,
        DfInfo {
            name: "Surveillance altitude reply",
            bits: 56,
        },
    ),
    (
        5,
        DfInfo {
            name: "Surveillance identity reply",
            bits: 56,
        },
    ),
    (
        11,
        DfInfo {
            name: "All-call reply",
            bits: 56,
        },
    ),
    (
        16,
        DfInfo {
            name: "Long air-air surveillance",
            bits: 112,
        },
    ),
    (
        17,
        DfInfo {
            name: "ADS-B extended squitter",
            bits: 112,
        },
    ),
    (
        18,
        DfInfo {
            name: "Extended squitter, non-transponder",
            bits: 112,
        },
    ),
    (
        20,
        DfInfo {
            name: "Comm-B altitude reply",
            bits: 112,
        },
    ),
    (
        21,
        DfInfo {
            name: "Comm-B identity reply",
            bits: 112,
        },
    ),
    (
        24,
        DfInfo {
            name: "Comm-D extended length message",
            bits: 112,
        },
    ),
];

/// Look up DF metadata. Returns `None` for unrecognized DFs.
pub fn df_info(df: u8) -> Option<&'static DfInfo> {
    DF_TABLE
        .iter()
        .find(|(d, _)| *d == df)
        .map(|(_, info)| info)
}

impl DfInfo {
    /// Look up DF metadata, failing with `UnknownDf` for unrecognized DFs.
    pub fn require(df: u8) -> Result<&'static DfInfo> {
        df_info(df).ok_or(DecodeError::UnknownDf(df))
    }
}

// ---------------------------------------------------------------------------
// Hex utilities
// ---------------------------------------------------------------------------

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    push_hex(&mut bytes, hex).ok()?;
    Some(bytes)
}

/// Decode a hex string, appending the bytes onto `dst`.
///
/// Used by the AVR parser so pooled frames can reuse their buffers.
pub(crate) fn push_hex(dst: &mut Vec<u8>, hex: &str) -> Result<()> {
    if hex.len() & 1 != 0 {
        return Err(DecodeError::OddLength(hex.len()));
    }
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0]).ok_or(DecodeError::BadHex)?;
        let low = hex_digit(chunk[1]).ok_or(DecodeError::BadHex)?;
        dst.push((high << 4) | low);
    }
    Ok(())
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// AIS-6 callsign character set
// ---------------------------------------------------------------------------

/// 6-bit character set for ADS-B callsign encoding.
///
/// Index 0 is `@`; an all-`@` callsign is the "no identification" sentinel.
pub const AIS_CHARSET: &[u8; 64] =
    b"@ABCDEFGHIJKLMNOPQRSTUVWXYZ@@@@@ @@@@@@@@@@@@@@@0123456789@@@@@@";

// ---------------------------------------------------------------------------
// Field value types
// ---------------------------------------------------------------------------

/// Decoded altitude from an AC12/AC13 altitude code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Altitude {
    /// Barometric altitude in feet.
    Feet(i32),
    /// Metric altitude flagged by the M bit. The raw 13-bit code is kept;
    /// the value encoding is not decoded.
    Metric { code: u16 },
}

impl Altitude {
    /// Altitude in feet, when the code used the feet encodings.
    pub fn feet(&self) -> Option<i32> {
        match self {
            Altitude::Feet(ft) => Some(*ft),
            Altitude::Metric { .. } => None,
        }
    }
}

/// Vertical status bit (VS) of DF0/DF16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerticalStatus {
    Airborne,
    OnGround,
}

impl VerticalStatus {
    pub(crate) fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            VerticalStatus::Airborne
        } else {
            VerticalStatus::OnGround
        }
    }

    pub fn on_ground(&self) -> bool {
        matches!(self, VerticalStatus::OnGround)
    }
}

/// Flight status field (FS) of DF4/5/20/21.
///
/// Encodes alert, SPI, and airborne/on-ground state:
///
/// ```text
/// 000  no alert, no SPI, airborne
/// 001  no alert, no SPI, on ground
/// 010  alert, no SPI, airborne
/// 011  alert, no SPI, on ground
/// 100  alert and SPI, airborne or on ground
/// 101  no alert, SPI, airborne or on ground
/// 110  reserved
/// 111  not assigned
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlightStatus(pub u8);

const FLIGHT_STATUS_TABLE: [&str; 8] = [
    "airborne, no alert, no SPI",
    "on ground, no alert, no SPI",
    "airborne, alert",
    "on ground, alert",
    "alert and SPI, airborne or on ground",
    "SPI, airborne or on ground",
    "reserved",
    "not assigned",
];

impl FlightStatus {
    pub fn alert(&self) -> bool {
        matches!(self.0, 2 | 3 | 4)
    }

    pub fn spi(&self) -> bool {
        matches!(self.0, 4 | 5)
    }

    /// Airborne/ground state, when the FS value carries one.
    pub fn on_ground(&self) -> Option<bool> {
        match self.0 {
            0 | 2 => Some(false),
            1 | 3 => Some(true),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        FLIGHT_STATUS_TABLE[(self.0 & 0x7) as usize]
    }
}

/// Capability field (CA) of DF11/17, or control field (CF) of DF18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability(pub u8);

impl Capability {
    /// CA 4 reports on-ground, CA 5 airborne; other values carry no
    /// vertical status.
    pub fn on_ground(&self) -> Option<bool> {
        match self.0 {
            4 => Some(true),
            5 => Some(false),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
