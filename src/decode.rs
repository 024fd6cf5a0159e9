//! Downlink Format dispatch: turn a 7/14-byte Mode S message into the
//! per-DF field set.
//!
//! | DF | Fields |
//! |----|--------|
//! | 0  | ICAO (AP overlay), VS, CC, SL, RI, AC13 |
//! | 4  | ICAO (AP), FS, DR, UM, AC13 |
//! | 5  | ICAO (AP), FS, DR, UM, squawk identity |
//! | 11 | ICAO (bytes 1-3), CA |
//! | 16 | ICAO (AP), VS, SL, RI, AC13 |
//! | 17 | ICAO (bytes 1-3), CA, ADS-B ME |
//! | 18 | CF; ICAO + ADS-B ME iff CF == 0 |
//! | 20 | ICAO (AP), FS, AC13, Comm-B |
//! | 21 | ICAO (AP), FS, squawk identity, Comm-B |
//!
//! DF11/17/18 carry pure parity and must fold to a zero CRC syndrome;
//! the AP DFs recover their ICAO from the syndrome instead.

use serde::Serialize;

use crate::adsb::{self, MessageExtension};
use crate::crc;
use crate::gillham;
use crate::types::{
    Altitude, Capability, DecodeError, FlightStatus, Icao, Result, VerticalStatus,
};

// DFs where the ICAO address is explicit in bytes 1-3
const DF_EXPLICIT_ICAO: &[u8] = &[11, 17, 18];

// DFs where the ICAO address is overlaid on the parity field
const DF_OVERLAY_ICAO: &[u8] = &[0, 4, 5, 16, 20, 21];

// ---------------------------------------------------------------------------
// Per-DF field sets
// ---------------------------------------------------------------------------

/// The fields a decoded message carries, one variant per Downlink Format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DfFields {
    /// DF 0 — short air-air surveillance (ACAS).
    ShortAirAir {
        icao: Icao,
        vertical_status: VerticalStatus,
        cross_link: u8,
        sensitivity_level: u8,
        reply_information: u8,
        altitude: Option<Altitude>,
    },
    /// DF 4 — surveillance altitude reply.
    AltitudeReply {
        icao: Icao,
        flight_status: FlightStatus,
        downlink_request: u8,
        utility_message: u8,
        altitude: Option<Altitude>,
    },
    /// DF 5 — surveillance identity reply.
    IdentityReply {
        icao: Icao,
        flight_status: FlightStatus,
        downlink_request: u8,
        utility_message: u8,
        identity: u32,
    },
    /// DF 11 — all-call reply.
    AllCall { icao: Icao, capability: Capability },
    /// DF 16 — long air-air surveillance (ACAS).
    LongAirAir {
        icao: Icao,
        vertical_status: VerticalStatus,
        sensitivity_level: u8,
        reply_information: u8,
        altitude: Option<Altitude>,
    },
    /// DF 17 — ADS-B extended squitter.
    ExtendedSquitter {
        icao: Icao,
        capability: Capability,
        me: MessageExtension,
    },
    /// DF 18 — extended squitter from a non-transponder device. The
    /// control field selects the payload format; only CF 0 carries an
    /// ICAO address and an ADS-B ME body.
    NonTransponder {
        control_field: u8,
        icao: Option<Icao>,
        me: Option<MessageExtension>,
    },
    /// DF 20 — Comm-B altitude reply.
    CommBAltitude {
        icao: Icao,
        flight_status: FlightStatus,
        altitude: Option<Altitude>,
        comm_b: [u8; 7],
        /// BDS 2,0 callsign when the Comm-B payload carries one.
        callsign: Option<String>,
    },
    /// DF 21 — Comm-B identity reply.
    CommBIdentity {
        icao: Icao,
        flight_status: FlightStatus,
        identity: u32,
        comm_b: [u8; 7],
        callsign: Option<String>,
    },
    /// DF 24 and every DF without a field decoder.
    Unsupported,
}

impl DfFields {
    /// ICAO address, however it was recovered.
    pub fn icao(&self) -> Option<Icao> {
        match self {
            DfFields::ShortAirAir { icao, .. }
            | DfFields::AltitudeReply { icao, .. }
            | DfFields::IdentityReply { icao, .. }
            | DfFields::AllCall { icao, .. }
            | DfFields::LongAirAir { icao, .. }
            | DfFields::ExtendedSquitter { icao, .. }
            | DfFields::CommBAltitude { icao, .. }
            | DfFields::CommBIdentity { icao, .. } => Some(*icao),
            DfFields::NonTransponder { icao, .. } => *icao,
            DfFields::Unsupported => None,
        }
    }

    /// Decoded altitude, from AC13 fields or an airborne position ME.
    pub fn altitude(&self) -> Option<Altitude> {
        match self {
            DfFields::ShortAirAir { altitude, .. }
            | DfFields::AltitudeReply { altitude, .. }
            | DfFields::LongAirAir { altitude, .. }
            | DfFields::CommBAltitude { altitude, .. } => *altitude,
            _ => self.message_extension().and_then(|me| match me {
                MessageExtension::AirbornePosition(pos) => pos.altitude,
                _ => None,
            }),
        }
    }

    /// Squawk identity, from surveillance replies or status MEs.
    pub fn identity(&self) -> Option<u32> {
        match self {
            DfFields::IdentityReply { identity, .. }
            | DfFields::CommBIdentity { identity, .. } => Some(*identity),
            _ => self.message_extension().and_then(|me| match me {
                MessageExtension::EmergencyStatus(es) => Some(es.identity),
                MessageExtension::AircraftStatus(st) => Some(st.identity),
                _ => None,
            }),
        }
    }

    /// Callsign, from an identification ME or a BDS 2,0 Comm-B payload.
    pub fn callsign(&self) -> Option<&str> {
        match self {
            DfFields::CommBAltitude { callsign, .. }
            | DfFields::CommBIdentity { callsign, .. } => callsign.as_deref(),
            _ => self.message_extension().and_then(|me| match me {
                MessageExtension::Identification(id) if !id.callsign.is_empty() => {
                    Some(id.callsign.as_str())
                }
                _ => None,
            }),
        }
    }

    /// The ADS-B ME body, when the DF carries one.
    pub fn message_extension(&self) -> Option<&MessageExtension> {
        match self {
            DfFields::ExtendedSquitter { me, .. } => Some(me),
            DfFields::NonTransponder { me, .. } => me.as_ref(),
            _ => None,
        }
    }

    /// Airborne/ground state, from whichever field carries one.
    pub fn on_ground(&self) -> Option<bool> {
        match self {
            DfFields::ShortAirAir {
                vertical_status, ..
            }
            | DfFields::LongAirAir {
                vertical_status, ..
            } => Some(vertical_status.on_ground()),
            DfFields::AltitudeReply { flight_status, .. }
            | DfFields::IdentityReply { flight_status, .. }
            | DfFields::CommBAltitude { flight_status, .. }
            | DfFields::CommBIdentity { flight_status, .. } => flight_status.on_ground(),
            DfFields::AllCall { capability, .. }
            | DfFields::ExtendedSquitter { capability, .. } => capability.on_ground(),
            DfFields::NonTransponder { .. } | DfFields::Unsupported => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DF discrimination helpers
// ---------------------------------------------------------------------------

/// Downlink Format of a message. DF 24 is special-cased: both top bits
/// set mean DF 24 regardless of the nominal 5-bit value.
pub(crate) fn downlink_format_of(message: &[u8]) -> u8 {
    if message[0] & 0xC0 == 0xC0 {
        24
    } else {
        message[0] >> 3
    }
}

/// Message length implied by a DF: formats with bit 4 set are long.
pub(crate) fn implied_length(df: u8) -> usize {
    if df & 0x10 != 0 {
        14
    } else {
        7
    }
}

/// Recover the ICAO address the way the DF prescribes: explicit bytes for
/// DF11/17/18, parity overlay for DF0/4/5/16/20/21, absent otherwise.
pub(crate) fn recover_icao(message: &[u8]) -> Option<Icao> {
    if message.len() < 7 {
        return None;
    }
    let df = downlink_format_of(message);
    if DF_EXPLICIT_ICAO.contains(&df) {
        Some(icao_bytes(message))
    } else if DF_OVERLAY_ICAO.contains(&df) {
        Some(crc::checksum_addr(message))
    } else {
        None
    }
}

/// Whether the decoder recovers this DF's ICAO from the parity overlay.
pub(crate) fn is_overlay_df(df: u8) -> bool {
    DF_OVERLAY_ICAO.contains(&df)
}

fn icao_bytes(message: &[u8]) -> Icao {
    (message[1] as u32) << 16 | (message[2] as u32) << 8 | message[3] as u32
}

// ---------------------------------------------------------------------------
// Heartbeats
// ---------------------------------------------------------------------------

/// Heartbeat predicate for text-sourced frames: an all-zero payload, or a
/// DF24-shaped first byte (`0xC0`) over an all-zero body.
pub(crate) fn is_noop(message: &[u8]) -> bool {
    if message.is_empty() {
        return false;
    }
    (message[0] == 0x00 || message[0] == 0xC0) && message[1..].iter().all(|&b| b == 0)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Decode a 7/14-byte Mode S message into its DF and field set.
///
/// Verifies the DF-implied length and the CRC policy for the DF before
/// dispatching to the field decoders.
pub(crate) fn decode_message(message: &[u8]) -> Result<(u8, DfFields)> {
    let df = downlink_format_of(message);

    let expected = implied_length(df);
    if message.len() != expected {
        return Err(DecodeError::LengthMismatch {
            df,
            expected,
            actual: message.len(),
        });
    }

    if DF_EXPLICIT_ICAO.contains(&df) {
        let syndrome = crc::checksum_addr(message);
        if syndrome != 0 {
            return Err(DecodeError::BadCrc(syndrome));
        }
    }

    let fields = match df {
        0 => DfFields::ShortAirAir {
            icao: crc::checksum_addr(message),
            vertical_status: VerticalStatus::from_bit((message[0] >> 2) & 1),
            cross_link: (message[0] >> 1) & 1,
            sensitivity_level: (message[1] >> 5) & 0x7,
            reply_information: reply_information(message),
            altitude: gillham::decode_ac13(ac13_code(message)),
        },
        4 => DfFields::AltitudeReply {
            icao: crc::checksum_addr(message),
            flight_status: FlightStatus(message[0] & 0x7),
            downlink_request: (message[1] >> 3) & 0x1F,
            utility_message: utility_message(message),
            altitude: gillham::decode_ac13(ac13_code(message)),
        },
        5 => DfFields::IdentityReply {
            icao: crc::checksum_addr(message),
            flight_status: FlightStatus(message[0] & 0x7),
            downlink_request: (message[1] >> 3) & 0x1F,
            utility_message: utility_message(message),
            identity: gillham::decode_id13(ac13_code(message)),
        },
        11 => DfFields::AllCall {
            icao: icao_bytes(message),
            capability: Capability(message[0] & 0x7),
        },
        16 => DfFields::LongAirAir {
            icao: crc::checksum_addr(message),
            vertical_status: VerticalStatus::from_bit((message[0] >> 2) & 1),
            sensitivity_level: (message[1] >> 5) & 0x7,
            reply_information: reply_information(message),
            altitude: gillham::decode_ac13(ac13_code(message)),
        },
        17 => DfFields::ExtendedSquitter {
            icao: icao_bytes(message),
            capability: Capability(message[0] & 0x7),
            me: adsb::decode_me(&message[4..11]),
        },
        18 => {
            let cf = message[0] & 0x7;
            if cf == 0 {
                DfFields::NonTransponder {
                    control_field: cf,
                    icao: Some(icao_bytes(message)),
                    me: Some(adsb::decode_me(&message[4..11])),
                }
            } else {
                DfFields::NonTransponder {
                    control_field: cf,
                    icao: None,
                    me: None,
                }
            }
        }
        20 => {
            let comm_b: [u8; 7] = message[4..11].try_into().unwrap_or_default();
            DfFields::CommBAltitude {
                icao: crc::checksum_addr(message),
                flight_status: FlightStatus(message[0] & 0x7),
                altitude: gillham::decode_ac13(ac13_code(message)),
                callsign: bds20_callsign(&comm_b),
                comm_b,
            }
        }
        21 => {
            let comm_b: [u8; 7] = message[4..11].try_into().unwrap_or_default();
            DfFields::CommBIdentity {
                icao: crc::checksum_addr(message),
                flight_status: FlightStatus(message[0] & 0x7),
                identity: gillham::decode_id13(ac13_code(message)),
                callsign: bds20_callsign(&comm_b),
                comm_b,
            }
        }
        _ => DfFields::Unsupported,
    };

    Ok((df, fields))
}

/// The shared 13-bit AC/ID field: low 5 bits of byte 2 and all of byte 3.
fn ac13_code(message: &[u8]) -> u16 {
    (message[2] as u16 & 0x1F) << 8 | message[3] as u16
}

/// RI spans the byte 1/2 boundary: bits 14-17 of the message.
fn reply_information(message: &[u8]) -> u8 {
    (message[1] & 0x7) << 1 | (message[2] & 0x80) >> 7
}

/// UM spans the byte 1/2 boundary: bits 14-19 of the message.
fn utility_message(message: &[u8]) -> u8 {
    (message[1] & 0x7) << 3 | (message[2] & 0xE0) >> 5
}

/// Comm-B BDS 2,0 register: byte 0 is 0x20, the rest is an AIS callsign.
fn bds20_callsign(comm_b: &[u8; 7]) -> Option<String> {
    if comm_b[0] != 0x20 {
        return None;
    }
    let callsign = gillham::decode_callsign(&[
        comm_b[1], comm_b[2], comm_b[3], comm_b[4], comm_b[5], comm_b[6],
    ]);
    if callsign.is_empty() {
        None
    } else {
        Some(callsign)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
