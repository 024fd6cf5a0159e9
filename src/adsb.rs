//! ADS-B Message Extension (ME) sub-decoder for DF17/18.
//!
//! The 56-bit ME field carries one of a family of message types selected
//! by the 5-bit Type Code (TC) and, for some, a 3-bit Subtype (ST). Each
//! decoder records the raw extracted fields; nothing is interpolated
//! across frames, and CPR positions are kept as raw 17-bit lat/lon.

use serde::Serialize;

use crate::gillham;
use crate::types::Altitude;

/// Emergency/priority state reported in aircraft status messages.
pub const EMERGENCY_STATE_TABLE: [&str; 8] = [
    "no emergency",
    "general emergency",
    "lifeguard / medical emergency",
    "minimum fuel",
    "no communications",
    "unlawful interference",
    "downed aircraft",
    "reserved",
];

// ---------------------------------------------------------------------------
// Typed sub-payloads
// ---------------------------------------------------------------------------

/// Decoded ME field of an extended squitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MessageExtension {
    /// TC 1-4: aircraft identification.
    Identification(Identification),
    /// TC 5-8: surface position.
    SurfacePosition(SurfacePosition),
    /// TC 9-18 (barometric) and 20-22 (GNSS): airborne position.
    AirbornePosition(AirbornePosition),
    /// TC 19: airborne velocity.
    Velocity(Velocity),
    /// TC 23 ST 7: emergency squawk broadcast.
    EmergencyStatus(EmergencyStatus),
    /// TC 28 ST 1: emergency / priority status.
    AircraftStatus(AircraftStatus),
    /// TC 29 ST 1: target state and status.
    TargetState(TargetState),
    /// TC 31: aircraft operational status.
    OperationalStatus(OperationalStatus),
    /// Any (TC, ST) combination without a decoder.
    Unsupported { type_code: u8, sub_type: u8 },
}

impl MessageExtension {
    /// The subtype the variant was decoded from (0 where the TC has none).
    pub fn sub_type(&self) -> u8 {
        match self {
            MessageExtension::Identification(_) => 0,
            MessageExtension::SurfacePosition(_) => 0,
            MessageExtension::AirbornePosition(_) => 0,
            MessageExtension::Velocity(v) => v.sub_type(),
            MessageExtension::EmergencyStatus(e) => e.sub_type,
            MessageExtension::AircraftStatus(a) => a.sub_type,
            MessageExtension::TargetState(t) => t.sub_type,
            MessageExtension::OperationalStatus(o) => o.sub_type,
            MessageExtension::Unsupported { sub_type, .. } => *sub_type,
        }
    }
}

/// TC 1-4 identification: emitter category and AIS-6 callsign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    pub type_code: u8,
    pub category: u8,
    /// Eight AIS characters, or empty for the all-`@` sentinel.
    pub callsign: String,
}

/// Raw 17-bit CPR coordinates plus the odd/even frame flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CprPosition {
    pub odd: bool,
    pub lat: u32,
    pub lon: u32,
}

/// TC 5-8 surface position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfacePosition {
    /// 7-bit ground movement (speed) code.
    pub movement: u8,
    pub track_valid: bool,
    /// 7-bit ground track code; degrees = code * 360 / 128.
    pub track: u8,
    pub cpr: CprPosition,
}

/// Where an airborne position's altitude code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeSource {
    Barometric,
    Gnss,
}

/// TC 9-18 / 20-22 airborne position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AirbornePosition {
    pub source: AltitudeSource,
    pub surveillance_status: u8,
    pub single_antenna: bool,
    /// Raw 12-bit altitude code.
    pub altitude_code: u16,
    /// Decoded barometric altitude; `None` for GNSS codes and
    /// undecodable values.
    pub altitude: Option<Altitude>,
    pub cpr: CprPosition,
}

/// TC 19 airborne velocity, subtypes 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Velocity {
    /// ST 1 (subsonic) / ST 2 (supersonic): ground speed components.
    GroundSpeed(GroundSpeed),
    /// ST 3 (subsonic) / ST 4 (supersonic): airspeed and heading.
    Airspeed(Airspeed),
}

impl Velocity {
    pub fn sub_type(&self) -> u8 {
        match self {
            Velocity::GroundSpeed(g) => g.sub_type,
            Velocity::Airspeed(a) => a.sub_type,
        }
    }

    pub fn vertical_rate(&self) -> VerticalRate {
        match self {
            Velocity::GroundSpeed(g) => g.vertical_rate,
            Velocity::Airspeed(a) => a.vertical_rate,
        }
    }
}

/// East/west and north/south ground speed components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroundSpeed {
    pub sub_type: u8,
    pub west: bool,
    /// E/W component in knots; `None` when not available.
    pub ew_velocity: Option<u16>,
    pub south: bool,
    /// N/S component in knots; `None` when not available.
    pub ns_velocity: Option<u16>,
    pub vertical_rate: VerticalRate,
    /// Ground speed in knots computed from the components.
    pub speed: Option<f64>,
    /// True track in degrees clockwise from north.
    pub track: Option<f64>,
}

/// Airspeed and magnetic heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Airspeed {
    pub sub_type: u8,
    /// Magnetic heading in degrees; `None` when not available.
    pub heading: Option<f64>,
    /// True airspeed when set, indicated airspeed otherwise.
    pub true_airspeed: bool,
    /// Airspeed in knots; `None` when not available.
    pub airspeed: Option<u16>,
    pub vertical_rate: VerticalRate,
}

/// Signed vertical rate with its source bit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VerticalRate {
    /// Source bit: barometric when set, GNSS otherwise.
    pub barometric: bool,
    /// Rate in ft/min, negative descending; `None` when not available.
    pub rate: Option<i32>,
}

/// TC 23 ST 7 squawk broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyStatus {
    pub sub_type: u8,
    /// Squawk as four octal digits in decimal form.
    pub identity: u32,
}

/// TC 28 ST 1 emergency / priority status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AircraftStatus {
    pub sub_type: u8,
    /// Index into [`EMERGENCY_STATE_TABLE`].
    pub emergency_state: u8,
    /// Squawk as four octal digits in decimal form.
    pub identity: u32,
}

/// TC 29 ST 1 target state and status (version 2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetState {
    pub sub_type: u8,
    /// Selected altitude is FMS-sourced when set, MCP/FCU otherwise.
    pub fms_altitude: bool,
    /// Selected altitude in feet.
    pub selected_altitude: Option<u32>,
    /// Barometric pressure setting in millibars, QNH minus 800.
    pub baro_setting: Option<f64>,
    /// Selected heading in degrees.
    pub selected_heading: Option<f64>,
    pub autopilot: bool,
    pub vnav: bool,
    pub altitude_hold: bool,
    pub approach: bool,
    pub tcas_operational: bool,
}

/// TC 31 aircraft operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationalStatus {
    /// 0 = airborne, 1 = surface.
    pub sub_type: u8,
    pub capability_class: u16,
    pub operational_mode: u16,
    /// ADS-B version number (0, 1 or 2).
    pub version: u8,
    pub nic_supplement_a: bool,
    pub nac_p: u8,
    pub gva: u8,
    pub sil: u8,
    pub nic_baro: bool,
    /// Horizontal reference: magnetic north when set, true north otherwise.
    pub hrd: bool,
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

/// Decode the 7-byte ME field, dispatching on (TC, ST).
pub(crate) fn decode_me(me: &[u8]) -> MessageExtension {
    debug_assert_eq!(me.len(), 7);

    let tc = me[0] >> 3;
    let st = me[0] & 0x07;
    let bits = me_bits(me);

    match tc {
        1..=4 => MessageExtension::Identification(Identification {
            type_code: tc,
            category: st,
            callsign: gillham::decode_callsign(&[me[1], me[2], me[3], me[4], me[5], me[6]]),
        }),
        5..=8 => MessageExtension::SurfacePosition(decode_surface_position(bits)),
        9..=18 => MessageExtension::AirbornePosition(decode_airborne_position(
            bits,
            AltitudeSource::Barometric,
        )),
        19 => match st {
            1 | 2 => MessageExtension::Velocity(Velocity::GroundSpeed(decode_ground_speed(
                bits, st,
            ))),
            3 | 4 => MessageExtension::Velocity(Velocity::Airspeed(decode_airspeed(bits, st))),
            _ => MessageExtension::Unsupported {
                type_code: tc,
                sub_type: st,
            },
        },
        20..=22 => MessageExtension::AirbornePosition(decode_airborne_position(
            bits,
            AltitudeSource::Gnss,
        )),
        23 if st == 7 => MessageExtension::EmergencyStatus(EmergencyStatus {
            sub_type: st,
            identity: gillham::decode_id13(((bits >> 35) & 0x1FFF) as u16),
        }),
        28 if st == 1 => MessageExtension::AircraftStatus(AircraftStatus {
            sub_type: st,
            emergency_state: ((bits >> 45) & 0x7) as u8,
            identity: gillham::decode_id13(((bits >> 32) & 0x1FFF) as u16),
        }),
        29 => {
            // TC 29 carries a 2-bit subtype
            let st2 = (me[0] >> 1) & 0x03;
            if st2 == 1 {
                MessageExtension::TargetState(decode_target_state(bits, st2))
            } else {
                MessageExtension::Unsupported {
                    type_code: tc,
                    sub_type: st2,
                }
            }
        }
        31 if st <= 1 => MessageExtension::OperationalStatus(decode_operational_status(me, st)),
        _ => MessageExtension::Unsupported {
            type_code: tc,
            sub_type: st,
        },
    }
}

/// The 56 ME bits packed into the low bits of a u64, so ME bit `n`
/// (1-based) sits at position `56 - n`.
fn me_bits(me: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[1..8].copy_from_slice(me);
    u64::from_be_bytes(buf)
}

fn decode_surface_position(bits: u64) -> SurfacePosition {
    SurfacePosition {
        movement: ((bits >> 44) & 0x7F) as u8,
        track_valid: (bits >> 43) & 1 == 1,
        track: ((bits >> 36) & 0x7F) as u8,
        cpr: decode_cpr(bits),
    }
}

fn decode_airborne_position(bits: u64, source: AltitudeSource) -> AirbornePosition {
    let altitude_code = ((bits >> 36) & 0x0FFF) as u16;
    let altitude = match source {
        AltitudeSource::Barometric => gillham::decode_ac12(altitude_code),
        AltitudeSource::Gnss => None,
    };

    AirbornePosition {
        source,
        surveillance_status: ((bits >> 49) & 0x03) as u8,
        single_antenna: (bits >> 48) & 1 == 1,
        altitude_code,
        altitude,
        cpr: decode_cpr(bits),
    }
}

fn decode_cpr(bits: u64) -> CprPosition {
    CprPosition {
        odd: (bits >> 34) & 1 == 1,
        lat: ((bits >> 17) & 0x1FFFF) as u32,
        lon: (bits & 0x1FFFF) as u32,
    }
}

fn decode_ground_speed(bits: u64, st: u8) -> GroundSpeed {
    // ST 2 is the supersonic encoding: components scale by 4
    let scale = if st == 2 { 4 } else { 1 };

    let west = (bits >> 42) & 1 == 1;
    let ew_raw = ((bits >> 32) & 0x3FF) as u16;
    let south = (bits >> 31) & 1 == 1;
    let ns_raw = ((bits >> 21) & 0x3FF) as u16;

    let ew_velocity = (ew_raw > 0).then(|| (ew_raw - 1) * scale);
    let ns_velocity = (ns_raw > 0).then(|| (ns_raw - 1) * scale);

    let (speed, track) = match (ew_velocity, ns_velocity) {
        (Some(ew), Some(ns)) => {
            let vx = if west { -f64::from(ew) } else { f64::from(ew) };
            let vy = if south { -f64::from(ns) } else { f64::from(ns) };
            let speed = (vx * vx + vy * vy).sqrt();
            let track = vx.atan2(vy).to_degrees().rem_euclid(360.0);
            (Some(round2(speed)), Some(round2(track)))
        }
        _ => (None, None),
    };

    GroundSpeed {
        sub_type: st,
        west,
        ew_velocity,
        south,
        ns_velocity,
        vertical_rate: decode_vertical_rate(bits),
        speed,
        track,
    }
}

fn decode_airspeed(bits: u64, st: u8) -> Airspeed {
    let scale = if st == 4 { 4 } else { 1 };

    let heading = ((bits >> 42) & 1 == 1)
        .then(|| round2(((bits >> 32) & 0x3FF) as f64 * 360.0 / 1024.0));
    let airspeed_raw = ((bits >> 21) & 0x3FF) as u16;

    Airspeed {
        sub_type: st,
        heading,
        true_airspeed: (bits >> 31) & 1 == 1,
        airspeed: (airspeed_raw > 0).then(|| (airspeed_raw - 1) * scale),
        vertical_rate: decode_vertical_rate(bits),
    }
}

fn decode_vertical_rate(bits: u64) -> VerticalRate {
    let raw = ((bits >> 10) & 0x1FF) as i32;
    let rate = (raw > 0).then(|| {
        let fpm = (raw - 1) * 64;
        if (bits >> 19) & 1 == 1 {
            -fpm
        } else {
            fpm
        }
    });

    VerticalRate {
        barometric: (bits >> 20) & 1 == 1,
        rate,
    }
}

fn decode_target_state(bits: u64, st: u8) -> TargetState {
    let alt_raw = ((bits >> 36) & 0x7FF) as u32;
    let baro_raw = ((bits >> 27) & 0x1FF) as u32;
    let heading = ((bits >> 26) & 1 == 1)
        .then(|| round2(((bits >> 17) & 0x1FF) as f64 * 180.0 / 256.0));

    TargetState {
        sub_type: st,
        fms_altitude: (bits >> 47) & 1 == 1,
        selected_altitude: (alt_raw > 0).then(|| (alt_raw - 1) * 32),
        baro_setting: (baro_raw > 0).then(|| f64::from(baro_raw - 1) * 0.8 + 800.0),
        selected_heading: heading,
        autopilot: (bits >> 8) & 1 == 1,
        vnav: (bits >> 7) & 1 == 1,
        altitude_hold: (bits >> 6) & 1 == 1,
        approach: (bits >> 4) & 1 == 1,
        tcas_operational: (bits >> 3) & 1 == 1,
    }
}

fn decode_operational_status(me: &[u8], st: u8) -> OperationalStatus {
    OperationalStatus {
        sub_type: st,
        capability_class: u16::from_be_bytes([me[1], me[2]]),
        operational_mode: u16::from_be_bytes([me[3], me[4]]),
        version: (me[5] >> 5) & 0x7,
        nic_supplement_a: (me[5] >> 4) & 1 == 1,
        nac_p: me[5] & 0x0F,
        gva: (me[6] >> 6) & 0x3,
        sil: (me[6] >> 4) & 0x3,
        nic_baro: (me[6] >> 3) & 1 == 1,
        hrd: (me[6] >> 2) & 1 == 1,
    }
}

/// Round to 2 decimal places.
fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
