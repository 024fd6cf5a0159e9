//! modes-decode: bit-level decoder for Mode S / ADS-B surveillance
//! frames from ground-station feeds.
//!
//! No async, no I/O — just the frame path. Feeds hand in raw Beast
//! binary records or AVR hex lines; out come [`Frame`]s with CRC-checked
//! payloads, recovered ICAO addresses, and per-DF decoded fields.
//!
//! ```
//! use std::time::SystemTime;
//!
//! let mut frame =
//!     modes_decode::parse_avr("*8D4840D6202CC371C32CE0576098;", SystemTime::now()).unwrap();
//! frame.decode().unwrap();
//! assert_eq!(frame.icao_str().as_deref(), Some("4840D6"));
//! assert_eq!(frame.flight().map(str::trim_end), Some("KLM1023"));
//! ```

pub mod adsb;
pub mod avr;
pub mod beast;
pub mod crc;
pub mod decode;
pub mod frame;
pub mod gillham;
pub mod icao;
pub mod pool;
pub mod receiver;
pub mod types;

// Re-export the consumer surface at the crate root
pub use adsb::MessageExtension;
pub use avr::{parse_avr, AvrView};
pub use beast::{parse_beast, BeastType, SignalRssi};
pub use decode::DfFields;
pub use frame::{DecodeOptions, Frame, FrameMode};
pub use pool::{FramePool, LengthClass};
pub use receiver::{Receiver, ReceiverOptions};
pub use types::{Altitude, Capability, DecodeError, FlightStatus, Icao, Result, VerticalStatus};
