//! Per-stream ingest front-end.
//!
//! A `Receiver` owns the pieces a feed needs beyond the pure parsers:
//! the frame pool, the ICAO plausibility cache, and the decode options.
//! One receiver per stream; methods take `&mut self` and the decoder
//! stays synchronous — run one receiver per thread for parallel feeds.

use std::time::SystemTime;

use crate::avr;
use crate::beast::{self, BeastType};
use crate::decode;
use crate::frame::{DecodeOptions, Frame};
use crate::icao::{IcaoCache, DEFAULT_TTL};
use crate::pool::{FramePool, LengthClass};
use crate::types::{DecodeError, Result};

/// Receiver behavior toggles. Everything defaults off.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiverOptions {
    /// Recycle frames through a pool instead of allocating per message.
    pub use_pool: bool,
    /// Reject parity-recovered ICAO addresses not recently seen in a
    /// CRC-validated frame.
    pub validate_icao: bool,
    /// Attempt 1-2 bit CRC repair on extended squitters.
    pub repair_crc: bool,
}

/// Stateful parse-and-decode front-end for one feed.
#[derive(Debug, Default)]
pub struct Receiver {
    options: ReceiverOptions,
    pool: FramePool,
    icao_cache: IcaoCache,
}

impl Receiver {
    pub fn new(options: ReceiverOptions) -> Self {
        Receiver {
            options,
            pool: FramePool::new(),
            icao_cache: IcaoCache::new(DEFAULT_TTL),
        }
    }

    /// Parse and decode one AVR line.
    pub fn receive_avr(&mut self, line: &str, now: SystemTime) -> Result<Frame> {
        let frame = self.checkout(LengthClass::Long);
        self.ingest(frame, now, |frame| avr::parse_into(frame, line, now))
    }

    /// Parse and decode one byte-stuffed Beast record.
    ///
    /// Mode A/C records come back parsed but undecoded; they have no
    /// Mode S payload.
    pub fn receive_beast(&mut self, record: &[u8], now: SystemTime) -> Result<Frame> {
        // The type byte can't be 0x1A, so it is safe to sniff unstuffed
        let class = match record.get(1) {
            Some(0x33) => LengthClass::Long,
            _ => LengthClass::Short,
        };
        let frame = self.checkout(class);
        self.ingest(frame, now, |frame| beast::parse_into(frame, record, now))
    }

    /// Return a frame to the pool, when pooling is on.
    pub fn release(&self, frame: Frame) {
        if self.options.use_pool {
            self.pool.release(frame);
        }
    }

    fn checkout(&self, class: LengthClass) -> Frame {
        if self.options.use_pool {
            self.pool.acquire(class)
        } else {
            Frame::default()
        }
    }

    fn ingest(
        &mut self,
        mut frame: Frame,
        now: SystemTime,
        parse: impl FnOnce(&mut Frame) -> Result<()>,
    ) -> Result<Frame> {
        let result = parse(&mut frame).and_then(|()| self.decode(&mut frame));
        match result {
            Ok(()) => Ok(frame),
            Err(err) => {
                self.release(frame);
                Err(err)
            }
        }
    }

    fn decode(&mut self, frame: &mut Frame) -> Result<()> {
        if frame.msg_type() == Some(BeastType::ModeAc) {
            return Ok(());
        }

        frame.decode_with(&DecodeOptions {
            repair_crc: self.options.repair_crc,
        })?;
        self.observe_icao(frame)
    }

    /// Feed the ICAO cache: register addresses from CRC-validated DFs,
    /// check overlay-recovered ones against it.
    fn observe_icao(&mut self, frame: &Frame) -> Result<()> {
        let (Some(df), Some(icao)) = (frame.downlink_format(), frame.icao()) else {
            return Ok(());
        };

        if decode::is_overlay_df(df) {
            if self.options.validate_icao && !self.icao_cache.is_known(icao, frame.timestamp()) {
                return Err(DecodeError::UntrustedIcao(icao));
            }
        } else if self.options.validate_icao {
            self.icao_cache.register(icao, frame.timestamp());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DF11_RECORD: &[u8] = &[
        0x1A, 0x32, 0x22, 0x1B, 0x54, 0xF0, 0x81, 0x2B, 0x26, 0x5D, 0x7C, 0x49, 0xF8, 0x28,
        0xE9, 0x43,
    ];

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    #[test]
    fn test_receive_avr_decodes() {
        let mut rx = Receiver::new(ReceiverOptions::default());
        let frame = rx
            .receive_avr("*8D4840D6202CC371C32CE0576098;", now())
            .unwrap();
        assert_eq!(frame.icao_str().as_deref(), Some("4840D6"));
        assert_eq!(frame.flight(), Some("KLM1023 "));
    }

    #[test]
    fn test_receive_beast_decodes() {
        let mut rx = Receiver::new(ReceiverOptions::default());
        let frame = rx.receive_beast(DF11_RECORD, now()).unwrap();
        assert_eq!(frame.downlink_format(), Some(11));
        assert_eq!(frame.icao(), Some(0x7C49F8));
    }

    #[test]
    fn test_pooled_receive_roundtrip() {
        let mut rx = Receiver::new(ReceiverOptions {
            use_pool: true,
            ..ReceiverOptions::default()
        });
        for _ in 0..3 {
            let frame = rx
                .receive_avr("*8D4840D6202CC371C32CE0576098;", now())
                .unwrap();
            assert_eq!(frame.icao(), Some(0x4840D6));
            rx.release(frame);
        }
    }

    #[test]
    fn test_parse_errors_propagate() {
        let mut rx = Receiver::new(ReceiverOptions {
            use_pool: true,
            ..ReceiverOptions::default()
        });
        assert!(matches!(
            rx.receive_avr("*8D4840;", now()),
            Err(DecodeError::ShortFrame(_))
        ));
    }

    #[test]
    fn test_icao_validation_rejects_unseen_overlay() {
        let mut rx = Receiver::new(ReceiverOptions {
            validate_icao: true,
            ..ReceiverOptions::default()
        });
        // DF20: address comes from the parity overlay, never validated
        assert!(matches!(
            rx.receive_avr("*A00017B1B129FB30E004002D88FB;", now()),
            Err(DecodeError::UntrustedIcao(_))
        ));
    }

    #[test]
    fn test_icao_validation_accepts_registered_overlay() {
        let mut rx = Receiver::new(ReceiverOptions {
            validate_icao: true,
            ..ReceiverOptions::default()
        });

        // Register the overlay address via a validated DF17 first
        let df17 = rx
            .receive_avr("*8D4840D6202CC371C32CE0576098;", now())
            .unwrap();
        let icao = df17.icao().unwrap();

        let overlay = rx.receive_avr("*A00017B1B129FB30E004002D88FB;", now());
        match overlay {
            Err(DecodeError::UntrustedIcao(recovered)) => assert_ne!(recovered, icao),
            Ok(frame) => assert_eq!(frame.icao(), Some(icao)),
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    #[test]
    fn test_mode_ac_passes_through_undecoded() {
        let mut rx = Receiver::new(ReceiverOptions::default());
        let record = [
            0x1A, 0x31, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let frame = rx.receive_beast(&record, now()).unwrap();
        assert!(!frame.decoded());
        assert_eq!(frame.msg_type(), Some(BeastType::ModeAc));
    }
}
