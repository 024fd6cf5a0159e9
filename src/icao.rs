//! Time-windowed cache of CRC-validated ICAO addresses.
//!
//! Addresses seen in zero-syndrome DF11/17/18 frames are trustworthy;
//! addresses recovered from the parity overlay of DF0/4/5/16/20/21 are
//! not — bit noise folds into a perfectly plausible-looking address. The
//! cache accepts an overlay-recovered address only if the same address
//! was recently seen in a validated frame.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::types::Icao;

/// Default window an address stays valid after a validated sighting.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct IcaoCache {
    ttl: Duration,
    seen: HashMap<Icao, SystemTime>,
}

impl IcaoCache {
    pub fn new(ttl: Duration) -> Self {
        IcaoCache {
            ttl,
            seen: HashMap::new(),
        }
    }

    /// Register an address from a CRC-validated frame.
    pub fn register(&mut self, icao: Icao, timestamp: SystemTime) {
        self.seen.insert(icao, timestamp);
    }

    /// Whether the address was seen in a validated frame within the TTL.
    pub fn is_known(&mut self, icao: Icao, now: SystemTime) -> bool {
        if let Some(&last_seen) = self.seen.get(&icao) {
            match now.duration_since(last_seen) {
                Ok(age) if age <= self.ttl => return true,
                // Future-dated sightings count as fresh too
                Err(_) => return true,
                Ok(_) => {
                    self.seen.remove(&icao);
                }
            }
        }
        false
    }

    /// Drop expired entries.
    pub fn prune(&mut self, now: SystemTime) {
        let ttl = self.ttl;
        self.seen
            .retain(|_, &mut last_seen| match now.duration_since(last_seen) {
                Ok(age) => age <= ttl,
                Err(_) => true,
            });
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for IcaoCache {
    fn default() -> Self {
        IcaoCache::new(DEFAULT_TTL)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
