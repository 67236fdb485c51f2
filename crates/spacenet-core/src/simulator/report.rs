//! Run summaries and deterministic fingerprints.
//!
//! A [`RunReport`] captures what a caller needs after a run: the clock it
//! ended at, how many events executed, and the full [`SimLog`]. Reports are
//! plain serde values; [`fingerprint`] encodes any such value with `bitcode`
//! and hashes the bytes, so two runs of the same scenario can be compared
//! with a single `u64`.

use super::Simulator;
use crate::log::SimLog;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[cfg(feature = "report-json")]
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Run hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) over encoded report bytes. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHash(pub u64);

impl RunHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for RunHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash the `bitcode` encoding of `value`.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<u64, ReportError> {
    let bytes = bitcode::serialize(value).map_err(|e| ReportError::Encode(e.to_string()))?;
    let mut hash = RunHash::new();
    hash.write(&bytes);
    Ok(hash.finish())
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Outcome of one simulator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: String,
    /// Clock when the run stopped, in days.
    pub end_time: f64,
    pub events_executed: u64,
    pub log: SimLog,
}

impl RunReport {
    pub fn new(sim: &Simulator) -> Self {
        Self {
            scenario: sim.scenario().name.clone(),
            end_time: sim.clock(),
            events_executed: sim.events_executed(),
            log: sim.log().clone(),
        }
    }

    /// Whether every demand was met and every event found its elements.
    pub fn is_clean(&self) -> bool {
        self.log.is_clean()
    }

    pub fn fingerprint(&self) -> Result<u64, ReportError> {
        fingerprint(self)
    }

    #[cfg(feature = "report-json")]
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
