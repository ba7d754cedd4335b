//! Lock-free parameter hand-off between the control thread and the audio thread
//!
//! Control-plane writers publish a whole [`ParamSnapshot`] under a sequence
//! counter (seqlock). The audio thread reads without ever waiting: a read
//! that overlaps a write is discarded and retried on the next call.

use crate::dsp::distortion::sanitize_threshold;
use crate::dsp::filter::validate_design;
use crate::error::{FxError, Result};
use crossbeam::utils::CachePadded;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One consistent set of chain parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSnapshot {
    pub gain: f32,
    pub threshold: f32,
    pub cutoff: f32,
    pub fuzz_enabled: bool,
    pub filter_enabled: bool,
}

/// Atomic storage for a [`ParamSnapshot`]
///
/// `f32` values are stored as their bit patterns. `sequence` is odd while
/// a write is in progress and advances by two per published snapshot. It
/// sits on its own cache line so the audio thread's polling does not share
/// a line with the fields being written.
#[derive(Debug)]
pub struct SharedParams {
    sequence: CachePadded<AtomicU64>,
    gain: AtomicU32,
    threshold: AtomicU32,
    cutoff: AtomicU32,
    fuzz_enabled: AtomicBool,
    filter_enabled: AtomicBool,
    sample_rate: f64,
    writer: Mutex<()>,
}

impl SharedParams {
    pub fn new(sample_rate: f64, initial: ParamSnapshot) -> Self {
        Self {
            sequence: CachePadded::new(AtomicU64::new(0)),
            gain: AtomicU32::new(initial.gain.to_bits()),
            threshold: AtomicU32::new(initial.threshold.to_bits()),
            cutoff: AtomicU32::new(initial.cutoff.to_bits()),
            fuzz_enabled: AtomicBool::new(initial.fuzz_enabled),
            filter_enabled: AtomicBool::new(initial.filter_enabled),
            sample_rate,
            writer: Mutex::new(()),
        }
    }

    /// Current published sequence number (even when no write is in flight)
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Sample rate the cutoff is validated against
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Wait-free read for the audio thread
    ///
    /// Returns `None` when nothing newer than `last_seen` has been published
    /// or when a writer is mid-update.
    pub fn read_if_newer(&self, last_seen: u64) -> Option<(u64, ParamSnapshot)> {
        let before = self.sequence.load(Ordering::Acquire);
        if before == last_seen || before & 1 == 1 {
            return None;
        }

        let snapshot = self.load_fields();

        fence(Ordering::Acquire);
        let after = self.sequence.load(Ordering::Relaxed);
        if before != after {
            return None;
        }
        Some((before, snapshot))
    }

    /// Read the latest consistent snapshot, spinning past in-flight writes
    ///
    /// Control-plane only.
    pub fn load(&self) -> ParamSnapshot {
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let snapshot = self.load_fields();
            fence(Ordering::Acquire);
            if self.sequence.load(Ordering::Relaxed) == before {
                return snapshot;
            }
        }
    }

    /// Publish a new snapshot without validation; writers are serialized
    pub(crate) fn store(&self, snapshot: ParamSnapshot) {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.store_locked(snapshot);
    }

    /// Read-modify-write under the writer lock
    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ParamSnapshot),
    {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut snapshot = self.load_fields();
        f(&mut snapshot);
        self.store_locked(snapshot);
    }

    fn store_locked(&self, snapshot: ParamSnapshot) {
        let seq = self.sequence.load(Ordering::Relaxed);
        self.sequence.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.gain.store(snapshot.gain.to_bits(), Ordering::Relaxed);
        self.threshold
            .store(snapshot.threshold.to_bits(), Ordering::Relaxed);
        self.cutoff.store(snapshot.cutoff.to_bits(), Ordering::Relaxed);
        self.fuzz_enabled
            .store(snapshot.fuzz_enabled, Ordering::Relaxed);
        self.filter_enabled
            .store(snapshot.filter_enabled, Ordering::Relaxed);

        self.sequence.store(seq.wrapping_add(2), Ordering::Release);
    }

    fn load_fields(&self) -> ParamSnapshot {
        ParamSnapshot {
            gain: f32::from_bits(self.gain.load(Ordering::Relaxed)),
            threshold: f32::from_bits(self.threshold.load(Ordering::Relaxed)),
            cutoff: f32::from_bits(self.cutoff.load(Ordering::Relaxed)),
            fuzz_enabled: self.fuzz_enabled.load(Ordering::Relaxed),
            filter_enabled: self.filter_enabled.load(Ordering::Relaxed),
        }
    }
}

/// Control-plane handle to a running chain
///
/// Cheap to clone and `Send + Sync`. Every setter validates before
/// publishing, so the audio thread only ever sees usable values.
#[derive(Debug, Clone)]
pub struct ChainController {
    shared: Arc<SharedParams>,
}

impl ChainController {
    pub(crate) fn new(shared: Arc<SharedParams>) -> Self {
        Self { shared }
    }

    /// Latest published parameters
    pub fn snapshot(&self) -> ParamSnapshot {
        self.shared.load()
    }

    pub fn set_gain(&self, gain: f32) -> Result<()> {
        if !gain.is_finite() {
            return Err(invalid("gain", gain, "finite number"));
        }
        self.shared.update(|p| p.gain = gain);
        Ok(())
    }

    /// Threshold magnitude is clamped to a small positive epsilon
    pub fn set_threshold(&self, threshold: f32) -> Result<()> {
        if !threshold.is_finite() {
            return Err(invalid("threshold", threshold, "finite number"));
        }
        self.shared
            .update(|p| p.threshold = sanitize_threshold(threshold));
        Ok(())
    }

    /// Rejected (nothing published) unless `0 < cutoff < sample_rate / 2`
    /// and the resulting design is stable
    pub fn set_cutoff(&self, cutoff: f32) -> Result<()> {
        if let Err(e) = validate_design(self.shared.sample_rate(), cutoff as f64) {
            log::warn!("Controller rejected cutoff: {}", e);
            return Err(e);
        }
        self.shared.update(|p| p.cutoff = cutoff);
        Ok(())
    }

    pub fn set_fuzz_enabled(&self, enabled: bool) {
        self.shared.update(|p| p.fuzz_enabled = enabled);
    }

    pub fn set_filter_enabled(&self, enabled: bool) {
        self.shared.update(|p| p.filter_enabled = enabled);
    }

    /// Publish a complete snapshot after validating it
    pub fn publish(&self, snapshot: ParamSnapshot) -> Result<()> {
        if !snapshot.gain.is_finite() {
            return Err(invalid("gain", snapshot.gain, "finite number"));
        }
        if !snapshot.threshold.is_finite() {
            return Err(invalid("threshold", snapshot.threshold, "finite number"));
        }
        if let Err(e) = validate_design(self.shared.sample_rate(), snapshot.cutoff as f64) {
            log::warn!("Controller rejected snapshot: {}", e);
            return Err(e);
        }
        self.shared.store(ParamSnapshot {
            threshold: sanitize_threshold(snapshot.threshold),
            ..snapshot
        });
        Ok(())
    }
}

fn invalid(param: &str, value: f32, expected: &str) -> FxError {
    FxError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}
