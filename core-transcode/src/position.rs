//! # Stream Position Tracking
//!
//! Converts between byte offsets and tick timestamps and keeps the byte
//! position of a decode stream consistent across seeks.
//!
//! A tick is 100 ns ([`TICKS_PER_SECOND`]). All conversions use 128-bit
//! intermediates, so multi-hour streams at high byte rates never overflow.
//!
//! ## Resynchronization
//!
//! After a seek the native decoder usually restarts at a nearby frame
//! boundary rather than the exact tick requested. The first unit delivered
//! after the seek re-anchors the position from its timestamp. Native
//! timestamps are truncated tick values of a sample-frame index, so the
//! re-anchored offset is snapped to the nearest block boundary: a unit stamped
//! `to_ticks(20000)` lands back on byte 20000 exactly.

use bridge_traits::{AudioFormat, TICKS_PER_SECOND};
use tracing::{debug, warn};

/// How much the reported position can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionAccuracy {
    /// Derived from codec timestamps or an unbroken byte count.
    Exact,
    /// A seek completed without a usable timestamp; the position counts
    /// from the requested seek target.
    Estimated,
}

/// Convert a tick timestamp to a byte offset, rounding down.
///
/// Negative timestamps clamp to 0.
pub fn to_byte_offset(ticks: i64, format: &AudioFormat) -> u64 {
    if ticks <= 0 {
        return 0;
    }
    let bytes = ticks as u128 * format.bytes_per_second() as u128 / TICKS_PER_SECOND as u128;
    u64::try_from(bytes).unwrap_or(u64::MAX)
}

/// Convert a byte offset to ticks, rounding down.
pub fn to_ticks(bytes: u64, format: &AudioFormat) -> i64 {
    let bps = format.bytes_per_second();
    if bps == 0 {
        return 0;
    }
    let ticks = bytes as u128 * TICKS_PER_SECOND as u128 / bps as u128;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

/// Byte offset of the block boundary nearest to `ticks`.
///
/// Inverts [`to_ticks`] exactly for block-aligned offsets, which plain
/// [`to_byte_offset`] does not since both directions truncate.
pub fn nearest_block_offset(ticks: i64, format: &AudioFormat) -> u64 {
    if ticks <= 0 {
        return 0;
    }
    let block = format.block_align.max(1) as u128;
    let numerator = ticks as u128 * format.bytes_per_second() as u128;
    let denominator = TICKS_PER_SECOND as u128 * block;
    let blocks = (numerator + denominator / 2) / denominator;
    u64::try_from(blocks * block).unwrap_or(u64::MAX)
}

/// Byte position of a decode stream.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    format: AudioFormat,
    position: u64,
    resync_pending: bool,
    accuracy: PositionAccuracy,
}

impl PositionTracker {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            position: 0,
            resync_pending: false,
            accuracy: PositionAccuracy::Exact,
        }
    }

    /// Bytes delivered so far, or the pending seek target.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn accuracy(&self) -> PositionAccuracy {
        self.accuracy
    }

    /// Returns `true` between a seek and the first unit that follows it.
    pub fn is_resync_pending(&self) -> bool {
        self.resync_pending
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Account for `bytes` delivered to the caller.
    pub fn advance(&mut self, bytes: usize) {
        self.position = self.position.saturating_add(bytes as u64);
    }

    /// Record a seek to `byte_position` and arm resynchronization.
    pub fn begin_seek(&mut self, byte_position: u64) {
        self.position = byte_position;
        self.resync_pending = true;
    }

    /// Feed the timestamp of a freshly decoded unit.
    ///
    /// Only the first unit after a seek changes the position. Returns `true`
    /// when the position was re-anchored.
    pub fn observe_unit(&mut self, timestamp: Option<i64>) -> bool {
        if !self.resync_pending {
            return false;
        }
        self.resync_pending = false;

        match timestamp {
            Some(ticks) => {
                self.resync(ticks);
                true
            }
            None => {
                self.accuracy = PositionAccuracy::Estimated;
                warn!(
                    position = self.position,
                    "First unit after seek carries no timestamp; position is estimated"
                );
                false
            }
        }
    }

    /// Set the position from a codec timestamp.
    pub fn resync(&mut self, ticks: i64) {
        let anchored = nearest_block_offset(ticks, &self.format);
        debug!(
            ticks,
            requested = self.position,
            anchored,
            "Resynchronized position from unit timestamp"
        );
        self.position = anchored;
        self.accuracy = PositionAccuracy::Exact;
    }
}
