use serde::{Deserialize, Serialize};

/// Minimum interval between emitted updates.
///
/// Fast local networks can deliver byte callbacks every few milliseconds;
/// anything under ~4 updates/second only floods the UI.
const EMIT_INTERVAL_MS: u64 = 250;

/// A point-in-time observation of an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSample {
    pub bytes_sent: u64,
    /// 0 when the total is unknown.
    pub total_bytes: u64,
    /// Milliseconds since the session started.
    pub timestamp_ms: u64,
}

/// A UI-facing update derived from the two most recent samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Fraction complete in `[0, 1]`; 0 when the total is unknown.
    pub progress: f64,
    pub bytes_sent: u64,
    pub total_bytes: u64,
    /// Instantaneous speed in bytes/second. `None` (unknown, distinct
    /// from zero) until two time-separated samples exist.
    pub speed_bps: Option<f64>,
    /// Estimated whole seconds remaining. `None` when speed or total is
    /// unknown.
    pub eta_secs: Option<u64>,
    pub timestamp_ms: u64,
}

/// Turns raw byte-count samples into throttled speed/ETA updates.
///
/// Only the previous sample is retained — speed is instantaneous over
/// the last interval, not a windowed average. Emission is throttled to
/// one update per [`EMIT_INTERVAL_MS`], except the terminal 100% sample
/// which always emits so the UI is guaranteed a final progress event.
#[derive(Debug, Default)]
pub struct ProgressEstimator {
    prev: Option<ProgressSample>,
    last_emit_ms: Option<u64>,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample; returns an update unless throttled.
    pub fn offer(&mut self, sample: ProgressSample) -> Option<ProgressUpdate> {
        let speed_bps = self.prev.and_then(|prev| {
            let dt_ms = sample.timestamp_ms.checked_sub(prev.timestamp_ms)?;
            if dt_ms == 0 {
                return None;
            }
            let dbytes = sample.bytes_sent.saturating_sub(prev.bytes_sent);
            Some(dbytes as f64 / (dt_ms as f64 / 1000.0))
        });
        self.prev = Some(sample);

        let is_final = sample.total_bytes > 0 && sample.bytes_sent >= sample.total_bytes;
        let throttled = self
            .last_emit_ms
            .is_some_and(|last| sample.timestamp_ms.saturating_sub(last) < EMIT_INTERVAL_MS);
        if throttled && !is_final {
            return None;
        }
        self.last_emit_ms = Some(sample.timestamp_ms);

        let progress = if sample.total_bytes == 0 {
            0.0
        } else {
            (sample.bytes_sent as f64 / sample.total_bytes as f64).clamp(0.0, 1.0)
        };
        let eta_secs = match speed_bps {
            Some(speed) if speed > 0.0 && sample.total_bytes > 0 => {
                let remaining = sample.total_bytes.saturating_sub(sample.bytes_sent);
                Some((remaining as f64 / speed).round().max(0.0) as u64)
            }
            _ => None,
        };

        Some(ProgressUpdate {
            progress,
            bytes_sent: sample.bytes_sent,
            total_bytes: sample.total_bytes,
            speed_bps,
            eta_secs,
            timestamp_ms: sample.timestamp_ms,
        })
    }

    /// Clears all state, ready for the next file.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
