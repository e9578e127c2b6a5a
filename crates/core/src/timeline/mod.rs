use serde::{Deserialize, Serialize};

/// Default number of quantization steps per second.
pub const DEFAULT_GRANULARITY: u32 = 10;

/// Exact lookup key for a quantized time, counted in granularity steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeKey(pub i64);

/// Rounds raw clock samples to the scheduling granularity so that start-time
/// lookups are exact matches instead of range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantizer {
    granularity: u32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(DEFAULT_GRANULARITY)
    }
}

impl Quantizer {
    /// A granularity of zero is treated as one step per second.
    pub fn new(granularity: u32) -> Self {
        Self {
            granularity: granularity.max(1),
        }
    }

    pub fn granularity(&self) -> u32 {
        self.granularity
    }

    /// `round(t * G) / G`, rounding half away from zero.
    pub fn quantize(&self, seconds: f64) -> f64 {
        let g = f64::from(self.granularity);
        (seconds * g).round() / g
    }

    pub fn key(&self, seconds: f64) -> TimeKey {
        TimeKey((seconds * f64::from(self.granularity)).round() as i64)
    }

    /// Seconds represented by a key.
    pub fn seconds(&self, key: TimeKey) -> f64 {
        key.0 as f64 / f64::from(self.granularity)
    }
}

/// Quantizes with the default granularity of one tenth of a second.
pub fn quantize(seconds: f64) -> f64 {
    Quantizer::default().quantize(seconds)
}

/// Simulated media position used by the playback loop.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    pub fn seek(&mut self, seconds: f64) {
        self.time_seconds = seconds.max(0.0);
    }
}
