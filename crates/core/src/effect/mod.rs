use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EffectSyncError, Quantizer, Result, TimeKey};

/// Opaque handle to an element in the host's scene graph. The core never
/// creates or destroys targets, it only passes the handle back to the
/// render engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of an instance inside its [`InstanceIndex`](crate::InstanceIndex).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub usize);

/// Runtime state of a single instance during one playback pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
}

/// A named effect as discovered in a style source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub name: String,
    /// Seconds per iteration.
    pub duration: f64,
    #[serde(default)]
    pub iterations: Option<f64>,
    /// Name of the keyframes block that renders the effect, if one exists.
    #[serde(default)]
    pub keyframes: Option<String>,
}

impl EffectDefinition {
    pub fn new(name: impl Into<String>, duration: f64) -> Self {
        let name = name.into();
        Self {
            keyframes: Some(name.clone()),
            name,
            duration,
            iterations: None,
        }
    }

    pub fn with_iterations(mut self, iterations: f64) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn without_keyframes(mut self) -> Self {
        self.keyframes = None;
        self
    }

    /// Effective running time in seconds. Unknown or negative durations
    /// count as zero; a positive iteration count multiplies the duration.
    pub fn total_duration(&self) -> f64 {
        let duration = if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            0.0
        };
        match self.iterations {
            Some(n) if n.is_finite() && n > 0.0 => duration * n,
            _ => duration,
        }
    }
}

/// Parses a duration literal such as `1.5s`, `300ms` or a bare number of
/// seconds.
pub fn parse_duration(literal: &str) -> Result<f64> {
    let trimmed = literal.trim();
    let (number, scale) = if let Some(ms) = trimmed.strip_suffix("ms") {
        (ms, 0.001)
    } else if let Some(s) = trimmed.strip_suffix('s') {
        (s, 1.0)
    } else {
        (trimmed, 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value * scale),
        _ => Err(EffectSyncError::InvalidDuration(literal.to_string())),
    }
}

/// Raw ingredients for an [`EffectInstance`], any of which may be missing.
#[derive(Debug, Clone, Copy)]
pub struct BindRequest<'a> {
    pub name: &'a str,
    pub definition: &'a EffectDefinition,
    pub target: Option<TargetId>,
    pub start: Option<f64>,
}

/// Binding of an effect definition to a target at a quantized start time.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectInstance {
    id: InstanceId,
    name: String,
    keyframes: String,
    target: TargetId,
    starts_at: f64,
    ends_at: f64,
    start_key: TimeKey,
}

impl EffectInstance {
    /// The only way to obtain an instance; a binding with any missing piece
    /// is rejected with [`EffectSyncError::InvalidBinding`].
    pub fn bind(id: InstanceId, request: BindRequest<'_>, quantizer: &Quantizer) -> Result<Self> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(EffectSyncError::invalid_binding(
                "<unnamed>",
                "an effect needs a name",
            ));
        }
        let keyframes = request
            .definition
            .keyframes
            .clone()
            .ok_or_else(|| EffectSyncError::invalid_binding(name, "no keyframes defined"))?;
        let target = request
            .target
            .ok_or_else(|| EffectSyncError::invalid_binding(name, "no target element"))?;
        let start = request
            .start
            .ok_or_else(|| EffectSyncError::invalid_binding(name, "no start time provided"))?;
        if !start.is_finite() || start < 0.0 {
            return Err(EffectSyncError::invalid_binding(
                name,
                format!("start time {start} is out of range"),
            ));
        }

        let starts_at = quantizer.quantize(start);
        Ok(Self {
            id,
            name: name.to_string(),
            keyframes,
            target,
            starts_at,
            ends_at: starts_at + request.definition.total_duration(),
            start_key: quantizer.key(starts_at),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keyframes(&self) -> &str {
        &self.keyframes
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn starts_at(&self) -> f64 {
        self.starts_at
    }

    pub fn ends_at(&self) -> f64 {
        self.ends_at
    }

    pub fn duration(&self) -> f64 {
        self.ends_at - self.starts_at
    }

    pub fn start_key(&self) -> TimeKey {
        self.start_key
    }

    /// Non-positive offset in seconds that places the effect at its correct
    /// phase when playback jumps to `seconds`.
    pub fn phase_offset(&self, seconds: f64) -> f64 {
        (self.starts_at - seconds).min(0.0)
    }

    /// Whether the effect would be mid-flight at `seconds`.
    pub fn is_active_at(&self, seconds: f64) -> bool {
        self.starts_at <= seconds && self.ends_at > seconds
    }
}
