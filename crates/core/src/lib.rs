//! Core library for keeping timed visual effects in lockstep with an
//! externally advancing playback clock.
//!
//! Style sources supply effect definitions, a schedule binds them to targets
//! at requested start times, and the [`Scheduler`] turns a stream of clock
//! samples into start, pause, resume, seek and reset commands for a
//! [`RenderEngine`]. The [`PlaybackLoop`] plays the role of the host frame
//! loop and forwards media lifecycle events.

pub mod callbacks;
pub mod config;
pub mod driver;
pub mod effect;
pub mod error;
pub mod index;
pub mod render;
pub mod schedule;
pub mod scheduler;
pub mod style;
pub mod timeline;

pub use callbacks::{Callback, CallbackRegistry};
pub use config::{DriverConfig, SceneFile, SeekScan, SyncConfig};
pub use driver::{PlaybackLoop, ScriptAction, ScriptEvent, SimulationReport};
pub use effect::{parse_duration, EffectDefinition, EffectInstance, InstanceId, RunState, TargetId};
pub use error::{EffectSyncError, Result};
pub use index::{BindReport, InstanceIndex, SkippedEntry};
pub use render::{
    Capabilities, CompletionToken, PlayState, RecordingEngine, RenderCall, RenderEngine,
    TargetState,
};
pub use schedule::{ElementSchedule, Schedule, ScheduleEntry, ScheduledEffect};
pub use scheduler::Scheduler;
pub use style::{DefinitionLibrary, DefinitionSource, FileStyleSource, StyleRule, StyleSheet, StyleSource};
pub use timeline::{quantize, PlaybackClock, Quantizer, TimeKey, DEFAULT_GRANULARITY};
