//! Boundary to the engine that actually renders effects on targets.
//!
//! The scheduler only ever issues commands through [`RenderEngine`]; it never
//! inspects targets itself.

mod capabilities;
mod recording;

pub use capabilities::Capabilities;
pub use recording::{RecordingEngine, RenderCall, TargetState};

use crate::{InstanceId, TargetId};

/// Play state of the effect currently attached to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    #[default]
    Running,
    Paused,
}

impl PlayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayState::Running => "running",
            PlayState::Paused => "paused",
        }
    }
}

/// Handed to the engine when an effect starts. The host returns it through
/// [`Scheduler::effect_completed`](crate::Scheduler::effect_completed) once
/// the engine reports that the effect ran to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionToken {
    pub instance: InstanceId,
    pub generation: u64,
}

/// Commands the scheduler issues. Implementations are fire-and-forget.
pub trait RenderEngine {
    fn apply_effect(&mut self, target: TargetId, effect: &str);
    fn set_phase_delay(&mut self, target: TargetId, milliseconds: i64);
    fn set_play_state(&mut self, target: TargetId, state: PlayState);
    fn remove_effect(&mut self, target: TargetId, effect: &str);
    /// Flushes pending style changes so that a removal actually restarts the
    /// effect the next time it is applied.
    fn force_layout_sync(&mut self, target: TargetId);
    fn on_effect_complete(&mut self, target: TargetId, token: CompletionToken);
}

impl<R: RenderEngine + ?Sized> RenderEngine for &mut R {
    fn apply_effect(&mut self, target: TargetId, effect: &str) {
        (**self).apply_effect(target, effect)
    }

    fn set_phase_delay(&mut self, target: TargetId, milliseconds: i64) {
        (**self).set_phase_delay(target, milliseconds)
    }

    fn set_play_state(&mut self, target: TargetId, state: PlayState) {
        (**self).set_play_state(target, state)
    }

    fn remove_effect(&mut self, target: TargetId, effect: &str) {
        (**self).remove_effect(target, effect)
    }

    fn force_layout_sync(&mut self, target: TargetId) {
        (**self).force_layout_sync(target)
    }

    fn on_effect_complete(&mut self, target: TargetId, token: CompletionToken) {
        (**self).on_effect_complete(target, token)
    }
}
