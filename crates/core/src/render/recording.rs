use std::collections::{BTreeMap, HashMap};

use crate::{EffectSyncError, Result, TargetId};

use super::{Capabilities, CompletionToken, PlayState, RenderEngine};

/// A single command received by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Apply { target: TargetId, effect: String },
    PhaseDelay { target: TargetId, milliseconds: i64 },
    PlayState { target: TargetId, state: PlayState },
    Remove { target: TargetId, effect: String },
    LayoutSync { target: TargetId },
    Observe { target: TargetId, token: CompletionToken },
}

/// What the engine believes is attached to one target.
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    pub effects: Vec<String>,
    /// Inline style properties keyed by their negotiated names.
    pub style: BTreeMap<String, String>,
    pub layout_syncs: usize,
    listeners: Vec<CompletionToken>,
}

/// In-memory render engine that keeps a log of every command and tracks the
/// visible state of each target.
#[derive(Debug)]
pub struct RecordingEngine {
    capabilities: Capabilities,
    calls: Vec<RenderCall>,
    targets: HashMap<TargetId, TargetState>,
    removals_while_paused: usize,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::standard())
    }

    /// Negotiates property names once against the supplied probe.
    pub fn with_probe<F>(probe: F) -> Result<Self>
    where
        F: Fn(&str) -> bool,
    {
        let capabilities = Capabilities::negotiate(probe)
            .ok_or_else(|| EffectSyncError::msg("render engine exposes no animation properties"))?;
        Ok(Self::with_capabilities(capabilities))
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            calls: Vec::new(),
            targets: HashMap::new(),
            removals_while_paused: 0,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn target(&self, target: TargetId) -> Option<&TargetState> {
        self.targets.get(&target)
    }

    pub fn has_effect(&self, target: TargetId, effect: &str) -> bool {
        self.target(target)
            .map(|state| state.effects.iter().any(|e| e == effect))
            .unwrap_or(false)
    }

    /// Applications of `effect` to `target` seen so far.
    pub fn apply_count(&self, target: TargetId, effect: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| {
                matches!(call, RenderCall::Apply { target: t, effect: e } if *t == target && e == effect)
            })
            .count()
    }

    pub fn phase_delay_ms(&self, target: TargetId) -> Option<i64> {
        self.style_value(target, &self.capabilities.delay)
            .and_then(|value| value.strip_suffix("ms"))
            .and_then(|value| value.parse().ok())
    }

    pub fn play_state(&self, target: TargetId) -> Option<PlayState> {
        match self.style_value(target, &self.capabilities.play_state)? {
            "paused" => Some(PlayState::Paused),
            "running" => Some(PlayState::Running),
            _ => None,
        }
    }

    /// Whether the target has no effect attached and no delay override left.
    pub fn is_clean(&self, target: TargetId) -> bool {
        self.target(target)
            .map(|state| state.effects.is_empty())
            .unwrap_or(true)
            && self.phase_delay_ms(target).unwrap_or(0) == 0
    }

    /// Removals issued while the target was paused. A paused target skips the
    /// layout pass, so such a removal does not reset the effect.
    pub fn removals_while_paused(&self) -> usize {
        self.removals_while_paused
    }

    /// Simulates the end event for every effect currently attached to
    /// `target`, returning the tokens the host must forward to the scheduler.
    pub fn complete(&mut self, target: TargetId) -> Vec<CompletionToken> {
        self.targets
            .get_mut(&target)
            .map(|state| std::mem::take(&mut state.listeners))
            .unwrap_or_default()
    }

    /// Drains every pending completion the predicate accepts, across all
    /// targets.
    pub fn take_completions<F>(&mut self, mut due: F) -> Vec<CompletionToken>
    where
        F: FnMut(&CompletionToken) -> bool,
    {
        let mut taken = Vec::new();
        for state in self.targets.values_mut() {
            state.listeners.retain(|token| {
                if due(token) {
                    taken.push(*token);
                    false
                } else {
                    true
                }
            });
        }
        taken.sort_by_key(|token| token.instance);
        taken
    }

    fn style_value(&self, target: TargetId, property: &str) -> Option<&str> {
        self.target(target)?.style.get(property).map(String::as_str)
    }

    fn state_mut(&mut self, target: TargetId) -> &mut TargetState {
        self.targets.entry(target).or_default()
    }
}

impl RenderEngine for RecordingEngine {
    fn apply_effect(&mut self, target: TargetId, effect: &str) {
        self.calls.push(RenderCall::Apply {
            target,
            effect: effect.to_string(),
        });
        let state = self.state_mut(target);
        if !state.effects.iter().any(|e| e == effect) {
            state.effects.push(effect.to_string());
        }
    }

    fn set_phase_delay(&mut self, target: TargetId, milliseconds: i64) {
        self.calls.push(RenderCall::PhaseDelay {
            target,
            milliseconds,
        });
        let property = self.capabilities.delay.clone();
        self.state_mut(target)
            .style
            .insert(property, format!("{milliseconds}ms"));
    }

    fn set_play_state(&mut self, target: TargetId, state: PlayState) {
        self.calls.push(RenderCall::PlayState { target, state });
        let property = self.capabilities.play_state.clone();
        self.state_mut(target)
            .style
            .insert(property, state.as_str().to_string());
    }

    fn remove_effect(&mut self, target: TargetId, effect: &str) {
        self.calls.push(RenderCall::Remove {
            target,
            effect: effect.to_string(),
        });
        if self.play_state(target) == Some(PlayState::Paused) {
            self.removals_while_paused += 1;
        }
        let state = self.state_mut(target);
        state.effects.retain(|e| e != effect);
    }

    fn force_layout_sync(&mut self, target: TargetId) {
        self.calls.push(RenderCall::LayoutSync { target });
        self.state_mut(target).layout_syncs += 1;
    }

    fn on_effect_complete(&mut self, target: TargetId, token: CompletionToken) {
        self.calls.push(RenderCall::Observe { target, token });
        self.state_mut(target).listeners.push(token);
    }
}
