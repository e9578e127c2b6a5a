//! Maps clock samples onto start, pause, resume, seek and reset decisions for
//! every bound effect instance.
//!
//! Each instance carries an explicit [`RunState`]. The `running` and `paused`
//! lists only record the order in which instances entered those states, so
//! iteration is deterministic while membership in both is impossible.

use crate::{
    BindReport, CallbackRegistry, CompletionToken, DefinitionSource, InstanceId, InstanceIndex,
    PlayState, Quantizer, RenderEngine, RunState, Schedule, SeekScan, SyncConfig,
};

#[derive(Debug)]
pub struct Scheduler<R> {
    config: SyncConfig,
    index: InstanceIndex,
    engine: R,
    states: Vec<RunState>,
    generations: Vec<u64>,
    running: Vec<InstanceId>,
    paused: Vec<InstanceId>,
    callbacks: CallbackRegistry,
}

impl<R: RenderEngine> Scheduler<R> {
    pub fn new(index: InstanceIndex, engine: R, config: SyncConfig) -> Self {
        let count = index.len();
        let callbacks = CallbackRegistry::new(*index.quantizer());
        Self {
            config,
            index,
            engine,
            states: vec![RunState::Idle; count],
            generations: vec![0; count],
            running: Vec::new(),
            paused: Vec::new(),
            callbacks,
        }
    }

    /// Binds `schedule` against `definitions` and wraps the resulting index.
    pub fn bind<D>(
        definitions: &D,
        schedule: &Schedule,
        engine: R,
        config: SyncConfig,
    ) -> (Self, BindReport)
    where
        D: DefinitionSource + ?Sized,
    {
        let quantizer = Quantizer::new(config.granularity);
        let (index, report) = InstanceIndex::bind(definitions, schedule, quantizer);
        if config.seek_scan == SeekScan::EarlyExit && !index.is_start_ordered() {
            tracing::warn!("early-exit seek configured but start order differs from end order; seeks may miss effects");
        }
        (Self::new(index, engine, config), report)
    }

    /// Replaces the callback registry owned by this scheduler. A registry
    /// built on another granularity is re-keyed onto the index's grid.
    pub fn with_callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        let quantizer = *self.index.quantizer();
        if callbacks.quantizer() != &quantizer {
            tracing::warn!(
                registry = callbacks.quantizer().granularity(),
                index = quantizer.granularity(),
                "callback registry granularity differs from the schedule; re-keying"
            );
        }
        self.callbacks = callbacks.requantize(quantizer);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn index(&self) -> &InstanceIndex {
        &self.index
    }

    pub fn engine(&self) -> &R {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut R {
        &mut self.engine
    }

    pub fn into_engine(self) -> R {
        self.engine
    }

    pub fn quantize(&self, seconds: f64) -> f64 {
        self.index.quantizer().quantize(seconds)
    }

    pub fn state(&self, id: InstanceId) -> RunState {
        self.states.get(id.0).copied().unwrap_or_default()
    }

    pub fn running(&self) -> &[InstanceId] {
        &self.running
    }

    pub fn paused(&self) -> &[InstanceId] {
        &self.paused
    }

    pub fn register_callback<F>(&mut self, seconds: f64, callback: F)
    where
        F: FnMut() + 'static,
    {
        self.callbacks.register(seconds, callback);
    }

    /// Handles one raw clock sample: advances, then fires due callbacks.
    pub fn on_tick(&mut self, sample: f64) -> Vec<InstanceId> {
        let seconds = self.quantize(sample);
        let started = self.advance(seconds);
        self.execute_callbacks(seconds);
        started
    }

    /// Starts every idle instance whose start bucket is `seconds`. Repeated
    /// calls within one bucket start nothing new.
    ///
    /// With `resume_on_tick` every paused instance is resumed first, on every
    /// call.
    pub fn advance(&mut self, seconds: f64) -> Vec<InstanceId> {
        if self.config.resume_on_tick {
            self.resume_all();
        }

        let key = self.index.quantizer().key(seconds);
        let due: Vec<InstanceId> = self
            .index
            .starting_at(key)
            .iter()
            .copied()
            .filter(|id| self.states[id.0] == RunState::Idle)
            .collect();

        for &id in &due {
            self.start(id);
            self.set_state(id, RunState::Running);
            self.running.push(id);
        }
        due
    }

    /// Starts every instance that is mid-flight at `seconds`, offset so that
    /// it renders at its current phase. Instances land in `running` when
    /// `resume_immediately`, otherwise in `paused` and frozen.
    pub fn seek(&mut self, seconds: f64, resume_immediately: bool) -> Vec<InstanceId> {
        let quantizer = *self.index.quantizer();
        let now = quantizer.key(seconds);
        let active = self
            .index
            .active_at(quantizer.seconds(now), self.config.seek_scan);

        for &id in &active {
            self.detach(id);

            let instance = self.index.get(id);
            let target = instance.target();
            let steps = instance.start_key().0.saturating_sub(now.0).min(0);
            let delay_ms = steps
                .saturating_mul(1000)
                .div_euclid(i64::from(quantizer.granularity()));
            self.engine.set_phase_delay(target, delay_ms);
            self.start(id);

            if resume_immediately {
                self.engine.set_play_state(target, PlayState::Running);
                self.set_state(id, RunState::Running);
                self.running.push(id);
            } else {
                self.engine.set_play_state(target, PlayState::Paused);
                self.set_state(id, RunState::Paused);
                self.paused.push(id);
            }
        }

        tracing::info!(
            seconds = quantizer.seconds(now),
            started = active.len(),
            resume_immediately,
            "seeked"
        );
        active
    }

    pub fn pause_all(&mut self) {
        while let Some(id) = self.running.pop() {
            self.engine
                .set_play_state(self.index.get(id).target(), PlayState::Paused);
            self.set_state(id, RunState::Paused);
            self.paused.push(id);
        }
    }

    pub fn resume_all(&mut self) {
        while let Some(id) = self.paused.pop() {
            self.engine
                .set_play_state(self.index.get(id).target(), PlayState::Running);
            self.set_state(id, RunState::Running);
            self.running.push(id);
        }
    }

    /// Resets every running and paused instance back to idle.
    ///
    /// Paused targets are resumed first: the engine only honours an effect
    /// removal after a layout pass, which paused targets skip.
    pub fn clear_all(&mut self) {
        let cleared = self.running.len() + self.paused.len();
        self.resume_all();
        while let Some(id) = self.running.pop() {
            self.reset(id);
        }
        while let Some(id) = self.paused.pop() {
            self.reset(id);
        }
        if cleared > 0 {
            tracing::info!(cleared, "cleared effects");
        }
    }

    /// Handles an end-of-effect notification. Stale tokens, from an earlier
    /// start or for an instance that was already reset, are ignored.
    pub fn effect_completed(&mut self, token: CompletionToken) -> bool {
        let id = token.instance;
        let current = self.generations.get(id.0).copied();
        if current != Some(token.generation) || self.state(id) == RunState::Idle {
            return false;
        }
        self.detach(id);
        self.reset(id);
        true
    }

    /// Fires callbacks registered for `seconds` on a bucket change.
    pub fn execute_callbacks(&mut self, seconds: f64) -> usize {
        self.callbacks.execute(seconds)
    }

    fn start(&mut self, id: InstanceId) {
        self.generations[id.0] += 1;
        let token = CompletionToken {
            instance: id,
            generation: self.generations[id.0],
        };
        let instance = self.index.get(id);
        self.engine.apply_effect(instance.target(), instance.name());
        self.engine.on_effect_complete(instance.target(), token);
        tracing::debug!(effect = instance.name(), target_id = %instance.target(), "started effect");
    }

    fn reset(&mut self, id: InstanceId) {
        let instance = self.index.get(id);
        let target = instance.target();
        self.engine.remove_effect(target, instance.name());
        self.engine.force_layout_sync(target);
        self.engine.set_phase_delay(target, 0);
        tracing::debug!(effect = instance.name(), target_id = %target, "reset effect");
        self.set_state(id, RunState::Idle);
    }

    /// Removes `id` from whichever list currently holds it.
    fn detach(&mut self, id: InstanceId) {
        match self.state(id) {
            RunState::Running => self.running.retain(|other| *other != id),
            RunState::Paused => self.paused.retain(|other| *other != id),
            RunState::Idle => return,
        }
        self.set_state(id, RunState::Idle);
    }

    fn set_state(&mut self, id: InstanceId, state: RunState) {
        self.states[id.0] = state;
    }
}

#[cfg(test)]
mod tests;
