//! Host-side loop that feeds clock samples and lifecycle events into a
//! [`Scheduler`], in the way a media element's frame loop would.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    CompletionToken, DriverConfig, InstanceId, PlaybackClock, RecordingEngine, RenderEngine,
    Scheduler,
};

/// Binds a scheduler to the lifecycle of a playing medium.
#[derive(Debug)]
pub struct PlaybackLoop<R> {
    scheduler: Scheduler<R>,
    clock: PlaybackClock,
    config: DriverConfig,
    playing: bool,
    frames: u64,
}

impl<R: RenderEngine> PlaybackLoop<R> {
    pub fn new(scheduler: Scheduler<R>, config: DriverConfig) -> Self {
        Self {
            scheduler,
            clock: PlaybackClock::default(),
            config,
            playing: false,
            frames: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler<R> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<R> {
        &mut self.scheduler
    }

    pub fn into_scheduler(self) -> Scheduler<R> {
        self.scheduler
    }

    pub fn position(&self) -> f64 {
        self.clock.time_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Playback started or resumed.
    pub fn play(&mut self) -> Vec<InstanceId> {
        if self.playing {
            return Vec::new();
        }
        self.playing = true;
        self.scheduler.resume_all();
        self.tick()
    }

    /// Playback paused: the loop stops and every running effect freezes.
    pub fn pause(&mut self) {
        self.playing = false;
        self.scheduler.pause_all();
    }

    /// The medium jumped to `seconds`.
    pub fn seeked(&mut self, seconds: f64) -> Vec<InstanceId> {
        self.clock.seek(seconds);
        self.scheduler.clear_all();
        self.scheduler.seek(self.clock.time_seconds, self.playing)
    }

    /// The medium reached its end.
    pub fn ended(&mut self) {
        self.playing = false;
        self.scheduler.clear_all();
    }

    /// Samples the clock once, if playing.
    pub fn tick(&mut self) -> Vec<InstanceId> {
        if !self.playing {
            return Vec::new();
        }
        self.frames += 1;
        self.scheduler.on_tick(self.clock.time_seconds)
    }

    /// Moves the clock forward by one frame and samples it.
    pub fn step(&mut self) -> Vec<InstanceId> {
        if !self.playing {
            return Vec::new();
        }
        self.clock.advance(self.config.frame_interval());
        self.tick()
    }

    /// Lets one host frame pass. While paused the clock stays put and the
    /// scheduler is not sampled.
    pub fn wait(&mut self) -> Vec<InstanceId> {
        if self.playing {
            return self.step();
        }
        self.frames += 1;
        Vec::new()
    }

    /// Forwards an end-of-effect notification from the render engine.
    pub fn complete(&mut self, token: CompletionToken) -> bool {
        self.scheduler.effect_completed(token)
    }
}

/// Something to do to the medium once playback reaches `at`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub at: f64,
    pub action: ScriptAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptAction {
    /// Jump to the given position.
    Seek(f64),
    /// Pause, let the given number of host frames pass, then play again.
    Pause(u32),
}

/// Counters collected by [`PlaybackLoop::simulate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub frames: u64,
    pub started: usize,
    pub completed: usize,
    pub seeks: usize,
    pub pauses: usize,
    /// Host frames spent paused.
    pub paused_frames: u64,
}

impl PlaybackLoop<RecordingEngine> {
    /// Plays the medium from the current position until `until`, applying
    /// `script` along the way, and finishes with an end-of-playback event.
    pub fn simulate(&mut self, until: f64, script: &[ScriptEvent]) -> SimulationReport {
        let mut script = script.to_vec();
        script.sort_by(|a, b| a.at.total_cmp(&b.at));
        let mut pending = script.into_iter().peekable();
        let mut report = SimulationReport::default();

        report.started += self.play().len();
        while self.position() < until {
            report.started += self.step().len();
            report.completed += self.deliver_completions();

            while let Some(event) = pending.next_if(|event| event.at <= self.position()) {
                match event.action {
                    ScriptAction::Seek(to) => {
                        tracing::info!(from = self.position(), to, "scripted seek");
                        report.started += self.seeked(to).len();
                        report.seeks += 1;
                    }
                    ScriptAction::Pause(frames) => {
                        tracing::info!(at = self.position(), frames, "scripted pause");
                        self.pause();
                        for _ in 0..frames {
                            self.wait();
                        }
                        report.started += self.play().len();
                        report.pauses += 1;
                        report.paused_frames += u64::from(frames);
                    }
                }
            }
        }

        self.ended();
        report.frames = self.frames;
        report
    }

    /// Reports every running effect whose end time has been reached as
    /// completed, the way the render engine's end event would.
    pub fn deliver_completions(&mut self) -> usize {
        let now = self.position();
        let due: HashSet<InstanceId> = self
            .scheduler
            .running()
            .iter()
            .copied()
            .filter(|id| self.scheduler.index().get(*id).ends_at() <= now)
            .collect();
        if due.is_empty() {
            return 0;
        }

        let tokens = self
            .scheduler
            .engine_mut()
            .take_completions(|token| due.contains(&token.instance));
        tokens
            .into_iter()
            .filter(|token| self.scheduler.effect_completed(*token))
            .count()
    }
}
