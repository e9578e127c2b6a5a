use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    DefinitionLibrary, ElementSchedule, FileStyleSource, Result, Schedule, StyleSheet, StyleSource,
};

/// How [`Scheduler::seek`](crate::Scheduler::seek) walks the end-ordered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekScan {
    /// Stop at the first instance whose start lies after the seek target.
    /// Only sound when start order agrees with end order.
    EarlyExit,
    /// Visit every instance.
    Exhaustive,
    /// Early exit when the index proved the orders agree, exhaustive otherwise.
    #[default]
    Auto,
}

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quantization steps per second.
    pub granularity: u32,
    pub seek_scan: SeekScan,
    /// Resume every paused instance at the start of each tick.
    pub resume_on_tick: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            granularity: 10,
            seek_scan: SeekScan::default(),
            resume_on_tick: true,
        }
    }
}

/// Configuration for the simulated playback loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub frame_rate: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { frame_rate: 60.0 }
    }
}

impl DriverConfig {
    /// Seconds between two frames, never zero.
    pub fn frame_interval(&self) -> f64 {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            1.0 / Self::default().frame_rate
        }
    }
}

/// Everything needed to bind and play a scene, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub config: SyncConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub stylesheets: Vec<StyleSheet>,
    /// Additional JSON style sheets, relative to the scene file.
    #[serde(default)]
    pub stylesheet_files: Vec<PathBuf>,
    #[serde(default)]
    pub elements: Vec<ElementSchedule>,
    /// Times at which the host wants a notification.
    #[serde(default)]
    pub cues: Vec<f64>,
}

impl SceneFile {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut scene = Self::from_json(&text)?;
        if let Some(dir) = path.parent() {
            for file in &mut scene.stylesheet_files {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        Ok(scene)
    }

    /// Definitions from the inline sheets followed by the external files.
    /// Files that cannot be read are skipped.
    pub fn library(&self) -> DefinitionLibrary {
        let files: Vec<FileStyleSource> = self
            .stylesheet_files
            .iter()
            .map(FileStyleSource::new)
            .collect();
        let sources: Vec<&dyn StyleSource> = self
            .stylesheets
            .iter()
            .map(|sheet| sheet as &dyn StyleSource)
            .chain(files.iter().map(|file| file as &dyn StyleSource))
            .collect();
        DefinitionLibrary::discover(&sources)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::from_elements(&self.elements)
    }
}
