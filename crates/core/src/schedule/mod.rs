use serde::{Deserialize, Serialize};

use crate::TargetId;

/// One requested start of an effect on a target. Either half may be missing
/// when the declarative source was incomplete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    pub target: Option<TargetId>,
    pub start: Option<f64>,
}

impl ScheduleEntry {
    pub fn new(target: TargetId, start: f64) -> Self {
        Self {
            target: Some(target),
            start: Some(start),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEffect {
    pub name: String,
    pub entries: Vec<ScheduleEntry>,
}

/// Effect name to ordered start requests, in first-seen name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    effects: Vec<ScheduledEffect>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, entry: ScheduleEntry) {
        let name = name.into();
        match self.effects.iter_mut().find(|effect| effect.name == name) {
            Some(effect) => effect.entries.push(entry),
            None => self.effects.push(ScheduledEffect {
                name,
                entries: vec![entry],
            }),
        }
    }

    /// Convenience for the common fully specified case.
    pub fn add(&mut self, name: impl Into<String>, target: TargetId, start: f64) -> &mut Self {
        self.push(name, ScheduleEntry::new(target, start));
        self
    }

    pub fn effects(&self) -> &[ScheduledEffect] {
        &self.effects
    }

    pub fn entries(&self, name: &str) -> &[ScheduleEntry] {
        self.effects
            .iter()
            .find(|effect| effect.name == name)
            .map(|effect| effect.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.effects.iter().map(|effect| effect.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a schedule from declarative per-element data.
    pub fn from_elements(elements: &[ElementSchedule]) -> Self {
        let mut schedule = Self::new();
        for element in elements {
            element.append_to(&mut schedule);
        }
        schedule
    }
}

/// Declarative scheduling data attached to one element, e.g.
/// `animations = "fade, spin"` and `times = "1.2, 4"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSchedule {
    pub target: TargetId,
    #[serde(default)]
    pub animations: String,
    #[serde(default)]
    pub times: String,
}

impl ElementSchedule {
    pub fn new(target: TargetId, animations: impl Into<String>, times: impl Into<String>) -> Self {
        Self {
            target,
            animations: animations.into(),
            times: times.into(),
        }
    }

    /// Pairs names with times positionally. Empty slots keep their position:
    /// a name whose slot in `times` is empty or unparseable still produces an
    /// entry with no start so the binder can report it, and an empty name
    /// slot discards the time opposite it.
    pub fn append_to(&self, schedule: &mut Schedule) {
        let names = split_list(&self.animations);
        let mut times = split_list(&self.times).into_iter();

        for name in names {
            let start = times.next().and_then(|raw| raw.parse::<f64>().ok());
            if name.is_empty() {
                continue;
            }
            schedule.push(
                name,
                ScheduleEntry {
                    target: Some(self.target),
                    start,
                },
            );
        }

        let extra = times.filter(|raw| !raw.is_empty()).count();
        if extra > 0 {
            tracing::debug!(target_id = %self.target, extra, "ignoring start times without an effect name");
        }
    }
}

fn split_list(raw: &str) -> Vec<&str> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::trim).collect()
}
