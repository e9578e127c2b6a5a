use std::collections::HashMap;

use crate::{
    effect::BindRequest, DefinitionSource, EffectInstance, EffectSyncError, InstanceId, Quantizer,
    Schedule, SeekScan, TargetId, TimeKey,
};

/// A schedule entry that could not be bound.
#[derive(Debug)]
pub struct SkippedEntry {
    pub effect: String,
    pub target: Option<TargetId>,
    pub error: EffectSyncError,
}

/// Outcome of [`InstanceIndex::bind`].
#[derive(Debug, Default)]
pub struct BindReport {
    pub bound: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Immutable lookup structures over every bound instance.
///
/// Forward playback looks instances up by their quantized start key; seek
/// walks them in ascending end time. Both views are fixed once bound.
#[derive(Debug, Clone, Default)]
pub struct InstanceIndex {
    quantizer: Quantizer,
    instances: Vec<EffectInstance>,
    by_start: HashMap<TimeKey, Vec<InstanceId>>,
    by_end: Vec<InstanceId>,
    by_name: HashMap<String, Vec<InstanceId>>,
    start_ordered: bool,
}

impl InstanceIndex {
    /// Binds every schedule entry it can. Entries naming an unknown effect or
    /// with an incomplete binding are reported and skipped.
    pub fn bind<D>(definitions: &D, schedule: &Schedule, quantizer: Quantizer) -> (Self, BindReport)
    where
        D: DefinitionSource + ?Sized,
    {
        let mut index = Self {
            quantizer,
            ..Default::default()
        };
        let mut report = BindReport::default();

        for effect in schedule.effects() {
            let definition = definitions.lookup_definition(&effect.name);
            for entry in &effect.entries {
                let result = definition
                    .ok_or_else(|| EffectSyncError::UnknownEffect(effect.name.clone()))
                    .and_then(|definition| {
                        let request = BindRequest {
                            name: &effect.name,
                            definition,
                            target: entry.target,
                            start: entry.start,
                        };
                        EffectInstance::bind(InstanceId(index.instances.len()), request, &quantizer)
                    });

                match result {
                    Ok(instance) => index.insert(instance),
                    Err(error) => {
                        tracing::warn!(effect = %effect.name, error = %error, "skipping schedule entry");
                        report.skipped.push(SkippedEntry {
                            effect: effect.name.clone(),
                            target: entry.target,
                            error,
                        });
                    }
                }
            }
        }

        index.finish();
        report.bound = index.len();
        tracing::info!(
            bound = report.bound,
            skipped = report.skipped.len(),
            start_ordered = index.start_ordered,
            "bound effect schedule"
        );
        (index, report)
    }

    fn insert(&mut self, instance: EffectInstance) {
        let id = instance.id();
        self.by_start
            .entry(instance.start_key())
            .or_default()
            .push(id);
        self.by_name
            .entry(instance.name().to_string())
            .or_default()
            .push(id);
        self.instances.push(instance);
    }

    fn finish(&mut self) {
        let mut by_end: Vec<InstanceId> = self.instances.iter().map(EffectInstance::id).collect();
        // Stable: equal end times keep bind order.
        by_end.sort_by(|a, b| self.get(*a).ends_at().total_cmp(&self.get(*b).ends_at()));
        self.start_ordered = by_end
            .windows(2)
            .all(|pair| self.get(pair[0]).starts_at() <= self.get(pair[1]).starts_at());
        self.by_end = by_end;
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Panics if `id` did not come from this index.
    pub fn get(&self, id: InstanceId) -> &EffectInstance {
        &self.instances[id.0]
    }

    pub fn instances(&self) -> &[EffectInstance] {
        &self.instances
    }

    /// Instances starting in the bucket `key`, in bind order.
    pub fn starting_at(&self, key: TimeKey) -> &[InstanceId] {
        self.by_start.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Start buckets in ascending time.
    pub fn start_keys(&self) -> Vec<TimeKey> {
        let mut keys: Vec<TimeKey> = self.by_start.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn by_end_time(&self) -> &[InstanceId] {
        &self.by_end
    }

    pub fn named(&self, name: &str) -> &[InstanceId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether walking the end-ordered view also visits starts in ascending
    /// order, which is what makes an early-exit seek scan sound.
    pub fn is_start_ordered(&self) -> bool {
        self.start_ordered
    }

    /// Instances that would be mid-flight at the quantized time `seconds`, in
    /// end-time order.
    pub fn active_at(&self, seconds: f64, scan: SeekScan) -> Vec<InstanceId> {
        let early_exit = match scan {
            SeekScan::EarlyExit => true,
            SeekScan::Exhaustive => false,
            SeekScan::Auto => self.start_ordered,
        };

        let mut active = Vec::new();
        for &id in &self.by_end {
            let instance = self.get(id);
            if instance.starts_at() > seconds {
                if early_exit {
                    break;
                }
                continue;
            }
            if instance.ends_at() > seconds {
                active.push(id);
            }
        }
        active
    }
}
