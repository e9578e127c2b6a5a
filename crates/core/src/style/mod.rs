use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{effect::parse_duration, EffectDefinition, EffectSyncError, Result};

/// A rule that attaches an animation to a class selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub selector: String,
    #[serde(default)]
    pub animation_name: Option<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub iterations: Option<f64>,
}

/// Keyframe blocks and animation rules as exposed by one style source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keyframes: Vec<String>,
    #[serde(default)]
    pub rules: Vec<StyleRule>,
}

/// Something that can hand over a [`StyleSheet`], or refuse to.
pub trait StyleSource {
    fn name(&self) -> &str;
    fn load(&self) -> Result<StyleSheet>;
}

impl StyleSource for StyleSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<StyleSheet> {
        Ok(self.clone())
    }
}

/// A JSON encoded [`StyleSheet`] on disk.
#[derive(Debug, Clone)]
pub struct FileStyleSource {
    name: String,
    path: PathBuf,
}

impl FileStyleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
        }
    }
}

impl StyleSource for FileStyleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<StyleSheet> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|err| EffectSyncError::source_unavailable(&self.name, err.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|err| EffectSyncError::source_unavailable(&self.name, err.to_string()))
    }
}

/// Lookup of effect definitions by name.
pub trait DefinitionSource {
    fn lookup_definition(&self, name: &str) -> Option<&EffectDefinition>;
}

impl DefinitionSource for HashMap<String, EffectDefinition> {
    fn lookup_definition(&self, name: &str) -> Option<&EffectDefinition> {
        self.get(name)
    }
}

/// Every effect definition discoverable from a set of style sources.
#[derive(Debug, Clone, Default)]
pub struct DefinitionLibrary {
    definitions: HashMap<String, EffectDefinition>,
}

impl DefinitionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every source, skipping the ones that cannot be read.
    pub fn discover(sources: &[&dyn StyleSource]) -> Self {
        let sheets: Vec<StyleSheet> = sources
            .iter()
            .filter_map(|source| match source.load() {
                Ok(sheet) => Some(sheet),
                Err(err) => {
                    tracing::debug!(source = source.name(), error = %err, "skipping style source");
                    None
                }
            })
            .collect();
        Self::from_sheets(&sheets)
    }

    pub fn from_sheets(sheets: &[StyleSheet]) -> Self {
        let keyframes: HashSet<&str> = sheets
            .iter()
            .flat_map(|sheet| sheet.keyframes.iter().map(String::as_str))
            .collect();

        let mut library = Self::new();
        for rule in sheets.iter().flat_map(|sheet| sheet.rules.iter()) {
            let Some(animation) = rule.animation_name.as_deref() else {
                continue;
            };
            let name = rule.selector.trim().trim_start_matches('.');
            if name.is_empty() {
                continue;
            }

            let duration = parse_duration(&rule.duration).unwrap_or_else(|err| {
                tracing::debug!(effect = name, error = %err, "treating duration as zero");
                0.0
            });

            library.insert(EffectDefinition {
                name: name.to_string(),
                duration,
                iterations: rule.iterations,
                keyframes: keyframes.get(animation).map(|k| k.to_string()),
            });
        }
        library
    }

    pub fn insert(&mut self, definition: EffectDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl DefinitionSource for DefinitionLibrary {
    fn lookup_definition(&self, name: &str) -> Option<&EffectDefinition> {
        self.definitions.get(name)
    }
}
