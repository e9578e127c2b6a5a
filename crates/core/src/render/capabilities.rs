const PREFIXES: [&str; 5] = ["", "webkit", "moz", "o", "ms"];

/// Engine property names, settled once when an engine is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub prefix: &'static str,
    pub animation_name: String,
    pub play_state: String,
    pub delay: String,
    pub duration: String,
    pub end_event: String,
}

impl Capabilities {
    /// Tries the unprefixed property family first, then each vendor prefix,
    /// and keeps the first family the probe accepts.
    pub fn negotiate<F>(probe: F) -> Option<Self>
    where
        F: Fn(&str) -> bool,
    {
        PREFIXES
            .iter()
            .copied()
            .map(Self::with_prefix)
            .find(|caps| probe(&caps.animation_name))
    }

    pub fn standard() -> Self {
        Self::with_prefix("")
    }

    fn with_prefix(prefix: &'static str) -> Self {
        let end_event = if prefix.is_empty() {
            "animationend".to_string()
        } else {
            format!("{prefix}AnimationEnd")
        };
        Self {
            prefix,
            animation_name: prefixed(prefix, "animationName"),
            play_state: prefixed(prefix, "animationPlayState"),
            delay: prefixed(prefix, "animationDelay"),
            duration: prefixed(prefix, "animationDuration"),
            end_event,
        }
    }
}

fn prefixed(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        return property.to_string();
    }
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}
