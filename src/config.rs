//! Watcher configuration.
//!
//! Configuration is JSON. Rules name a trigger description; responses are
//! bound in code, by rule name.
//!
//! ```json
//! {
//!   "tick_interval_ms": 500,
//!   "rules": [
//!     {"name": "hype", "trigger": {"type": "bits", "threshold": 100}},
//!     {"name": "spam", "trigger": {"type": "emote_only"}}
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, ChatResult};
use crate::trigger::{Trigger, TriggerSpec};

/// One named rule.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub trigger: TriggerSpec,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Time between poll ticks.
    pub tick_interval_ms: u64,
    pub rules: Vec<RuleConfig>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            rules: Vec::new(),
        }
    }
}

impl WatcherConfig {
    /// Parses and validates JSON configuration.
    pub fn from_json(text: &str) -> ChatResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ChatError::config(format!("invalid watcher config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ChatResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChatError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Checks the interval and rule names.
    pub fn validate(&self) -> ChatResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(ChatError::config("tick_interval_ms must be greater than zero"));
        }
        let mut names = HashSet::new();
        for rule in &self.rules {
            let name = rule.name.trim();
            if name.is_empty() {
                return Err(ChatError::config("rule name cannot be empty"));
            }
            if !names.insert(name) {
                return Err(ChatError::config(format!("duplicate rule name '{name}'")));
            }
        }
        Ok(())
    }

    /// The configured interval as a `Duration`.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Compiles every rule's trigger, in file order.
    pub fn compile_rules(&self) -> ChatResult<Vec<(String, Trigger)>> {
        self.rules
            .iter()
            .map(|rule| -> ChatResult<(String, Trigger)> { Ok((rule.name.clone(), rule.trigger.compile()?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "tick_interval_ms": 250,
        "rules": [
            {"name": "hype", "trigger": {"type": "bits", "threshold": 100}},
            {"name": "greeting", "trigger": {"type": "text_regex", "pattern": "(?i)^hello"}}
        ]
    }"#;

    #[test]
    fn parses_sample() {
        let config = WatcherConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        let rules = config.compile_rules().unwrap();
        let names: Vec<&str> = rules.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["hype", "greeting"]);
        assert_eq!(rules[0].1.to_string(), "bits>=100");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config = WatcherConfig::from_json("{}").unwrap();
        assert_eq!(config, WatcherConfig::default());
    }

    #[test]
    fn rejects_zero_interval() {
        let err = WatcherConfig::from_json(r#"{"tick_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ChatError::Config { .. }));
    }

    #[test]
    fn rejects_duplicate_rule_names() {
        let json = r#"{"rules": [
            {"name": "a", "trigger": {"type": "emote_only"}},
            {"name": "a", "trigger": {"type": "all_messages"}}
        ]}"#;
        let err = WatcherConfig::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate rule name 'a'"));
    }

    #[test]
    fn bad_regex_surfaces_at_compile() {
        let json = r#"{"rules": [{"name": "x", "trigger": {"type": "emote_regex", "pattern": "("}}]}"#;
        let config = WatcherConfig::from_json(json).unwrap();
        assert!(config.compile_rules().unwrap_err().is_invalid_registration());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = WatcherConfig::from_path(file.path()).unwrap();
        assert_eq!(config.rules.len(), 2);

        let missing = WatcherConfig::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ChatError::Config { .. })));
    }
}
