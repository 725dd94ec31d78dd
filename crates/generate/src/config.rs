#![forbid(unsafe_code)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Generation settings. The defaults reproduce the reference
/// configuration: a 32-token context, 1000 generated tokens per activation
/// and a 1 ms pause between tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Number of most-recent tokens fed to the model each step.
    pub context_len: usize,
    /// Tokens produced per activation.
    pub max_tokens: usize,
    /// Pause between tokens in milliseconds. Yields the generation thread
    /// so the UI keeps repainting between tokens.
    pub token_delay_ms: u64,
    /// Upper bound on a single engine step in milliseconds. A step that
    /// runs longer aborts the run with `InferenceError::TimedOut`.
    pub step_timeout_ms: u64,
    /// Hidden width of the reference engine.
    pub hidden: usize,
    /// Sampling seed for the reference engine.
    pub seed: u64,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            context_len: 32,
            max_tokens: 1000,
            token_delay_ms: 1,
            step_timeout_ms: 10_000,
            hidden: 64,
            seed: 0x5eed_cafe,
        }
    }
}

impl GenConfig {
    /// Read settings from a JSON file. A missing file yields the defaults;
    /// a present but malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, serde_json::Error> {
        match std::fs::read_to_string(path) {
            Ok(body) => serde_json::from_str(&body),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Pause between tokens as a [`Duration`].
    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }

    /// Per-step timeout as a [`Duration`].
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_configuration() {
        let cfg = GenConfig::default();
        assert_eq!(cfg.context_len, 32);
        assert_eq!(cfg.max_tokens, 1000);
        assert_eq!(cfg.token_delay(), Duration::from_millis(1));
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GenConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg.context_len, 32);
    }

    #[test]
    fn partial_settings_file_overrides_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"max_tokens": 16}}"#).unwrap();
        let cfg = GenConfig::load(f.path()).unwrap();
        assert_eq!(cfg.max_tokens, 16);
        assert_eq!(cfg.context_len, 32);
    }
}
