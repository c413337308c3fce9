use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_db_path() -> String {
    "idle_score.db".to_string()
}

fn default_journal_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Period of the live ticker while the session is active.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_journal_enabled")]
    pub journal_enabled: bool,
    /// Bound on the driver's event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            db_path: default_db_path(),
            journal_enabled: default_journal_enabled(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl TrackerConfig {
    /// Load from `{data_dir}/tracker.json`.
    /// A missing file means defaults; an unreadable or invalid one is an error.
    /// In tests, use TrackerConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/tracker.json");
        if !Path::new(&path).exists() {
            log::info!("No {path}, using default tracker config");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: TrackerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid {path}: {e}"))?;
        if config.tick_interval_ms == 0 {
            anyhow::bail!("{path}: tick_interval_ms must be > 0");
        }
        if config.queue_capacity == 0 {
            anyhow::bail!("{path}: queue_capacity must be > 0");
        }
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self {
            tick_interval_ms: 1000,
            db_path: ":memory:".to_string(),
            journal_enabled: true,
            queue_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("idlescore-{tag}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = scratch_dir("cfg-missing");
        let config = TrackerConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = scratch_dir("cfg-partial");
        std::fs::write(dir.join("tracker.json"), r#"{ "db_path": "save.db" }"#).unwrap();
        let config = TrackerConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.db_path, "save.db");
        assert_eq!(config.tick_interval_ms, 1000);
        assert!(config.journal_enabled);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = scratch_dir("cfg-zero");
        std::fs::write(dir.join("tracker.json"), r#"{ "tick_interval_ms": 0 }"#).unwrap();
        assert!(TrackerConfig::load(dir.to_str().unwrap()).is_err());
    }
}
