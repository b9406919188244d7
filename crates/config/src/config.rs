//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Worker pool and queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobsConfig {
    /// Number of concurrent transcode workers
    #[serde(default = "default_max_jobs")]
    pub max_jobs: u32,
    /// Capacity of the bounded job queue; producers block when it is full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_jobs() -> u32 {
    2
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_jobs: default_max_jobs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Path to the ffmpeg binary
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: PathBuf,
    /// Path to the ffprobe binary
    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: PathBuf,
    /// Deadline for one probe invocation in seconds (0 = no deadline)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Deadline for one transcode invocation in seconds (0 = no deadline)
    #[serde(default)]
    pub transcode_timeout_secs: u64,
}

fn default_ffmpeg_bin() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_bin() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_probe_timeout_secs() -> u64 {
    60
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: default_ffmpeg_bin(),
            ffprobe_bin: default_ffprobe_bin(),
            probe_timeout_secs: default_probe_timeout_secs(),
            transcode_timeout_secs: 0,
        }
    }
}

impl ToolsConfig {
    /// Deadline for a probe invocation, or None when disabled
    pub fn probe_deadline(&self) -> Option<Duration> {
        deadline(self.probe_timeout_secs)
    }

    /// Deadline for a transcode invocation, or None when disabled
    pub fn transcode_deadline(&self) -> Option<Duration> {
        deadline(self.transcode_timeout_secs)
    }
}

fn deadline(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Directory watched for incoming video files
    #[serde(default)]
    pub watch_dir: PathBuf,
    /// Destination directory for transcoded output
    #[serde(default)]
    pub out_dir: PathBuf,
    /// Log destination; None means standard output
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - WEBMUX_MAX_JOBS -> jobs.max_jobs
    /// - WEBMUX_QUEUE_CAPACITY -> jobs.queue_capacity
    /// - WEBMUX_FFMPEG_BIN -> tools.ffmpeg_bin
    /// - WEBMUX_FFPROBE_BIN -> tools.ffprobe_bin
    /// - WEBMUX_PROBE_TIMEOUT_SECS -> tools.probe_timeout_secs
    /// - WEBMUX_TRANSCODE_TIMEOUT_SECS -> tools.transcode_timeout_secs
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("WEBMUX_MAX_JOBS") {
            if let Ok(jobs) = val.parse::<u32>() {
                self.jobs.max_jobs = jobs;
            }
        }

        if let Ok(val) = env::var("WEBMUX_QUEUE_CAPACITY") {
            if let Ok(cap) = val.parse::<usize>() {
                self.jobs.queue_capacity = cap;
            }
        }

        if let Ok(val) = env::var("WEBMUX_FFMPEG_BIN") {
            if !val.is_empty() {
                self.tools.ffmpeg_bin = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("WEBMUX_FFPROBE_BIN") {
            if !val.is_empty() {
                self.tools.ffprobe_bin = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("WEBMUX_PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.tools.probe_timeout_secs = secs;
            }
        }

        if let Ok(val) = env::var("WEBMUX_TRANSCODE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.tools.transcode_timeout_secs = secs;
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests don't interfere with each other
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to clear all config-related env vars
    fn clear_env_vars() {
        env::remove_var("WEBMUX_MAX_JOBS");
        env::remove_var("WEBMUX_QUEUE_CAPACITY");
        env::remove_var("WEBMUX_FFMPEG_BIN");
        env::remove_var("WEBMUX_FFPROBE_BIN");
        env::remove_var("WEBMUX_PROBE_TIMEOUT_SECS");
        env::remove_var("WEBMUX_TRANSCODE_TIMEOUT_SECS");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_config_parses_all_sections(
            max_jobs in 1u32..64,
            queue_capacity in 1usize..1024,
            probe_secs in 0u64..600,
            transcode_secs in 0u64..86400,
        ) {
            let toml_str = format!(
                r#"
watch_dir = "/media/incoming"
out_dir = "/media/converted"

[jobs]
max_jobs = {}
queue_capacity = {}

[tools]
probe_timeout_secs = {}
transcode_timeout_secs = {}
"#,
                max_jobs, queue_capacity, probe_secs, transcode_secs
            );

            let config = Config::parse_toml(&toml_str).expect("Valid TOML should parse");

            prop_assert_eq!(config.watch_dir, PathBuf::from("/media/incoming"));
            prop_assert_eq!(config.out_dir, PathBuf::from("/media/converted"));
            prop_assert_eq!(config.jobs.max_jobs, max_jobs);
            prop_assert_eq!(config.jobs.queue_capacity, queue_capacity);
            prop_assert_eq!(config.tools.probe_timeout_secs, probe_secs);
            prop_assert_eq!(config.tools.transcode_timeout_secs, transcode_secs);
        }

        #[test]
        fn prop_env_overrides_max_jobs(
            initial_jobs in 1u32..32,
            override_jobs in 1u32..64,
        ) {
            let _guard = ENV_MUTEX.lock().unwrap();
            clear_env_vars();

            let toml_str = format!(
                r#"
[jobs]
max_jobs = {}
"#,
                initial_jobs
            );

            let mut config = Config::parse_toml(&toml_str).expect("Valid TOML");

            env::set_var("WEBMUX_MAX_JOBS", override_jobs.to_string());
            config.apply_env_overrides();
            clear_env_vars();

            prop_assert_eq!(config.jobs.max_jobs, override_jobs);
        }

        #[test]
        fn prop_env_overrides_queue_capacity(
            initial_cap in 1usize..256,
            override_cap in 1usize..1024,
        ) {
            let _guard = ENV_MUTEX.lock().unwrap();
            clear_env_vars();

            let toml_str = format!(
                r#"
[jobs]
queue_capacity = {}
"#,
                initial_cap
            );

            let mut config = Config::parse_toml(&toml_str).expect("Valid TOML");

            env::set_var("WEBMUX_QUEUE_CAPACITY", override_cap.to_string());
            config.apply_env_overrides();
            clear_env_vars();

            prop_assert_eq!(config.jobs.queue_capacity, override_cap);
        }

        #[test]
        fn prop_env_overrides_tool_bins(
            ffmpeg in "[a-z0-9/_-]{1,30}",
            ffprobe in "[a-z0-9/_-]{1,30}",
        ) {
            let _guard = ENV_MUTEX.lock().unwrap();
            clear_env_vars();

            let mut config = Config::default();

            env::set_var("WEBMUX_FFMPEG_BIN", &ffmpeg);
            env::set_var("WEBMUX_FFPROBE_BIN", &ffprobe);
            config.apply_env_overrides();
            clear_env_vars();

            prop_assert_eq!(config.tools.ffmpeg_bin, PathBuf::from(ffmpeg));
            prop_assert_eq!(config.tools.ffprobe_bin, PathBuf::from(ffprobe));
        }

        #[test]
        fn prop_env_overrides_timeouts(
            probe_secs in 0u64..600,
            transcode_secs in 0u64..86400,
        ) {
            let _guard = ENV_MUTEX.lock().unwrap();
            clear_env_vars();

            let mut config = Config::default();

            env::set_var("WEBMUX_PROBE_TIMEOUT_SECS", probe_secs.to_string());
            env::set_var("WEBMUX_TRANSCODE_TIMEOUT_SECS", transcode_secs.to_string());
            config.apply_env_overrides();
            clear_env_vars();

            prop_assert_eq!(config.tools.probe_timeout_secs, probe_secs);
            prop_assert_eq!(config.tools.transcode_timeout_secs, transcode_secs);
        }
    }

    // Test that missing sections use defaults
    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse_toml("").expect("Empty TOML should parse");

        assert_eq!(config.watch_dir, PathBuf::new());
        assert_eq!(config.out_dir, PathBuf::new());
        assert_eq!(config.log_file, None);
        assert_eq!(config.jobs.max_jobs, 2);
        assert_eq!(config.jobs.queue_capacity, 16);
        assert_eq!(config.tools.ffmpeg_bin, PathBuf::from("ffmpeg"));
        assert_eq!(config.tools.ffprobe_bin, PathBuf::from("ffprobe"));
        assert_eq!(config.tools.probe_timeout_secs, 60);
        assert_eq!(config.tools.transcode_timeout_secs, 0);
    }

    // Test partial config with some sections missing
    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let toml_str = r#"
watch_dir = "/srv/dropbox"

[jobs]
max_jobs = 4
"#;
        let config = Config::parse_toml(toml_str).expect("Partial TOML should parse");

        assert_eq!(config.watch_dir, PathBuf::from("/srv/dropbox"));
        assert_eq!(config.jobs.max_jobs, 4);
        assert_eq!(config.jobs.queue_capacity, 16); // default
        assert_eq!(config.tools.probe_timeout_secs, 60); // default
    }

    #[test]
    fn test_deadline_zero_disables() {
        let tools = ToolsConfig {
            probe_timeout_secs: 0,
            transcode_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(tools.probe_deadline(), None);
        assert_eq!(tools.transcode_deadline(), None);
    }

    #[test]
    fn test_deadline_nonzero() {
        let tools = ToolsConfig {
            probe_timeout_secs: 30,
            transcode_timeout_secs: 7200,
            ..Default::default()
        };
        assert_eq!(tools.probe_deadline(), Some(Duration::from_secs(30)));
        assert_eq!(tools.transcode_deadline(), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_log_file_parsed() {
        let toml_str = r#"
log_file = "/var/log/webmux.log"
"#;
        let config = Config::parse_toml(toml_str).expect("Valid TOML");
        assert_eq!(config.log_file, Some(PathBuf::from("/var/log/webmux.log")));
    }
}
