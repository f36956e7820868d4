use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Top-level configuration, loaded from cmdpool.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmdpoolConfig {
    #[serde(default)]
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// How many command buffers are allocated at once when the free queue runs dry
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Fence wait timeout in milliseconds. Absent means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            wait_timeout_ms: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.batch_size == 0 {
            return Err(CoreError::ConfigError(
                "pool.batch_size must be at least 1".to_string(),
            ));
        }
        if self.wait_timeout_ms == Some(0) {
            return Err(CoreError::ConfigError(
                "pool.wait_timeout_ms must be non-zero; omit it to wait indefinitely".to_string(),
            ));
        }
        Ok(())
    }

    pub fn waits_indefinitely(&self) -> bool {
        self.wait_timeout_ms.is_none()
    }

    /// Timeout handed to the fence wait, in nanoseconds.
    pub fn wait_timeout_ns(&self) -> u64 {
        match self.wait_timeout_ms {
            Some(ms) => ms.saturating_mul(1_000_000),
            None => u64::MAX,
        }
    }
}

impl CmdpoolConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        let config: CmdpoolConfig = toml::from_str(content)?;
        config.pool.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(CoreError::Io(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring invalid config {}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, CoreError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Returns the default config file path.
/// Search order:
/// 1. System-wide config: `/etc/cmdpool/cmdpool.toml`
/// 2. Local fallback: `./cmdpool.toml`
pub fn default_config_path() -> String {
    let system_path = "/etc/cmdpool/cmdpool.toml";
    if std::path::Path::new(system_path).exists() {
        return system_path.to_string();
    }
    "cmdpool.toml".to_string()
}

fn default_batch_size() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_batched_indefinite_wait() {
        let config = PoolConfig::default();
        assert_eq!(config.batch_size, 10);
        assert!(config.waits_indefinitely());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = CmdpoolConfig::from_toml("").expect("empty config parses");
        assert_eq!(config, CmdpoolConfig::default());
    }

    #[test]
    fn partial_pool_section() {
        let config = CmdpoolConfig::from_toml("[pool]\nbatch_size = 4\n").expect("parses");
        assert_eq!(config.pool.batch_size, 4);
        assert_eq!(config.pool.wait_timeout_ns(), u64::MAX);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = CmdpoolConfig::from_toml("[pool]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = CmdpoolConfig::from_toml("[pool]\nwait_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(_)));
    }

    #[test]
    fn timeout_is_converted_to_nanoseconds() {
        let config = CmdpoolConfig::from_toml("[pool]\nwait_timeout_ms = 250\n").expect("parses");
        assert!(!config.pool.waits_indefinitely());
        assert_eq!(config.pool.wait_timeout_ns(), 250_000_000);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = CmdpoolConfig::from_toml("[pool\n").unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }

    #[test]
    fn toml_output_parses_back() {
        let mut config = CmdpoolConfig::default();
        config.pool.batch_size = 32;
        config.pool.wait_timeout_ms = Some(1_000);
        let text = config.to_toml().expect("serializes");
        assert_eq!(CmdpoolConfig::from_toml(&text).expect("parses"), config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = CmdpoolConfig::load_or_default("/nonexistent/cmdpool.toml");
        assert_eq!(config, CmdpoolConfig::default());
    }
}
