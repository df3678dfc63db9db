use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Workspace-wide defaults for dispatch and verification.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Per-command timeout unless the command overrides it.
    pub timeout_secs: u64,
    /// Whether non-empty stderr passes verification by default. CLI tools
    /// routinely chatter on stderr, so the observed default is permissive;
    /// callers should confirm intent per query.
    pub stderr_ok: bool,
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Shell-service endpoint for remote dispatch.
    pub endpoint: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            stderr_ok: true,
            remote: None,
        }
    }
}

impl CoreConfig {
    /// Load config from a TOML file, then apply `PROBE_*` env overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus env overrides, for callers without a config file.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PROBE_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.timeout_secs = secs;
            } else {
                tracing::warn!("ignoring invalid PROBE_TIMEOUT_SECS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("PROBE_STDERR_OK") {
            if let Ok(ok) = v.parse::<bool>() {
                self.stderr_ok = ok;
            } else {
                tracing::warn!("ignoring invalid PROBE_STDERR_OK value: {v}");
            }
        }
        if let Ok(v) = std::env::var("PROBE_REMOTE_ENDPOINT") {
            self.remote = Some(RemoteConfig { endpoint: v });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write as _;

    #[test]
    fn defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert!(config.stderr_ok);
        assert!(config.remote.is_none());
    }

    #[test]
    #[serial]
    fn load_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timeout_secs = 30\nstderr_ok = false\n\n[remote]\nendpoint = \"http://shell.internal:9090/run\""
        )
        .unwrap();
        let config = CoreConfig::load(file.path()).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.stderr_ok);
        assert_eq!(
            config.remote.unwrap().endpoint,
            "http://shell.internal:9090/run"
        );
    }

    #[test]
    fn unknown_field_rejected() {
        let result: Result<CoreConfig, _> = toml::from_str("retries = 3");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_applied() {
        // SAFETY: test-only env mutation, serialized by #[serial].
        unsafe {
            std::env::set_var("PROBE_TIMEOUT_SECS", "5");
            std::env::set_var("PROBE_STDERR_OK", "false");
            std::env::set_var("PROBE_REMOTE_ENDPOINT", "http://localhost:1234/run");
        }
        let config = CoreConfig::from_env();
        unsafe {
            std::env::remove_var("PROBE_TIMEOUT_SECS");
            std::env::remove_var("PROBE_STDERR_OK");
            std::env::remove_var("PROBE_REMOTE_ENDPOINT");
        }
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.stderr_ok);
        assert_eq!(config.remote.unwrap().endpoint, "http://localhost:1234/run");
    }

    #[test]
    #[serial]
    fn invalid_env_value_ignored() {
        unsafe {
            std::env::set_var("PROBE_TIMEOUT_SECS", "soon");
        }
        let config = CoreConfig::from_env();
        unsafe {
            std::env::remove_var("PROBE_TIMEOUT_SECS");
        }
        assert_eq!(config.timeout_secs, 60);
    }
}
