use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use probe_core::{ConfigError, Secret, SecretRef, redact_all};

/// Where a command runs. Remote carries the shell-service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Remote(String),
}

/// A single command to dispatch, built once per call site.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    cmdline: String,
    env: HashMap<String, String>,
    secrets: Vec<SecretRef>,
    target: Target,
    timeout: Option<Duration>,
    include_in_history: bool,
    label: Option<String>,
}

impl ShellCommand {
    pub fn builder(cmdline: impl Into<String>) -> ShellCommandBuilder {
        ShellCommandBuilder {
            cmdline: cmdline.into(),
            env: HashMap::new(),
            secrets: Vec::new(),
            target: Target::Local,
            timeout: None,
            include_in_history: true,
            label: None,
        }
    }

    #[must_use]
    pub fn cmdline(&self) -> &str {
        &self.cmdline
    }

    #[must_use]
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Secrets in declaration order.
    #[must_use]
    pub fn secrets(&self) -> &[SecretRef] {
        &self.secrets
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn include_in_history(&self) -> bool {
        self.include_in_history
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Copy with an explicit timeout; used by the dispatcher to fill in
    /// the configured default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Clones of the attached secret values, carried on the response so
    /// issue text can be scrubbed when templates materialize.
    #[must_use]
    pub fn secret_values(&self) -> Vec<Secret> {
        self.secrets.iter().map(|s| s.value().clone()).collect()
    }

    /// The command line safe for logs: every secret value occurrence
    /// replaced by the redaction token. Placeholders are already opaque.
    #[must_use]
    pub fn redacted_cmdline(&self) -> String {
        redact_all(
            &self.cmdline,
            self.secrets.iter().map(|s| s.value().expose()),
        )
        .into_owned()
    }
}

/// Builder for [`ShellCommand`]; validation happens at `build`.
#[derive(Debug)]
pub struct ShellCommandBuilder {
    cmdline: String,
    env: HashMap<String, String>,
    secrets: Vec<SecretRef>,
    target: Target,
    timeout: Option<Duration>,
    include_in_history: bool,
    label: Option<String>,
}

impl ShellCommandBuilder {
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn secret(mut self, secret: SecretRef) -> Self {
        self.secrets.push(secret);
        self
    }

    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn include_in_history(mut self, include: bool) -> Self {
        self.include_in_history = include;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError::EmptyCommand` for a blank command line and
    /// `ConfigError::DuplicateSecret` when two secrets share a name.
    pub fn build(self) -> Result<ShellCommand, ConfigError> {
        if self.cmdline.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        for (i, secret) in self.secrets.iter().enumerate() {
            if self.secrets[..i].iter().any(|s| s.name() == secret.name()) {
                return Err(ConfigError::DuplicateSecret {
                    name: secret.name().to_owned(),
                });
            }
        }
        Ok(ShellCommand {
            cmdline: self.cmdline,
            env: self.env,
            secrets: self.secrets,
            target: self.target,
            timeout: self.timeout,
            include_in_history: self.include_in_history,
            label: self.label,
        })
    }
}

/// Whether the transport layer delivered the command at all, as opposed
/// to the command's own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Ok,
    Timeout,
    ConnectionError,
    ServiceError,
}

/// Uniform execution result, identical for local and remote paths.
/// Treated as immutable once constructed; `with_stdout` returns a copy.
#[derive(Debug, Clone)]
pub struct Response {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub transport: TransportStatus,
    /// Redacted command line, carried for reproduce hints.
    pub cmd_echo: String,
    /// Secret values from the originating command. Issue templates scrub
    /// these from every text field; `Secret` keeps them out of Debug.
    pub secret_values: Vec<Secret>,
    pub duration_ms: u64,
}

impl Response {
    /// Rebind stdout, keeping everything else; lets a second parse call
    /// operate on a derived scalar.
    #[must_use]
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.transport == TransportStatus::Ok && self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let cmd = ShellCommand::builder("echo hi").build().unwrap();
        assert_eq!(cmd.cmdline(), "echo hi");
        assert_eq!(cmd.target(), &Target::Local);
        assert!(cmd.timeout().is_none());
        assert!(cmd.include_in_history());
        assert!(cmd.label().is_none());
    }

    #[test]
    fn empty_command_rejected() {
        assert!(matches!(
            ShellCommand::builder("").build(),
            Err(ConfigError::EmptyCommand)
        ));
        assert!(matches!(
            ShellCommand::builder("   \n").build(),
            Err(ConfigError::EmptyCommand)
        ));
    }

    #[test]
    fn duplicate_secret_names_rejected() {
        let result = ShellCommand::builder("echo ${tok.value}")
            .secret(SecretRef::inline("tok", "a"))
            .secret(SecretRef::inline("tok", "b"))
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicateSecret { .. })));
    }

    #[test]
    fn secrets_keep_declaration_order() {
        let cmd = ShellCommand::builder("true")
            .secret(SecretRef::inline("first", "1"))
            .secret(SecretRef::file("second", "2"))
            .build()
            .unwrap();
        let names: Vec<_> = cmd.secrets().iter().map(probe_core::SecretRef::name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn redacted_cmdline_strips_pasted_values() {
        let cmd = ShellCommand::builder("curl -H 'Authorization: Bearer tok-abc'")
            .secret(SecretRef::inline("auth", "tok-abc"))
            .build()
            .unwrap();
        let redacted = cmd.redacted_cmdline();
        assert!(!redacted.contains("tok-abc"));
        assert!(redacted.contains("[REDACTED]"));
    }

    #[test]
    fn redacted_cmdline_leaves_placeholders() {
        let cmd = ShellCommand::builder("curl -H \"Auth: ${auth.token}\"")
            .secret(SecretRef::inline("auth", "tok-abc"))
            .build()
            .unwrap();
        assert_eq!(cmd.redacted_cmdline(), "curl -H \"Auth: ${auth.token}\"");
    }

    #[test]
    fn with_stdout_rebinds_only_stdout() {
        let rsp = Response {
            stdout: "original".to_owned(),
            stderr: "warnings".to_owned(),
            exit_code: 0,
            transport: TransportStatus::Ok,
            cmd_echo: "echo original".to_owned(),
            secret_values: Vec::new(),
            duration_ms: 12,
        };
        let rebound = rsp.clone().with_stdout("derived");
        assert_eq!(rebound.stdout, "derived");
        assert_eq!(rebound.stderr, rsp.stderr);
        assert_eq!(rebound.cmd_echo, rsp.cmd_echo);
    }

    #[test]
    fn response_debug_hides_secret_values() {
        let rsp = Response {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            transport: TransportStatus::Ok,
            cmd_echo: "login".to_owned(),
            secret_values: vec![Secret::new("tok-abc")],
            duration_ms: 1,
        };
        let debug = format!("{rsp:?}");
        assert!(!debug.contains("tok-abc"));
    }

    #[test]
    fn transport_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransportStatus::ConnectionError).unwrap(),
            "\"connection_error\""
        );
        let status: TransportStatus = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(status, TransportStatus::Timeout);
    }
}
