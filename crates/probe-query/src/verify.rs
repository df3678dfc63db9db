use std::fmt;

use probe_core::CoreConfig;
use probe_shell::{Response, TransportStatus};

/// Gate a response must pass before any parsing happens.
#[derive(Debug, Clone)]
pub struct Expectations {
    pub status: Vec<TransportStatus>,
    pub exit_codes: Vec<i32>,
    /// Whether non-empty stderr is acceptable. CLI tools routinely emit
    /// progress chatter on stderr, so the observed default is `true`.
    pub stderr_ok: bool,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            status: vec![TransportStatus::Ok],
            exit_codes: vec![0],
            stderr_ok: true,
        }
    }
}

impl Expectations {
    /// Defaults seeded from the workspace config, so a `stderr_ok = false`
    /// setting in TOML or the env actually tightens the gate.
    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            stderr_ok: config.stderr_ok,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(mut self, status: Vec<TransportStatus>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn exit_codes(mut self, exit_codes: Vec<i32>) -> Self {
        self.exit_codes = exit_codes;
        self
    }

    #[must_use]
    pub fn stderr_ok(mut self, ok: bool) -> Self {
        self.stderr_ok = ok;
        self
    }
}

/// Which gate rejected the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    Transport { got: TransportStatus },
    ExitCode { got: i32 },
    Stderr { stderr: String },
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { got } => write!(f, "unexpected transport status {got:?}"),
            Self::ExitCode { got } => write!(f, "unexpected exit code {got}"),
            Self::Stderr { stderr } => write!(f, "unexpected stderr output: {stderr}"),
        }
    }
}

impl std::error::Error for VerifyFailure {}

/// Check transport status, exit code, and stderr emptiness in that order.
///
/// # Errors
///
/// Returns the first failing gate.
pub fn verify(response: &Response, expectations: &Expectations) -> Result<(), VerifyFailure> {
    if !expectations.status.contains(&response.transport) {
        return Err(VerifyFailure::Transport {
            got: response.transport,
        });
    }
    if !expectations.exit_codes.contains(&response.exit_code) {
        return Err(VerifyFailure::ExitCode {
            got: response.exit_code,
        });
    }
    if !expectations.stderr_ok && !response.stderr.is_empty() {
        return Err(VerifyFailure::Stderr {
            stderr: response.stderr.clone(),
        });
    }
    Ok(())
}

/// Synthetic issue describing a transport/exit failure, used when a
/// query runs with `raise_issue_from_rsp_code`.
pub(crate) fn escalation_issue(failure: &VerifyFailure, response: &Response) -> crate::issue::Issue {
    use crate::issue::{IssueTemplate, Severity};

    IssueTemplate::new("Command returned an unexpected result")
        .severity(Severity::Major)
        .expected("accepted transport status and exit code")
        .actual(failure.to_string())
        .details(format!(
            "exit code {}, transport {:?}, stderr: {}",
            response.exit_code, response.transport, response.stderr
        ))
        .next_steps("re-run the command and inspect its transport and exit status")
        .resolve(&std::collections::HashMap::new(), response)
}

#[cfg(test)]
pub(crate) fn response(stdout: &str, stderr: &str, exit_code: i32) -> Response {
    Response {
        stdout: stdout.to_owned(),
        stderr: stderr.to_owned(),
        exit_code,
        transport: TransportStatus::Ok,
        cmd_echo: "test-cmd".to_owned(),
        secret_values: Vec::new(),
        duration_ms: 1,
    }
}
