use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use serde::Serialize;

use probe_core::{Secret, redact_all};
use probe_shell::Response;

use crate::binding::Binding;

static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("interpolation regex is valid")
});

/// Issue severity, 1 (critical) through 4 (informational).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 1,
    Major = 2,
    Minor = 3,
    Informational = 4,
}

impl Severity {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Self::Critical),
            2 => Ok(Self::Major),
            3 => Ok(Self::Minor),
            4 => Ok(Self::Informational),
            other => Err(other),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// Issue text with `${var}` tokens, resolved against a binding scope
/// when a rule fires.
#[derive(Debug, Clone)]
pub struct IssueTemplate {
    pub severity: Severity,
    pub title: String,
    pub expected: String,
    pub actual: String,
    pub details: String,
    pub next_steps: String,
}

impl IssueTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            severity: Severity::Informational,
            title: title.into(),
            expected: String::new(),
            actual: String::new(),
            details: String::new(),
            next_steps: String::new(),
        }
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    #[must_use]
    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = actual.into();
        self
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    #[must_use]
    pub fn next_steps(mut self, next_steps: impl Into<String>) -> Self {
        self.next_steps = next_steps.into();
        self
    }

    /// Materialize the template: interpolate every field against the
    /// binding scope and attach the originating command for replay.
    ///
    /// Bindings come from command output, which may echo secret material
    /// back (error messages quoting a token, for instance), so every
    /// field is scrubbed against the response's secret values after
    /// interpolation.
    #[must_use]
    pub fn resolve(&self, bindings: &HashMap<String, Binding>, response: &Response) -> Issue {
        let values: Vec<&str> = response.secret_values.iter().map(Secret::expose).collect();
        let fill = |text: &str| {
            let resolved = interpolate(text, bindings);
            redact_all(&resolved, &values).into_owned()
        };
        Issue {
            severity: self.severity,
            title: fill(&self.title),
            expected: fill(&self.expected),
            actual: fill(&self.actual),
            details: fill(&self.details),
            next_steps: fill(&self.next_steps),
            reproduce_hint: response.cmd_echo.clone(),
        }
    }
}

/// A structured finding, handed to an external sink. Never persisted here.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub title: String,
    pub expected: String,
    pub actual: String,
    pub details: String,
    pub next_steps: String,
    /// Redacted command echo for manual replay.
    pub reproduce_hint: String,
}

/// Closed-vocabulary substitution: `${var}` resolves from the binding
/// map; unknown tokens stay verbatim. No general templating.
fn interpolate(text: &str, bindings: &HashMap<String, Binding>) -> String {
    VAR_REGEX
        .replace_all(text, |caps: &regex::Captures<'_>| {
            bindings
                .get(&caps[1])
                .map_or_else(|| caps[0].to_owned(), Binding::as_text)
        })
        .into_owned()
}

/// Destination for finished issues; the platform boundary.
pub trait IssueSink: Send + Sync {
    fn report(&self, issue: Issue) -> impl Future<Output = ()> + Send;
}

/// Sink that logs each issue through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl IssueSink for TracingSink {
    async fn report(&self, issue: Issue) {
        tracing::warn!(
            severity = issue.severity.as_u8(),
            title = %issue.title,
            actual = %issue.actual,
            reproduce = %issue.reproduce_hint,
            "issue raised"
        );
    }
}

/// In-memory sink for tests and callers that batch-forward issues.
#[derive(Debug, Default)]
pub struct MemorySink {
    issues: Mutex<Vec<Issue>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain collected issues in report order.
    #[must_use]
    pub fn drain(&self) -> Vec<Issue> {
        std::mem::take(
            &mut *self
                .issues
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IssueSink for MemorySink {
    async fn report(&self, issue: Issue) {
        self.issues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_core::REDACTION_TOKEN;
    use probe_shell::TransportStatus;

    fn scope(pairs: &[(&str, Binding)]) -> HashMap<String, Binding> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn response_with(cmd_echo: &str, secret_values: Vec<Secret>) -> Response {
        Response {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            transport: TransportStatus::Ok,
            cmd_echo: cmd_echo.to_owned(),
            secret_values,
            duration_ms: 1,
        }
    }

    #[test]
    fn severity_numeric_mapping() {
        assert_eq!(Severity::Critical.as_u8(), 1);
        assert_eq!(Severity::Informational.as_u8(), 4);
        assert_eq!(Severity::try_from(2).unwrap(), Severity::Major);
        assert_eq!(Severity::try_from(0), Err(0));
        assert_eq!(Severity::try_from(5), Err(5));
    }

    #[test]
    fn severity_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Severity::Minor).unwrap(), "3");
    }

    #[test]
    fn interpolation_resolves_known_vars() {
        let bindings = scope(&[("count", Binding::Number(3.0))]);
        assert_eq!(
            interpolate("found ${count} stale pods", &bindings),
            "found 3 stale pods"
        );
    }

    #[test]
    fn interpolation_leaves_unknown_vars() {
        let bindings = scope(&[]);
        assert_eq!(interpolate("raw ${missing} token", &bindings), "raw ${missing} token");
    }

    #[test]
    fn resolve_fills_all_fields_and_hint() {
        let bindings = scope(&[
            ("state", Binding::from("Degraded")),
            ("_stdout", Binding::from("full output")),
        ]);
        let issue = IssueTemplate::new("Service is ${state}")
            .severity(Severity::Major)
            .expected("state Running")
            .actual("state ${state}")
            .details("raw: ${_stdout}")
            .next_steps("restart the service")
            .resolve(&bindings, &response_with("az webapp show --name app1", Vec::new()));
        assert_eq!(issue.title, "Service is Degraded");
        assert_eq!(issue.actual, "state Degraded");
        assert_eq!(issue.details, "raw: full output");
        assert_eq!(issue.reproduce_hint, "az webapp show --name app1");
        assert_eq!(issue.severity, Severity::Major);
    }

    #[test]
    fn resolve_scrubs_secret_values_from_every_field() {
        // Command output echoed a secret back; it must not survive into
        // any issue field.
        let bindings = scope(&[("_line", Binding::from("auth failed for tok-super-9"))]);
        let rsp = response_with("login [REDACTED]", vec![Secret::new("tok-super-9")]);
        let issue = IssueTemplate::new("Auth failure: ${_line}")
            .expected("a valid token")
            .actual("output: ${_line}")
            .details("raw: ${_line}")
            .next_steps("rotate ${_line}")
            .resolve(&bindings, &rsp);
        for field in [
            &issue.title,
            &issue.actual,
            &issue.details,
            &issue.next_steps,
        ] {
            assert!(!field.contains("tok-super-9"));
            assert!(field.contains(REDACTION_TOKEN));
        }
        assert_eq!(issue.expected, "a valid token");
    }

    #[tokio::test]
    async fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        let rsp = response_with("cmd", Vec::new());
        for title in ["a", "b"] {
            sink.report(IssueTemplate::new(title).resolve(&HashMap::new(), &rsp))
                .await;
        }
        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].title, "a");
        assert_eq!(drained[1].title, "b");
        assert!(sink.is_empty());
    }
}
