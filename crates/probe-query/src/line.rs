use std::collections::HashMap;

use regex::Regex;

use probe_core::ConfigError;
use probe_shell::Response;

use crate::binding::Binding;
use crate::error::QueryError;
use crate::issue::{IssueSink, IssueTemplate, Severity};
use crate::rule::Rule;
use crate::verify::{Expectations, escalation_issue, verify};

/// Per-line binding scopes plus the response, returned for chaining.
#[derive(Debug)]
pub struct LineOutcome {
    pub lines: Vec<HashMap<String, Binding>>,
    pub response: Response,
}

/// Declarative extraction over line-oriented stdout.
///
/// Every line gets an implicit `_line` binding (and `_stdout` for the
/// full text); a line regexp adds named capture groups. Rules run once
/// per line in that line's scope. The common idiom is a substring rule
/// on `_line` with no captures at all.
#[derive(Debug, Default)]
pub struct LineQuery {
    line_regexp: Option<Regex>,
    rules: Vec<Rule>,
    issue_if_no_capture_groups: bool,
    raise_issue_if_no_groups_found: bool,
    expectations: Expectations,
    raise_issue_from_rsp_code: bool,
}

impl LineQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match each line against `pattern`, binding its named capture
    /// groups.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegex` for a malformed pattern.
    pub fn lines_like(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.line_regexp = Some(Regex::new(pattern)?);
        Ok(self)
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Record ONE aggregate issue when any line fails to match the line
    /// regexp, rather than one per offending line.
    #[must_use]
    pub fn issue_if_no_capture_groups(mut self, raise: bool) -> Self {
        self.issue_if_no_capture_groups = raise;
        self
    }

    /// Emit exactly one summary issue when a line regexp was given but
    /// no line anywhere produced capture bindings, independent of
    /// per-line rule results.
    #[must_use]
    pub fn raise_issue_if_no_groups_found(mut self, raise: bool) -> Self {
        self.raise_issue_if_no_groups_found = raise;
        self
    }

    #[must_use]
    pub fn expectations(mut self, expectations: Expectations) -> Self {
        self.expectations = expectations;
        self
    }

    /// Turn a verification failure into a synthetic issue instead of a
    /// hard error. Parsing stops either way.
    #[must_use]
    pub fn raise_issue_from_rsp_code(mut self, raise: bool) -> Self {
        self.raise_issue_from_rsp_code = raise;
        self
    }

    /// # Errors
    ///
    /// `QueryError::Verification` when the response fails its gate and
    /// escalation is off. Any text is valid line output, so there is no
    /// data-error equivalent here.
    pub async fn run<S: IssueSink>(
        &self,
        response: &Response,
        sink: &S,
    ) -> Result<LineOutcome, QueryError> {
        if let Err(failure) = verify(response, &self.expectations) {
            if self.raise_issue_from_rsp_code {
                tracing::debug!(%failure, "escalating verification failure to issue");
                sink.report(escalation_issue(&failure, response)).await;
                return Ok(LineOutcome {
                    lines: Vec::new(),
                    response: response.clone(),
                });
            }
            return Err(QueryError::Verification(failure));
        }

        let stdout = Binding::from(response.stdout.clone());
        let mut lines = Vec::new();
        let mut unmatched = 0usize;
        let mut first_unmatched: Option<String> = None;
        let mut any_groups_found = false;

        for line in response.stdout.lines() {
            let mut bindings = HashMap::new();
            bindings.insert("_stdout".to_owned(), stdout.clone());
            bindings.insert("_line".to_owned(), Binding::from(line));

            if let Some(regexp) = &self.line_regexp {
                if let Some(caps) = regexp.captures(line) {
                    let mut bound_any = false;
                    for name in regexp.capture_names().flatten() {
                        if let Some(m) = caps.name(name) {
                            bindings.insert(name.to_owned(), Binding::from(m.as_str()));
                            bound_any = true;
                        }
                    }
                    any_groups_found |= bound_any;
                } else {
                    unmatched += 1;
                    if first_unmatched.is_none() {
                        first_unmatched = Some(line.to_owned());
                    }
                }
            }

            for rule in &self.rules {
                if rule.is_satisfied(&bindings) {
                    sink.report(rule.build_issue(&bindings, response)).await;
                }
            }

            lines.push(bindings);
        }

        if self.issue_if_no_capture_groups && unmatched > 0 {
            let sample = first_unmatched.unwrap_or_default();
            sink.report(
                IssueTemplate::new("Output lines did not match the expected pattern")
                    .severity(Severity::Informational)
                    .expected("every line matches the line regexp")
                    .actual(format!("{unmatched} of {} lines unmatched", lines.len()))
                    .details(format!("first unmatched line: {sample}"))
                    .resolve(&HashMap::new(), response),
            )
            .await;
        }

        if self.raise_issue_if_no_groups_found
            && self.line_regexp.is_some()
            && !any_groups_found
        {
            sink.report(
                IssueTemplate::new("No output line produced capture bindings")
                    .severity(Severity::Informational)
                    .expected("at least one line matches the line regexp")
                    .actual(format!("0 of {} lines bound captures", lines.len()))
                    .resolve(&HashMap::new(), response),
            )
            .await;
        }

        Ok(LineOutcome {
            lines,
            response: response.clone(),
        })
    }
}
