use std::collections::HashMap;

use serde_json::Value;

use probe_shell::Response;

use crate::binding::Binding;
use crate::error::QueryError;
use crate::issue::IssueSink;
use crate::path::eval_path;
use crate::rule::Rule;
use crate::verify::{Expectations, escalation_issue, verify};

/// Bindings plus the (possibly rebound) response, returned for chaining.
#[derive(Debug)]
pub struct ParseOutcome {
    pub bindings: HashMap<String, Binding>,
    pub response: Response,
}

/// Declarative extraction over JSON stdout.
///
/// Pipeline order: verify, parse, extractions, copies, stdout rebinding,
/// rules. Bindings are scoped to one `run` call; the implicit `_stdout`
/// binding always holds the parsed stdout text.
#[derive(Debug, Default)]
pub struct JsonQuery {
    extractions: Vec<(String, String)>,
    copies: Vec<(String, String)>,
    assign_stdout_from: Option<String>,
    rules: Vec<Rule>,
    expectations: Expectations,
    raise_issue_from_rsp_code: bool,
}

impl JsonQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the value at `path` to `name`.
    #[must_use]
    pub fn extract(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.extractions.push((name.into(), path.into()));
        self
    }

    /// Rename an existing binding; hops chain in declaration order.
    #[must_use]
    pub fn copy(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.copies.push((from.into(), to.into()));
        self
    }

    /// After extraction, overwrite the returned response's stdout with
    /// the string form of a binding, so a follow-up parse call can work
    /// on the derived scalar.
    #[must_use]
    pub fn assign_stdout_from(mut self, var: impl Into<String>) -> Self {
        self.assign_stdout_from = Some(var.into());
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
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
    /// `QueryError::Verification` when the response fails its gate (and
    /// escalation is off), `QueryError::Json` for malformed stdout,
    /// `QueryError::Path`/`UnknownBinding` for bad extractions.
    pub async fn run<S: IssueSink>(
        &self,
        response: &Response,
        sink: &S,
    ) -> Result<ParseOutcome, QueryError> {
        if let Err(failure) = verify(response, &self.expectations) {
            if self.raise_issue_from_rsp_code {
                tracing::debug!(%failure, "escalating verification failure to issue");
                sink.report(escalation_issue(&failure, response)).await;
                return Ok(ParseOutcome {
                    bindings: HashMap::new(),
                    response: response.clone(),
                });
            }
            return Err(QueryError::Verification(failure));
        }

        let doc: Value = serde_json::from_str(&response.stdout)?;

        let mut bindings = HashMap::new();
        bindings.insert("_stdout".to_owned(), Binding::from(response.stdout.clone()));
        for (name, path) in &self.extractions {
            let value = eval_path(&doc, path)?;
            bindings.insert(name.clone(), Binding::from_json(&value));
        }
        for (from, to) in &self.copies {
            let value = bindings
                .get(from)
                .cloned()
                .ok_or_else(|| QueryError::UnknownBinding { name: from.clone() })?;
            bindings.insert(to.clone(), value);
        }

        let mut out = response.clone();
        if let Some(var) = &self.assign_stdout_from {
            let value = bindings
                .get(var)
                .ok_or_else(|| QueryError::UnknownBinding { name: var.clone() })?;
            out = out.with_stdout(value.as_text());
        }

        for rule in &self.rules {
            if rule.is_satisfied(&bindings) {
                sink.report(rule.build_issue(&bindings, response)).await;
            }
        }

        Ok(ParseOutcome {
            bindings,
            response: out,
        })
    }
}
