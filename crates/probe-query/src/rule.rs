use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use probe_core::ConfigError;
use probe_shell::Response;

use crate::binding::Binding;
use crate::issue::{Issue, IssueTemplate};

/// Comparison operator, named by its call-site token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Lt,
    Contains,
    NotContains,
    Eq,
    Neq,
}

impl FromStr for Operator {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "contains" => Ok(Self::Contains),
            "ncontains" => Ok(Self::NotContains),
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            other => Err(ConfigError::UnknownOperator {
                token: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Contains => "contains",
            Self::NotContains => "ncontains",
            Self::Eq => "eq",
            Self::Neq => "neq",
        };
        f.write_str(token)
    }
}

/// One declarative check: compare a binding against a threshold; a
/// satisfied rule materializes its issue template.
#[derive(Debug, Clone)]
pub struct Rule {
    var: String,
    op: Operator,
    threshold: String,
    template: IssueTemplate,
}

impl Rule {
    /// # Errors
    ///
    /// `gt`/`lt` require a numeric threshold; violations fail here, at
    /// declaration time, never during evaluation.
    pub fn new(
        var: impl Into<String>,
        op: Operator,
        threshold: impl Into<String>,
        template: IssueTemplate,
    ) -> Result<Self, ConfigError> {
        let threshold = threshold.into();
        if matches!(op, Operator::Gt | Operator::Lt) && threshold.trim().parse::<f64>().is_err() {
            return Err(ConfigError::NonNumericThreshold {
                op: op.to_string(),
                threshold,
            });
        }
        Ok(Self {
            var: var.into(),
            op,
            threshold,
            template,
        })
    }

    /// Like [`Rule::new`] but with the operator as its call-site token.
    ///
    /// # Errors
    ///
    /// Rejects unknown operator tokens and non-numeric `gt`/`lt`
    /// thresholds.
    pub fn parse(
        var: impl Into<String>,
        op_token: &str,
        threshold: impl Into<String>,
        template: IssueTemplate,
    ) -> Result<Self, ConfigError> {
        Self::new(var, op_token.parse()?, threshold, template)
    }

    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Evaluate against one binding scope. A missing binding or a value
    /// that cannot be coerced numerically for `gt`/`lt` leaves the rule
    /// unsatisfied; rules never mutate the scope.
    #[must_use]
    pub fn is_satisfied(&self, bindings: &HashMap<String, Binding>) -> bool {
        let Some(value) = bindings.get(&self.var) else {
            return false;
        };
        match self.op {
            Operator::Gt | Operator::Lt => {
                let Some(lhs) = value.as_number() else {
                    tracing::warn!(
                        var = %self.var,
                        "binding is not numeric, skipping {} rule",
                        self.op
                    );
                    return false;
                };
                // Threshold validated numeric at construction.
                let Ok(rhs) = self.threshold.trim().parse::<f64>() else {
                    return false;
                };
                if self.op == Operator::Gt {
                    lhs > rhs
                } else {
                    lhs < rhs
                }
            }
            Operator::Contains => value.as_text().contains(&self.threshold),
            Operator::NotContains => !value.as_text().contains(&self.threshold),
            Operator::Eq => loose_eq(value, &self.threshold),
            Operator::Neq => !loose_eq(value, &self.threshold),
        }
    }

    /// Build the issue for a satisfied rule: template fields interpolated
    /// against the scope plus `${threshold}`, then scrubbed of the
    /// response's secret values.
    #[must_use]
    pub fn build_issue(&self, bindings: &HashMap<String, Binding>, response: &Response) -> Issue {
        let mut scope = bindings.clone();
        scope.insert("threshold".to_owned(), Binding::from(self.threshold.clone()));
        self.template.resolve(&scope, response)
    }
}

/// Numeric comparison when both sides coerce, exact string equality
/// otherwise. Both sides come from parsing the same textual forms, so
/// exact float equality is the intended semantics.
#[allow(clippy::float_cmp)]
fn loose_eq(value: &Binding, threshold: &str) -> bool {
    if let (Some(lhs), Ok(rhs)) = (value.as_number(), threshold.trim().parse::<f64>()) {
        lhs == rhs
    } else {
        value.as_text() == threshold
    }
}
