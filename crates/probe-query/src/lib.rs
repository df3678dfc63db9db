//! Declarative query engines: verify a command response, extract named
//! bindings from JSON or line output, evaluate rules, raise issues.

pub mod binding;
pub mod error;
pub mod issue;
pub mod json;
pub mod line;
pub mod path;
pub mod rule;
pub mod verify;

pub use binding::Binding;
pub use error::QueryError;
pub use issue::{Issue, IssueSink, IssueTemplate, MemorySink, Severity, TracingSink};
pub use json::{JsonQuery, ParseOutcome};
pub use line::{LineOutcome, LineQuery};
pub use rule::{Operator, Rule};
pub use verify::{Expectations, VerifyFailure, verify};
