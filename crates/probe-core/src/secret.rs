use std::fmt;

use serde::Deserialize;

/// Token substituted for secret material in history entries and issue text.
pub const REDACTION_TOKEN: &str = "[REDACTED]";

/// Wrapper for sensitive strings with redacted Debug/Display.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTION_TOKEN)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTION_TOKEN)
    }
}

/// How a secret reaches the executed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// Exported as an environment variable; `${name.key}` resolves to the value.
    Inline,
    /// Written to a 0600 temp file; `${name.key}` resolves to the file path.
    File,
}

/// A named secret attached to a single command.
///
/// Referenced from the command line as `${name.key}`. The value itself
/// never appears in Debug output, history, or issue text.
#[derive(Clone)]
pub struct SecretRef {
    name: String,
    kind: SecretKind,
    value: Secret,
}

impl SecretRef {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SecretKind::Inline,
            value: Secret::new(value),
        }
    }

    pub fn file(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SecretKind::File,
            value: Secret::new(value),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> &Secret {
        &self.value
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .finish()
    }
}
