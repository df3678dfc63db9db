use serde_json::Value;

/// A named value produced by a query engine, scoped to one parse call
/// (or one line, for the line engine).
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Text(String),
    Number(f64),
}

impl Binding {
    /// JSON strings stay text, numbers stay numeric; anything else keeps
    /// its JSON rendering so it remains usable in substring rules.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            other => Self::Text(other.to_string()),
        }
    }

    /// String form used for substring rules and `${var}` interpolation.
    /// Whole numbers render without a trailing `.0` so `3` and `3.0`
    /// read the same.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
        }
    }

    /// Numeric coercion: native numbers pass through, text is parsed.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<&str> for Binding {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Binding {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Binding {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}
