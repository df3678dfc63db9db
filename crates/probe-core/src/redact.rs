use std::borrow::Cow;

use crate::secret::REDACTION_TOKEN;

/// Replace every verbatim occurrence of any of `values` with `[REDACTED]`.
///
/// Empty values are skipped. Returns `Cow::Borrowed` when nothing matched
/// (zero-allocation fast path).
#[must_use]
pub fn redact_all<'a, I>(text: &'a str, values: I) -> Cow<'a, str>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let hits: Vec<String> = values
        .into_iter()
        .filter(|v| !v.as_ref().is_empty() && text.contains(v.as_ref()))
        .map(|v| v.as_ref().to_owned())
        .collect();

    if hits.is_empty() {
        return Cow::Borrowed(text);
    }

    let mut out = text.to_owned();
    for value in &hits {
        out = out.replace(value, REDACTION_TOKEN);
    }
    Cow::Owned(out)
}
