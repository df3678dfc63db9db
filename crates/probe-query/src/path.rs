use serde_json::Value;

use crate::error::QueryError;

/// Evaluate a reduced json path against a document.
///
/// Supported grammar: dotted field access (`status.phase`), bracket
/// indexing (`items[0].name`), `@` for the document itself, and one
/// aggregate, `length(path)`, giving the element count of the navigated
/// array/object or the character count of a string. Deliberately not
/// JMESPath.
///
/// # Errors
///
/// Returns `QueryError::Path` for missing fields, out-of-range indexes,
/// or a `length()` target that is not a collection.
pub fn eval_path(root: &Value, path: &str) -> Result<Value, QueryError> {
    if let Some(inner) = path
        .strip_prefix("length(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let target = navigate(root, inner, path)?;
        let len = match &target {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::String(s) => s.chars().count(),
            _ => {
                return Err(QueryError::Path {
                    path: path.to_owned(),
                    reason: "length() target is not a collection".to_owned(),
                });
            }
        };
        return Ok(Value::from(len));
    }
    navigate(root, path, path)
}

fn navigate(root: &Value, path: &str, full_path: &str) -> Result<Value, QueryError> {
    let trimmed = path.trim().trim_start_matches('.');
    if trimmed.is_empty() || trimmed == "@" {
        return Ok(root.clone());
    }

    let mut current = root.clone();
    for segment in trimmed.split('.') {
        let (field, indexes) = split_indexes(segment, full_path)?;
        if !field.is_empty() {
            current = current
                .get(field)
                .cloned()
                .ok_or_else(|| QueryError::Path {
                    path: full_path.to_owned(),
                    reason: format!("field {field:?} not found"),
                })?;
        }
        for index in indexes {
            current = current
                .get(index)
                .cloned()
                .ok_or_else(|| QueryError::Path {
                    path: full_path.to_owned(),
                    reason: format!("index {index} out of bounds"),
                })?;
        }
    }
    Ok(current)
}

/// Split `items[0][1]` into (`items`, [0, 1]).
fn split_indexes<'a>(segment: &'a str, full_path: &str) -> Result<(&'a str, Vec<usize>), QueryError> {
    let Some(bracket) = segment.find('[') else {
        return Ok((segment, Vec::new()));
    };
    let (field, rest) = segment.split_at(bracket);
    let mut indexes = Vec::new();
    for part in rest.split('[').skip(1) {
        let number = part.strip_suffix(']').ok_or_else(|| QueryError::Path {
            path: full_path.to_owned(),
            reason: format!("unterminated index in segment {segment:?}"),
        })?;
        let index = number.parse().map_err(|_| QueryError::Path {
            path: full_path.to_owned(),
            reason: format!("non-numeric index {number:?}"),
        })?;
        indexes.push(index);
    }
    Ok((field, indexes))
}
