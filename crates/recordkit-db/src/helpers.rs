use recordkit_query::Value;
use serde_json::json;

/// Converts a SQLite value into JSON. Blobs become arrays of bytes.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(b),
    }
}

/// Parses user-supplied text into the closest SQLite value.
///
/// `null` maps to `Null`, integers and floats to their numeric values, and
/// anything else stays text.
pub fn parse_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Value::Real(f);
        }
    }
    Value::Text(raw.to_string())
}

/// The integer held by `value`, if any.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("NULL"), Value::Null);
        assert_eq!(parse_value("42"), Value::Integer(42));
        assert_eq!(parse_value("1.5"), Value::Real(1.5));
        assert_eq!(parse_value("inf"), Value::Text("inf".into()));
        assert_eq!(parse_value("ada"), Value::Text("ada".into()));
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::Integer(7)), json!(7));
        assert_eq!(value_to_json(&Value::Blob(vec![1, 2])), json!([1, 2]));
        assert_eq!(value_to_json(&Value::Null), serde_json::Value::Null);
    }
}
