#![forbid(unsafe_code)]

//! Value-to-text conversion for display.

use rvm_runtime::Value;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Render a value the way a text node shows it: strings raw, integral
/// numbers without a fraction, null as empty, objects and arrays as compact
/// JSON.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(*n),
        Value::String(s) => s.clone(),
        Value::Node(node) => node.to_json().to_string(),
    }
}

fn render_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
        #[allow(clippy::cast_possible_truncation)]
        return (n as i64).to_string();
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvm_runtime::Tracker;
    use serde_json::json;

    #[test]
    fn primitives() {
        assert_eq!(render_value(&Value::Null), "");
        assert_eq!(render_value(&Value::from(true)), "true");
        assert_eq!(render_value(&Value::from("raw \"text\"")), "raw \"text\"");
    }

    #[test]
    fn numbers() {
        assert_eq!(render_value(&Value::from(3)), "3");
        assert_eq!(render_value(&Value::from(-0.0)), "0");
        assert_eq!(render_value(&Value::from(2.5)), "2.5");
        assert_eq!(render_value(&Value::from(0.1 + 0.2)), "0.30000000000000004");
        assert_eq!(render_value(&Value::from(f64::NAN)), "NaN");
        assert_eq!(render_value(&Value::from(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn nodes_render_as_compact_json() {
        let tracker = Tracker::default();
        let obj = tracker.observe(json!({"b": 1, "a": [true, null]}));
        assert_eq!(render_value(&obj), r#"{"a":[true,null],"b":1}"#);
    }
}
