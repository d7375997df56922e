//! Forgiving deserialisers for numeric keyframe fields.
//!
//! A field that is missing, `null`, or not a number decodes to `NaN`. The
//! track validation pass then coerces it to the last known good value, so
//! one malformed field never rejects a whole project file.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn missing() -> f64 {
    f64::NAN
}

pub fn missing_rgb() -> [f64; 3] {
    [f64::NAN; 3]
}

pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_number(&value))
}

/// Like [`number`], but `null` and absent fields stay `None`.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|value| to_number(&value)))
}

pub fn rgb<'de, D>(deserializer: D) -> Result<[f64; 3], D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut rgb = missing_rgb();
    if let Value::Array(items) = value {
        for (slot, item) in rgb.iter_mut().zip(items.iter()) {
            *slot = to_number(item);
        }
    }
    Ok(rgb)
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => text.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Replaces a non-finite `value` with `fallback`. Returns whether it did.
pub fn coerce(value: &mut f64, fallback: f64) -> bool {
    if value.is_finite() {
        false
    } else {
        *value = fallback;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default = "missing", deserialize_with = "number")]
        value: f64,
        #[serde(default = "missing_rgb", deserialize_with = "rgb")]
        color: [f64; 3],
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let probe: Probe = serde_json::from_str(r#"{"value": "2.5", "color": [1, "0.5", 0]}"#).unwrap();
        assert_eq!(probe.value, 2.5);
        assert_eq!(probe.color, [1.0, 0.5, 0.0]);
    }

    #[test]
    fn malformed_fields_decode_to_nan() {
        let probe: Probe = serde_json::from_str(r#"{"value": "loud", "color": [1, null]}"#).unwrap();
        assert!(probe.value.is_nan());
        assert_eq!(probe.color[0], 1.0);
        assert!(probe.color[1].is_nan());
        assert!(probe.color[2].is_nan());

        let probe: Probe = serde_json::from_str("{}").unwrap();
        assert!(probe.value.is_nan());
    }

    #[test]
    fn coerce_only_touches_non_finite_values() {
        let mut value = 3.0;
        assert!(!coerce(&mut value, 1.0));
        assert_eq!(value, 3.0);

        let mut value = f64::INFINITY;
        assert!(coerce(&mut value, 1.0));
        assert_eq!(value, 1.0);
    }
}
