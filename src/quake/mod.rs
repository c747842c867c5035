//! Normalised earthquake records and the parsers that produce them.

pub mod global;
pub mod jp;

use serde::{Serialize, Serializer};
use serde_json::Value;

pub use global::{Feature, GlobalQuake};
pub use jp::{DetailOutcome, JpQuake};

/// Token the JP portal uses for "not reported".
pub const NOT_REPORTED: &str = "---";

/// Shindo token of an event. `NotReported` is never the same as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Intensity {
    Reported(String),
    #[default]
    NotReported,
}

impl Intensity {
    /// Reads a cell verbatim; blank cells and the sentinel are not reported.
    pub fn from_cell(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == NOT_REPORTED {
            Intensity::NotReported
        } else {
            Intensity::Reported(text.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Intensity::Reported(s) => s,
            Intensity::NotReported => NOT_REPORTED,
        }
    }
}

impl Serialize for Intensity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Coerces a magnitude to a finite, non-negative decimal.
pub fn parse_magnitude(text: &str) -> Option<f64> {
    let text = text.trim();
    if text == NOT_REPORTED {
        return None;
    }

    text.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Magnitude of a GeoJSON property value, which may be a number or a numeric
/// string. Unlike [`parse_magnitude`] this keeps negative values so the
/// cutoff comparison sees them.
pub fn magnitude_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_keep_sentinel_distinct_from_zero() {
        assert_eq!(Intensity::from_cell("---"), Intensity::NotReported);
        assert_eq!(Intensity::from_cell("0"), Intensity::Reported("0".to_string()));
        assert_eq!(serde_json::to_value(Intensity::NotReported).unwrap(), json!("---"));
        assert_eq!(
            serde_json::to_value(Intensity::Reported("5弱".to_string())).unwrap(),
            json!("5弱")
        );
    }

    #[test]
    fn should_parse_magnitude() {
        assert_eq!(parse_magnitude(" 4.2 "), Some(4.2));
        assert_eq!(parse_magnitude("---"), None);
        assert_eq!(parse_magnitude("NaN"), None);
        assert_eq!(parse_magnitude("-1.0"), None);
        assert_eq!(parse_magnitude("M4"), None);
    }

    #[test]
    fn should_read_magnitude_from_json() {
        assert_eq!(magnitude_value(&json!(2.5)), Some(2.5));
        assert_eq!(magnitude_value(&json!("3.1")), Some(3.1));
        assert_eq!(magnitude_value(&json!(null)), None);
        assert_eq!(magnitude_value(&json!(-0.4)), Some(-0.4));
    }
}
