//! USGS GeoJSON summary feed.
//!
//! See <https://earthquake.usgs.gov/earthquakes/feed/v1.0/geojson.php> for the
//! feature layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::ParseError, timestamp};

use super::magnitude_value;

/// Cutoff used by the dashboard's weekly feed.
pub const DASHBOARD_CUTOFF: f64 = 2.0;

/// Cutoff used by the monthly CSV export.
pub const EXPORT_CUTOFF: f64 = 2.5;

#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Option<Vec<Feature>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Option<Vec<Option<f64>>>,
}

/// One row of the global warehouse table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalQuake {
    pub date: String,
    pub time: String,
    pub magnitude: f64,
    pub location: String,
    pub title: String,
    pub tsunami: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Feature {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    pub fn magnitude(&self) -> Option<f64> {
        self.property("mag").and_then(magnitude_value)
    }

    /// `true` when the magnitude is present and at least `cutoff`.
    pub fn is_at_least(&self, cutoff: f64) -> bool {
        self.magnitude().is_some_and(|m| m >= cutoff)
    }

    /// Epoch milliseconds of the event.
    pub fn time_ms(&self) -> Option<i64> {
        match self.property("time")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn coordinate(&self, index: usize) -> Option<f64> {
        self.geometry
            .as_ref()
            .and_then(|g| g.coordinates.as_ref())
            .and_then(|c| c.get(index).copied().flatten())
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinate(0)
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinate(1)
    }

    pub fn depth(&self) -> Option<f64> {
        self.coordinate(2)
    }

    fn text(&self, key: &str) -> String {
        match self.property(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    fn tsunami(&self) -> bool {
        match self.property("tsunami") {
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    /// Maps the feature to a warehouse row. Features without a magnitude or a
    /// usable time do not produce a row.
    pub fn to_quake(&self) -> Option<GlobalQuake> {
        let magnitude = self.magnitude()?;
        let (date, time) = timestamp::ms_to_date_time(self.time_ms()?)?;

        Some(GlobalQuake {
            date,
            time,
            magnitude,
            location: self.text("place"),
            title: self.text("title"),
            tsunami: self.tsunami(),
            lat: self.latitude(),
            lon: self.longitude(),
        })
    }
}

/// Parses the feed body and returns every feature, unfiltered.
pub fn parse_features(body: &str) -> Result<Vec<Feature>, ParseError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    collection.features.ok_or(ParseError::MissingFeatures)
}

/// Keeps features whose magnitude is at least `cutoff`.
pub fn filter_by_magnitude(features: Vec<Feature>, cutoff: f64) -> Vec<Feature> {
    features.into_iter().filter(|f| f.is_at_least(cutoff)).collect()
}

/// Parses, filters by `cutoff` and maps the feed to warehouse rows.
pub fn parse_quakes(body: &str, cutoff: f64) -> Result<Vec<GlobalQuake>, ParseError> {
    let features = filter_by_magnitude(parse_features(body)?, cutoff);
    let quakes: Vec<GlobalQuake> = features.iter().filter_map(Feature::to_quake).collect();

    if quakes.len() != features.len() {
        tracing::warn!(
            dropped = features.len() - quakes.len(),
            "features without a usable time were skipped"
        );
    }

    Ok(quakes)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use serde_json::json;

    pub fn feed_fixture() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "id": "us1",
                    "properties": {
                        "mag": 4.6, "place": "10 km S of Hualien City, Taiwan",
                        "time": 1_700_000_000_000_i64, "title": "M 4.6 - Taiwan", "tsunami": 1
                    },
                    "geometry": { "coordinates": [121.6, 23.9, 10.0] }
                },
                {
                    "id": "ak2",
                    "properties": {
                        "mag": 2.0, "place": "Alaska", "time": 1_700_000_100_000_i64,
                        "title": "M 2.0 - Alaska", "tsunami": 0
                    },
                    "geometry": { "coordinates": [-150.1] }
                },
                {
                    "id": "ci3",
                    "properties": { "mag": 1.99, "place": "California", "time": 1_700_000_200_000_i64 },
                    "geometry": { "coordinates": [-117.0, 34.0, 5.0] }
                },
                {
                    "id": "nc4",
                    "properties": { "mag": null, "place": "Nowhere", "time": 1_700_000_300_000_i64 },
                    "geometry": null
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn should_filter_below_cutoff_and_keep_boundary() {
        let quakes = parse_quakes(&feed_fixture(), DASHBOARD_CUTOFF).unwrap();

        assert_eq!(quakes.len(), 2);
        assert_eq!(quakes[0].magnitude, 4.6);
        assert_eq!(quakes[1].magnitude, 2.0);
    }

    #[test]
    fn should_exclude_everything_under_export_cutoff() {
        let features = filter_by_magnitude(parse_features(&feed_fixture()).unwrap(), EXPORT_CUTOFF);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id.as_deref(), Some("us1"));
    }

    #[test]
    fn should_map_coordinates_positionally() {
        let quakes = parse_quakes(&feed_fixture(), DASHBOARD_CUTOFF).unwrap();

        assert_eq!(quakes[0].lon, Some(121.6));
        assert_eq!(quakes[0].lat, Some(23.9));
        assert_eq!(quakes[1].lon, Some(-150.1));
        assert_eq!(quakes[1].lat, None);
    }

    #[test]
    fn should_map_properties() {
        let quakes = parse_quakes(&feed_fixture(), DASHBOARD_CUTOFF).unwrap();
        let q = &quakes[0];

        assert_eq!(q.date, "2023-11-14");
        assert_eq!(q.time, "22:13:20");
        assert_eq!(q.location, "10 km S of Hualien City, Taiwan");
        assert_eq!(q.title, "M 4.6 - Taiwan");
        assert!(q.tsunami);
        assert!(!quakes[1].tsunami);
    }

    #[test]
    fn should_fail_without_features() {
        let err = parse_features(r#"{"type":"FeatureCollection"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingFeatures));

        let err = parse_features("<html>").unwrap_err();
        assert!(matches!(err, ParseError::GeoJson(_)));
    }
}
