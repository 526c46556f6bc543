//! Minimal GeoJSON ingestion for cache regions.
//!
//! Seed and delete requests carry a GeoJSON feature; only polygonal
//! geometry is meaningful for tile enumeration, so everything else is
//! skipped with a log line. Positions may carry altitude; only the
//! first two components are read.

use super::polygon::{Polygon, Ring};
use serde::Deserialize;
use tracing::warn;

/// A GeoJSON feature: geometry plus free-form properties.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

/// Geometry kept loosely typed so unknown kinds deserialize and can be
/// skipped instead of failing the whole request.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

impl Geometry {
    /// Extracts the polygons of this geometry; non-polygon kinds yield
    /// nothing.
    pub fn polygons(&self) -> Vec<Polygon> {
        match self.kind.as_str() {
            "Polygon" => parse_polygon(&self.coordinates).into_iter().collect(),
            "MultiPolygon" => {
                let Ok(raw) = serde_json::from_value::<Vec<serde_json::Value>>(
                    self.coordinates.clone(),
                ) else {
                    warn!("MultiPolygon coordinates are not an array, skipping");
                    return Vec::new();
                };
                raw.iter().filter_map(parse_polygon).collect()
            }
            other => {
                warn!(geometry = other, "skipping non-polygon geometry");
                Vec::new()
            }
        }
    }
}

impl Feature {
    /// Polygons of the feature's geometry, empty when absent.
    pub fn polygons(&self) -> Vec<Polygon> {
        match &self.geometry {
            Some(geometry) => geometry.polygons(),
            None => {
                warn!("feature has no geometry");
                Vec::new()
            }
        }
    }

    /// The feature's display name, when its properties carry one.
    pub fn name(&self) -> Option<String> {
        self.properties
            .as_ref()?
            .get("name")?
            .as_str()
            .map(str::to_owned)
    }
}

fn parse_polygon(value: &serde_json::Value) -> Option<Polygon> {
    let raw: Vec<Vec<Vec<f64>>> = serde_json::from_value(value.clone()).ok()?;
    let rings: Vec<Ring> = raw
        .into_iter()
        .filter_map(|ring| {
            let mut points: Ring = ring
                .into_iter()
                .filter(|p| p.len() >= 2)
                .map(|p| (p[0], p[1]))
                .collect();
            // GeoJSON rings repeat the first vertex; store rings open.
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            (points.len() >= 3).then_some(points)
        })
        .collect();
    (!rings.is_empty()).then(|| Polygon::new(rings))
}

/// Pulls features out of any of the shapes clients send: a
/// FeatureCollection, a single Feature, or a bare geometry.
pub fn features_from_json(value: &serde_json::Value) -> Vec<Feature> {
    match value.get("type").and_then(|t| t.as_str()) {
        Some("FeatureCollection") => value
            .get("features")
            .and_then(|f| f.as_array())
            .map(|features| {
                features
                    .iter()
                    .filter_map(|f| serde_json::from_value(f.clone()).ok())
                    .collect()
            })
            .unwrap_or_default(),
        Some("Feature") => serde_json::from_value::<Feature>(value.clone())
            .ok()
            .into_iter()
            .collect(),
        Some(_) => serde_json::from_value::<Geometry>(value.clone())
            .ok()
            .map(|geometry| Feature {
                geometry: Some(geometry),
                properties: None,
            })
            .into_iter()
            .collect(),
        None => Vec::new(),
    }
}
