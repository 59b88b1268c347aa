// This is the models module containing the value types shared with the server
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;
use crate::operations::AnalysisKind;

/// A planar point in the server's encoding.
///
/// `tag` carries the sample value used by geometry-mode interpolation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ServerPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<f64>,
}

impl ServerPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, tag: None }
    }

    pub fn with_tag(mut self, tag: f64) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Axis-aligned rectangle, serialized as the server's `Rectangle2D`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

// Servers read either the corner points or the flat edges, so both are written.
#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Rectangle2D {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left_bottom: Option<ServerPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right_top: Option<ServerPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    top: Option<f64>,
}

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Build bounds from a `[left, bottom, right, top]` slice.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [left, bottom, right, top] => Some(Self::new(*left, *bottom, *right, *top)),
            _ => None,
        }
    }
}

impl Serialize for Bounds {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Rectangle2D {
            left_bottom: Some(ServerPoint::new(self.left, self.bottom)),
            right_top: Some(ServerPoint::new(self.right, self.top)),
            left: Some(self.left),
            bottom: Some(self.bottom),
            right: Some(self.right),
            top: Some(self.top),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rect = Rectangle2D::deserialize(deserializer)?;
        if let (Some(lb), Some(rt)) = (rect.left_bottom, rect.right_top) {
            return Ok(Bounds::new(lb.x, lb.y, rt.x, rt.y));
        }
        match (rect.left, rect.bottom, rect.right, rect.top) {
            (Some(left), Some(bottom), Some(right), Some(top)) => Ok(Bounds::new(left, bottom, right, top)),
            _ => Err(serde::de::Error::custom(
                "bounds need leftBottom/rightTop or left/bottom/right/top",
            )),
        }
    }
}

// Geometry type tags understood by the server
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerGeometryType {
    Point,
    Line,
    LineM,
    Region,
    #[serde(other)]
    Unsupported,
}

/// The server's wire geometry: a flat point list split into `parts`.
///
/// For regions, `part_topo` marks each part as an outer ring (`1`) or a hole (`-1`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerGeometry {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ServerGeometryType,
    #[serde(default)]
    pub parts: Vec<usize>,
    #[serde(default)]
    pub points: Vec<ServerPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_topo: Option<Vec<i32>>,
}

impl ServerGeometry {
    pub fn new(kind: ServerGeometryType) -> Self {
        Self {
            id: 0,
            kind,
            parts: Vec::new(),
            points: Vec::new(),
            part_topo: None,
        }
    }

    /// Append one part (ring, line or point group).
    pub fn push_part(&mut self, points: impl IntoIterator<Item = ServerPoint>) {
        let before = self.points.len();
        self.points.extend(points);
        self.parts.push(self.points.len() - before);
    }

    /// Iterate the points of each part in order.
    pub fn part_points(&self) -> impl Iterator<Item = &[ServerPoint]> + '_ {
        let mut offset: usize = 0;
        self.parts.iter().map(move |&count| {
            let end = offset.saturating_add(count).min(self.points.len());
            let start = offset.min(end);
            offset = offset.saturating_add(count);
            &self.points[start..end]
        })
    }
}

/// Output encoding requested for analysis results.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataFormat {
    #[default]
    GeoJson,
    IServer,
}

impl DataFormat {
    /// The caller's format, or GeoJSON when none was given.
    pub fn resolve(result_format: Option<DataFormat>) -> DataFormat {
        result_format.unwrap_or_default()
    }
}

impl FromStr for DataFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GEOJSON" => Ok(DataFormat::GeoJson),
            "ISERVER" => Ok(DataFormat::IServer),
            other => Err(ServiceError::InvalidParams(format!(
                "unknown result format '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::GeoJson => write!(f, "GEOJSON"),
            DataFormat::IServer => write!(f, "ISERVER"),
        }
    }
}

/// A completed analysis.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ServiceResult {
    pub kind: AnalysisKind,
    pub format: DataFormat,
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bounds_serialize_as_rectangle() {
        let bounds = Bounds::from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(
            serde_json::to_value(bounds).unwrap(),
            json!({
                "leftBottom": {"x": 1.0, "y": 2.0},
                "rightTop": {"x": 3.0, "y": 4.0},
                "left": 1.0,
                "bottom": 2.0,
                "right": 3.0,
                "top": 4.0
            })
        );
        assert!(Bounds::from_slice(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn bounds_read_either_form() {
        let corners: Bounds =
            serde_json::from_value(json!({"leftBottom": {"x": 0, "y": 1}, "rightTop": {"x": 2, "y": 3}})).unwrap();
        let edges: Bounds =
            serde_json::from_value(json!({"left": 0, "bottom": 1, "right": 2, "top": 3})).unwrap();
        assert_eq!(corners, Bounds::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(edges, corners);
        assert!(serde_json::from_value::<Bounds>(json!({"left": 0})).is_err());
    }

    #[test]
    fn format_resolution() {
        assert_eq!(DataFormat::resolve(None), DataFormat::GeoJson);
        assert_eq!(DataFormat::resolve(Some(DataFormat::IServer)), DataFormat::IServer);
        assert_eq!("iserver".parse::<DataFormat>().unwrap(), DataFormat::IServer);
        assert!("kml".parse::<DataFormat>().is_err());
        assert_eq!(serde_json::to_value(DataFormat::GeoJson).unwrap(), json!("GEOJSON"));
    }

    #[test]
    fn unknown_geometry_type_deserializes() {
        let geometry: ServerGeometry =
            serde_json::from_value(json!({"type": "TEXT", "parts": [], "points": []})).unwrap();
        assert_eq!(geometry.kind, ServerGeometryType::Unsupported);
    }

    #[test]
    fn part_points_splits_flat_list() {
        let mut geometry = ServerGeometry::new(ServerGeometryType::Line);
        geometry.push_part([ServerPoint::new(0.0, 0.0), ServerPoint::new(1.0, 1.0)]);
        geometry.push_part([ServerPoint::new(5.0, 5.0)]);
        let parts: Vec<usize> = geometry.part_points().map(|p| p.len()).collect();
        assert_eq!(parts, vec![2, 1]);
        assert_eq!(geometry.parts, vec![2, 1]);
    }

    #[test]
    fn oversized_part_counts_are_clamped() {
        let geometry: ServerGeometry = serde_json::from_value(json!({
            "type": "LINE",
            "parts": [1, usize::MAX, 3],
            "points": [{"x": 0, "y": 0}, {"x": 1, "y": 1}]
        }))
        .unwrap();
        let parts: Vec<usize> = geometry.part_points().map(|p| p.len()).collect();
        assert_eq!(parts, vec![1, 1, 0]);
    }
}
