use geo_types::{Geometry, Point};
use serde_json::{Map, Value};

use crate::console_warn;
use crate::error::{Result, ServiceError};
use crate::geometry::{convert_geometry, geometry_to_geojson, position};
use crate::models::{Bounds, ServerPoint};

// Fields holding a single client geometry
const GEOMETRY_FIELDS: [&str; 4] = ["extractRegion", "clipRegion", "sourceGeometry", "operateGeometry"];
// Fields holding a list of points
const POINT_FIELDS: [&str; 2] = ["points", "inputPoints"];

/// Parameters for one analysis request, as a JSON object bag.
///
/// Geometry-valued members are stored as GeoJSON until the request is normalized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisParams {
    fields: Map<String, Value>,
}

impl AnalysisParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON object. `null` yields empty parameters.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ServiceError::InvalidParams(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn geometry(self, key: &str, geometry: &Geometry<f64>) -> Self {
        self.set(key, geometry_to_geojson(geometry))
    }

    pub fn geometries<'a>(self, key: &str, geometries: impl IntoIterator<Item = &'a Geometry<f64>>) -> Self {
        let list: Vec<Value> = geometries.into_iter().map(geometry_to_geojson).collect();
        self.set(key, list)
    }

    /// Set `bounds` from `[left, bottom, right, top]`.
    pub fn bounds(self, bounds: [f64; 4]) -> Self {
        self.set("bounds", bounds.to_vec())
    }

    pub fn points(self, key: &str, points: impl IntoIterator<Item = Point<f64>>) -> Self {
        let list: Vec<Value> = points
            .into_iter()
            .map(|p| Value::from(vec![p.x(), p.y()]))
            .collect();
        self.set(key, list)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for AnalysisParams {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Parameters after normalization, ready to be sent as the request body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedParams(Map<String, Value>);

impl NormalizedParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.get(key).map(|v| !v.is_null()).unwrap_or(false)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

// Server geometries already carry their parts; leave them as they are.
fn is_server_geometry(value: &Value) -> bool {
    value.get("parts").map(Value::is_array).unwrap_or(false)
        && value.get("points").map(Value::is_array).unwrap_or(false)
}

fn normalize_geometry(value: &Value) -> Value {
    if value.is_null() || is_server_geometry(value) {
        value.clone()
    } else {
        convert_geometry(value)
    }
}

fn normalize_geometry_list(value: &Value) -> Value {
    match value.as_array() {
        Some(list) => Value::Array(list.iter().map(normalize_geometry).collect()),
        None => value.clone(),
    }
}

fn read_point(value: &Value) -> Option<ServerPoint> {
    match value {
        Value::Array(_) => position(value),
        Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("Point") => {
            position(obj.get("coordinates")?)
        }
        Value::Object(obj) => {
            let point = ServerPoint::new(obj.get("x")?.as_f64()?, obj.get("y")?.as_f64()?);
            Some(match obj.get("tag").and_then(Value::as_f64) {
                Some(tag) => point.with_tag(tag),
                None => point,
            })
        }
        _ => None,
    }
}

fn normalize_point(value: &Value) -> Value {
    match read_point(value).map(serde_json::to_value) {
        Some(Ok(point)) => point,
        _ => {
            console_warn!("Dropping point that could not be read: {}", value);
            Value::Null
        }
    }
}

fn normalize_bounds(value: &Value) -> Value {
    let numbers: Option<Vec<f64>> = value
        .as_array()
        .and_then(|list| list.iter().map(Value::as_f64).collect());
    match numbers.as_deref().and_then(Bounds::from_slice).map(serde_json::to_value) {
        Some(Ok(bounds)) => bounds,
        _ => value.clone(),
    }
}

// A list of `{x, y, ...}` objects, as carried by server-form routes.
fn is_server_point_list(value: &Value) -> bool {
    value
        .as_array()
        .map(|list| list.iter().all(|p| p.get("x").is_some() && p.get("y").is_some()))
        .unwrap_or(false)
}

fn normalize_route(value: &Value) -> Value {
    if is_server_geometry(value) {
        return value.clone();
    }
    let mut route = value.clone();
    if let Some(obj) = route.as_object_mut() {
        if let Some(points) = obj
            .get("points")
            .filter(|v| !v.is_null() && !is_server_point_list(v))
        {
            let converted = normalize_geometry(points);
            obj.insert("points".to_string(), converted);
        }
        if let Some(components) = obj.get("components").filter(|v| v.is_array()) {
            let converted = normalize_geometry_list(components);
            obj.insert("components".to_string(), converted);
        }
    }
    route
}

/// Build the request body for `params`, leaving the caller's parameters untouched.
///
/// Bounding boxes become rectangles, point lists become server points and
/// client geometries become server geometries. Unrecognized members are
/// copied verbatim; absent parameters give an empty object.
pub fn normalize(params: Option<&AnalysisParams>) -> NormalizedParams {
    let Some(params) = params else {
        return NormalizedParams::default();
    };

    let mut out = Map::with_capacity(params.fields.len());
    for (key, value) in &params.fields {
        let normalized = match key.as_str() {
            _ if value.is_null() => value.clone(),
            "bounds" => normalize_bounds(value),
            k if POINT_FIELDS.contains(&k) => match value.as_array() {
                Some(list) => Value::Array(list.iter().map(normalize_point).collect()),
                None => value.clone(),
            },
            k if GEOMETRY_FIELDS.contains(&k) => normalize_geometry(value),
            "operateRegions" => normalize_geometry_list(value),
            "sourceRoute" => normalize_route(value),
            _ => value.clone(),
        };
        out.insert(key.clone(), normalized);
    }
    NormalizedParams(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon};
    use serde_json::json;

    #[test]
    fn absent_params_are_empty() {
        assert_eq!(normalize(None).to_value(), json!({}));
        let empty = AnalysisParams::from_value(Value::Null).unwrap();
        assert_eq!(normalize(Some(&empty)).to_value(), json!({}));
        assert!(AnalysisParams::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn bounds_array_becomes_rectangle() {
        let params = AnalysisParams::new().bounds([-10.0, -5.0, 20.0, 15.0]);
        let normalized = normalize(Some(&params));
        let bounds: Bounds = serde_json::from_value(normalized.get("bounds").unwrap().clone()).unwrap();
        assert_eq!(bounds, Bounds::new(-10.0, -5.0, 20.0, 15.0));
    }

    #[test]
    fn odd_bounds_pass_through() {
        let params = AnalysisParams::new().set("bounds", json!([1, 2, 3]));
        assert_eq!(normalize(Some(&params)).get("bounds"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn mixed_point_shapes_normalize() {
        let params = AnalysisParams::new().set(
            "points",
            json!([
                [1.0, 2.0],
                {"x": 3.0, "y": 4.0},
                {"type": "Point", "coordinates": [5.0, 6.0]},
            ]),
        );
        let normalized = normalize(Some(&params));
        let points: Vec<ServerPoint> =
            serde_json::from_value(normalized.get("points").unwrap().clone()).unwrap();
        assert_eq!(
            points,
            vec![
                ServerPoint::new(1.0, 2.0),
                ServerPoint::new(3.0, 4.0),
                ServerPoint::new(5.0, 6.0),
            ]
        );
    }

    #[test]
    fn input_points_keep_their_tag() {
        let params = AnalysisParams::new().set("inputPoints", json!([[1.0, 2.0, 30.5], {"x": 0, "y": 0, "tag": 7}]));
        let normalized = normalize(Some(&params));
        assert_eq!(
            normalized.get("inputPoints"),
            Some(&json!([{"x": 1.0, "y": 2.0, "tag": 30.5}, {"x": 0.0, "y": 0.0, "tag": 7.0}]))
        );
    }

    #[test]
    fn points_from_geo_types() {
        let params = AnalysisParams::new().points("points", vec![point!(x: 1.5, y: -2.5)]);
        let normalized = normalize(Some(&params));
        assert_eq!(normalized.get("points"), Some(&json!([{"x": 1.5, "y": -2.5}])));
    }

    #[test]
    fn geometry_fields_convert_and_caller_is_untouched() {
        let region = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0)
        ]);
        let params = AnalysisParams::new()
            .geometry("clipRegion", &region)
            .geometries("operateRegions", [&region, &region])
            .set("dataset", "Countries@World");
        let before = params.clone();

        let normalized = normalize(Some(&params));
        assert_eq!(params, before);

        let clip = normalized.get("clipRegion").unwrap();
        assert_eq!(clip["type"], "REGION");
        assert_eq!(clip["parts"], json!([4]));
        assert_eq!(normalized.get("operateRegions").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(normalized.get("operateRegions").unwrap()[1]["type"], "REGION");
        assert_eq!(normalized.str_field("dataset"), Some("Countries@World"));
    }

    #[test]
    fn source_route_members_convert() {
        let line = Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let params = AnalysisParams::new().set(
            "sourceRoute",
            json!({
                "points": geometry_to_geojson(&line),
                "components": [geometry_to_geojson(&line)],
                "id": 12,
            }),
        );
        let normalized = normalize(Some(&params));
        let route = normalized.get("sourceRoute").unwrap();
        assert_eq!(route["points"]["type"], "LINE");
        assert_eq!(route["components"][0]["parts"], json!([2]));
        assert_eq!(route["id"], 12);
    }

    #[test]
    fn server_route_passes_through() {
        let route = json!({
            "type": "LINEM",
            "parts": [2],
            "points": [
                {"x": 0.0, "y": 0.0, "measure": 0.0},
                {"x": 10.0, "y": 0.0, "measure": 10.0}
            ]
        });
        let params = AnalysisParams::new().set("sourceRoute", route.clone());
        assert_eq!(normalize(Some(&params)).get("sourceRoute"), Some(&route));

        let bare_points = json!({"id": 3, "points": [{"x": 1.0, "y": 2.0, "measure": 5.0}]});
        let params = AnalysisParams::new().set("sourceRoute", bare_points.clone());
        assert_eq!(normalize(Some(&params)).get("sourceRoute"), Some(&bare_points));
    }

    #[test]
    fn malformed_geometry_degrades_to_null() {
        let params = AnalysisParams::new().set("sourceGeometry", json!({"type": "Polygon"}));
        let normalized = normalize(Some(&params));
        assert_eq!(normalized.get("sourceGeometry"), Some(&Value::Null));
        assert!(!normalized.contains("sourceGeometry"));
    }

    #[test]
    fn server_geometry_is_not_converted_twice() {
        let server = json!({"type": "POINT", "parts": [1], "points": [{"x": 1, "y": 1}]});
        let params = AnalysisParams::new().set("sourceGeometry", server.clone());
        assert_eq!(normalize(Some(&params)).get("sourceGeometry"), Some(&server));
    }

    #[test]
    fn unknown_fields_pass_through() {
        let params = AnalysisParams::from_value(json!({
            "bufferSetting": {"leftDistance": {"value": 100}},
            "isAttributeRetained": true,
            "clipRegion": null,
        }))
        .unwrap();
        let normalized = normalize(Some(&params));
        assert_eq!(normalized.get("bufferSetting"), Some(&json!({"leftDistance": {"value": 100}})));
        assert_eq!(normalized.get("isAttributeRetained"), Some(&json!(true)));
        assert_eq!(normalized.get("clipRegion"), Some(&Value::Null));
    }
}
