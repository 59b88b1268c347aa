use geo_types::{Coord, Geometry, LineString, Polygon};
use serde_json::{json, Map, Value};

use crate::console_warn;
use crate::models::{ServerGeometry, ServerGeometryType, ServerPoint};

// Client geometry -> GeoJSON

fn coord_json(c: &Coord<f64>) -> Value {
    json!([c.x, c.y])
}

fn line_json(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(coord_json).collect())
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![line_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(line_json));
    Value::Array(rings)
}

/// Serialize a client geometry as a GeoJSON geometry object.
pub fn geometry_to_geojson(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": coord_json(&p.0)}),
        Geometry::Line(l) => json!({
            "type": "LineString",
            "coordinates": [coord_json(&l.start), coord_json(&l.end)],
        }),
        Geometry::LineString(ls) => json!({"type": "LineString", "coordinates": line_json(ls)}),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": polygon_json(p)}),
        Geometry::MultiPoint(mp) => json!({
            "type": "MultiPoint",
            "coordinates": mp.iter().map(|p| coord_json(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(mls) => json!({
            "type": "MultiLineString",
            "coordinates": mls.iter().map(line_json).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(polygon_json).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(gc) => json!({
            "type": "GeometryCollection",
            "geometries": gc.iter().map(geometry_to_geojson).collect::<Vec<_>>(),
        }),
        Geometry::Rect(r) => geometry_to_geojson(&Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => geometry_to_geojson(&Geometry::Polygon(t.to_polygon())),
    }
}

// GeoJSON -> server geometry

/// Read a GeoJSON position. A third ordinate is kept as the point's tag.
pub fn position(value: &Value) -> Option<ServerPoint> {
    let coords = value.as_array()?;
    let x = coords.first()?.as_f64()?;
    let y = coords.get(1)?.as_f64()?;
    let point = ServerPoint::new(x, y);
    Some(match coords.get(2).and_then(Value::as_f64) {
        Some(tag) => point.with_tag(tag),
        None => point,
    })
}

fn positions(value: &Value) -> Option<Vec<ServerPoint>> {
    value.as_array()?.iter().map(position).collect()
}

fn rings(value: &Value) -> Option<Vec<Vec<ServerPoint>>> {
    value.as_array()?.iter().map(positions).collect()
}

fn push_polygon(geometry: &mut ServerGeometry, polygon: Vec<Vec<ServerPoint>>) {
    let topo = geometry.part_topo.get_or_insert_with(Vec::new);
    for i in 0..polygon.len() {
        topo.push(if i == 0 { 1 } else { -1 });
    }
    for ring in polygon {
        geometry.push_part(ring);
    }
}

/// Convert a GeoJSON geometry (or Feature) into the server's geometry.
///
/// Returns `None` for unsupported types and malformed coordinates.
pub fn geojson_to_server(value: &Value) -> Option<ServerGeometry> {
    let kind = value.get("type")?.as_str()?;
    if kind == "Feature" {
        return geojson_to_server(value.get("geometry")?);
    }
    let coordinates = value.get("coordinates")?;

    let geometry = match kind {
        "Point" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Point);
            g.push_part([position(coordinates)?]);
            g
        }
        "MultiPoint" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Point);
            for p in positions(coordinates)? {
                g.push_part([p]);
            }
            g
        }
        "LineString" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Line);
            g.push_part(positions(coordinates)?);
            g
        }
        "MultiLineString" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Line);
            for line in rings(coordinates)? {
                g.push_part(line);
            }
            g
        }
        "Polygon" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Region);
            push_polygon(&mut g, rings(coordinates)?);
            g
        }
        "MultiPolygon" => {
            let mut g = ServerGeometry::new(ServerGeometryType::Region);
            let polygons: Option<Vec<_>> = coordinates.as_array()?.iter().map(rings).collect();
            for polygon in polygons? {
                push_polygon(&mut g, polygon);
            }
            g
        }
        _ => return None,
    };

    if geometry.points.is_empty() {
        return None;
    }
    Some(geometry)
}

/// Round-trip a client geometry (GeoJSON value) into server geometry JSON.
///
/// A geometry that cannot be converted becomes `null`.
pub fn convert_geometry(value: &Value) -> Value {
    match geojson_to_server(value).map(serde_json::to_value) {
        Some(Ok(server)) => server,
        _ => {
            console_warn!("Dropping geometry that could not be converted: {}", value);
            Value::Null
        }
    }
}

// Server geometry -> GeoJSON

fn point_json(p: &ServerPoint) -> Value {
    json!([p.x, p.y])
}

fn part_json(part: &[ServerPoint]) -> Value {
    Value::Array(part.iter().map(point_json).collect())
}

/// Convert a server geometry into a GeoJSON geometry object.
pub fn server_to_geojson(geometry: &ServerGeometry) -> Option<Value> {
    match geometry.kind {
        ServerGeometryType::Point => match geometry.points.as_slice() {
            [] => None,
            [single] => Some(json!({"type": "Point", "coordinates": point_json(single)})),
            many => Some(json!({
                "type": "MultiPoint",
                "coordinates": many.iter().map(point_json).collect::<Vec<_>>(),
            })),
        },
        ServerGeometryType::Line | ServerGeometryType::LineM => {
            let lines: Vec<Value> = geometry.part_points().map(part_json).collect();
            match lines.len() {
                0 => None,
                1 => Some(json!({"type": "LineString", "coordinates": lines[0]})),
                _ => Some(json!({"type": "MultiLineString", "coordinates": lines})),
            }
        }
        ServerGeometryType::Region => {
            let topo = geometry
                .part_topo
                .as_ref()
                .filter(|t| t.len() == geometry.parts.len());
            let mut polygons: Vec<Vec<Value>> = Vec::new();
            for (i, part) in geometry.part_points().enumerate() {
                let is_hole = topo.map(|t| t[i] < 0).unwrap_or(false);
                if is_hole {
                    if let Some(polygon) = polygons.last_mut() {
                        polygon.push(part_json(part));
                        continue;
                    }
                }
                polygons.push(vec![part_json(part)]);
            }
            match polygons.len() {
                0 => None,
                1 => Some(json!({"type": "Polygon", "coordinates": polygons[0]})),
                _ => Some(json!({"type": "MultiPolygon", "coordinates": polygons})),
            }
        }
        ServerGeometryType::Unsupported => None,
    }
}

fn server_value_to_geojson(value: &Value) -> Value {
    serde_json::from_value::<ServerGeometry>(value.clone())
        .ok()
        .and_then(|g| server_to_geojson(&g))
        .unwrap_or(Value::Null)
}

fn feature_to_geojson(feature: &Value) -> Value {
    let mut properties = Map::new();
    if let (Some(names), Some(values)) = (
        feature.get("fieldNames").and_then(Value::as_array),
        feature.get("fieldValues").and_then(Value::as_array),
    ) {
        for (name, value) in names.iter().zip(values) {
            if let Some(name) = name.as_str() {
                properties.insert(name.to_string(), value.clone());
            }
        }
    }

    let mut out = json!({
        "type": "Feature",
        "geometry": feature.get("geometry").map(server_value_to_geojson).unwrap_or(Value::Null),
        "properties": properties,
    });
    if let Some(id) = feature.get("ID").or_else(|| feature.get("id")) {
        out["id"] = id.clone();
    }
    out
}

fn recordset_to_geojson(recordset: &Value) -> Option<Value> {
    let features = recordset.get("features")?.as_array()?;
    Some(json!({
        "type": "FeatureCollection",
        "features": features.iter().map(feature_to_geojson).collect::<Vec<_>>(),
    }))
}

/// Rewrite the geometry-bearing members of an analysis result as GeoJSON.
///
/// `recordset` and each entry of `recordsets` become FeatureCollections,
/// `resultGeometry` becomes a Feature. Other members are kept as they are.
pub fn result_to_geojson(mut response: Value) -> Value {
    if let Some(collection) = response.get("recordset").and_then(recordset_to_geojson) {
        response["recordset"] = collection;
    }

    if let Some(recordsets) = response.get_mut("recordsets").and_then(Value::as_array_mut) {
        for recordset in recordsets.iter_mut() {
            if let Some(collection) = recordset_to_geojson(recordset) {
                *recordset = collection;
            }
        }
    }

    if let Some(geometry) = response.get("resultGeometry").filter(|g| g.is_object()) {
        let feature = json!({
            "type": "Feature",
            "geometry": server_value_to_geojson(geometry),
            "properties": {},
        });
        response["resultGeometry"] = feature;
    }

    response
}
