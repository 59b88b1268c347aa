//! The analysis endpoints exposed by a spatial analyst service.
//!
//! Each kind resolves to a path below the service root. Kinds that accept
//! either a stored dataset or inline geometry pick the geometry endpoint
//! when the inline input is present.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;
use crate::params::NormalizedParams;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisKind {
    AreaSolarRadiation,
    Buffer,
    Density,
    GenerateSpatialData,
    GeoRelation,
    Interpolation,
    MathExpression,
    Overlay,
    RouteCalculateMeasure,
    RouteLocator,
    Surface,
    TerrainCurvature,
    Thiessen,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 13] = [
        AnalysisKind::AreaSolarRadiation,
        AnalysisKind::Buffer,
        AnalysisKind::Density,
        AnalysisKind::GenerateSpatialData,
        AnalysisKind::GeoRelation,
        AnalysisKind::Interpolation,
        AnalysisKind::MathExpression,
        AnalysisKind::Overlay,
        AnalysisKind::RouteCalculateMeasure,
        AnalysisKind::RouteLocator,
        AnalysisKind::Surface,
        AnalysisKind::TerrainCurvature,
        AnalysisKind::Thiessen,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisKind::AreaSolarRadiation => "areaSolarRadiation",
            AnalysisKind::Buffer => "buffer",
            AnalysisKind::Density => "density",
            AnalysisKind::GenerateSpatialData => "generateSpatialData",
            AnalysisKind::GeoRelation => "geoRelation",
            AnalysisKind::Interpolation => "interpolation",
            AnalysisKind::MathExpression => "mathExpression",
            AnalysisKind::Overlay => "overlay",
            AnalysisKind::RouteCalculateMeasure => "routeCalculateMeasure",
            AnalysisKind::RouteLocator => "routeLocator",
            AnalysisKind::Surface => "surface",
            AnalysisKind::TerrainCurvature => "terrainCurvature",
            AnalysisKind::Thiessen => "thiessen",
        }
    }

    /// Path of the endpoint below the service root, without the `.json` suffix.
    ///
    /// A missing dataset name leaves its path segment empty; the server's
    /// rejection then arrives on the failure path.
    pub fn endpoint(&self, params: &NormalizedParams) -> String {
        let dataset = |key: &str| params.str_field(key).unwrap_or_default().to_string();

        match self {
            AnalysisKind::AreaSolarRadiation => {
                format!("datasets/{}/solarradiation", dataset("dataset"))
            }
            AnalysisKind::Buffer => {
                if params.contains("sourceGeometry") {
                    "geometry/buffer".to_string()
                } else {
                    format!("datasets/{}/buffer", dataset("dataset"))
                }
            }
            AnalysisKind::Density => {
                format!("datasets/{}/densityanalyst/kernel", dataset("dataset"))
            }
            AnalysisKind::GenerateSpatialData => format!(
                "datasets/{}/linearreferencing/generatespatialdata",
                dataset("routeTable")
            ),
            AnalysisKind::GeoRelation => format!("datasets/{}/georelation", dataset("dataset")),
            AnalysisKind::Interpolation => {
                let method = interpolation_method(params);
                if params.contains("inputPoints") {
                    format!("geometry/interpolation/{}", method)
                } else {
                    format!("datasets/{}/interpolation/{}", dataset("dataset"), method)
                }
            }
            AnalysisKind::MathExpression => format!("datasets/{}/mathanalyst", dataset("dataset")),
            AnalysisKind::Overlay => {
                if params.contains("sourceGeometry") {
                    "geometry/overlay".to_string()
                } else {
                    format!("datasets/{}/overlay", dataset("sourceDataset"))
                }
            }
            AnalysisKind::RouteCalculateMeasure => "geometry/calculatemeasure".to_string(),
            AnalysisKind::RouteLocator => "geometry/routelocator".to_string(),
            AnalysisKind::Surface => {
                let method = surface_method(params);
                if params.contains("points") {
                    format!("geometry/{}", method)
                } else {
                    format!("datasets/{}/{}", dataset("dataset"), method)
                }
            }
            AnalysisKind::TerrainCurvature => format!(
                "datasets/{}/terraincalculation/curvature",
                dataset("dataset")
            ),
            AnalysisKind::Thiessen => {
                if params.contains("points") {
                    "geometry/thiessenpolygon".to_string()
                } else {
                    format!("datasets/{}/thiessenpolygon", dataset("dataset"))
                }
            }
        }
    }
}

fn interpolation_method(params: &NormalizedParams) -> String {
    match params.str_field("interpolationType").map(str::to_ascii_lowercase) {
        Some(m) if matches!(m.as_str(), "idw" | "density" | "kriging" | "rbf") => m,
        _ => "idw".to_string(),
    }
}

fn surface_method(params: &NormalizedParams) -> &'static str {
    match params.str_field("surfaceAnalystMethod") {
        Some(m) if m.eq_ignore_ascii_case("ISOREGION") => "isoregion",
        _ => "isoline",
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnalysisKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ServiceError::InvalidParams(format!("unknown analysis '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{normalize, AnalysisParams};
    use serde_json::json;

    fn endpoint(kind: AnalysisKind, params: serde_json::Value) -> String {
        let params = AnalysisParams::from_value(params).unwrap();
        kind.endpoint(&normalize(Some(&params)))
    }

    #[test]
    fn dataset_endpoints() {
        let p = json!({"dataset": "Road_L@Changchun"});
        assert_eq!(endpoint(AnalysisKind::Buffer, p.clone()), "datasets/Road_L@Changchun/buffer");
        assert_eq!(
            endpoint(AnalysisKind::Density, p.clone()),
            "datasets/Road_L@Changchun/densityanalyst/kernel"
        );
        assert_eq!(
            endpoint(AnalysisKind::TerrainCurvature, p.clone()),
            "datasets/Road_L@Changchun/terraincalculation/curvature"
        );
        assert_eq!(
            endpoint(AnalysisKind::AreaSolarRadiation, p),
            "datasets/Road_L@Changchun/solarradiation"
        );
        assert_eq!(
            endpoint(AnalysisKind::Overlay, json!({"sourceDataset": "Lake@World"})),
            "datasets/Lake@World/overlay"
        );
        assert_eq!(
            endpoint(AnalysisKind::GenerateSpatialData, json!({"routeTable": "RouteDT@Changchun"})),
            "datasets/RouteDT@Changchun/linearreferencing/generatespatialdata"
        );
    }

    #[test]
    fn geometry_endpoints() {
        let square = json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]});
        assert_eq!(endpoint(AnalysisKind::Buffer, json!({"sourceGeometry": square})), "geometry/buffer");
        assert_eq!(
            endpoint(AnalysisKind::Thiessen, json!({"points": [[0, 0], [1, 1]]})),
            "geometry/thiessenpolygon"
        );
        assert_eq!(endpoint(AnalysisKind::RouteLocator, json!({})), "geometry/routelocator");
        assert_eq!(endpoint(AnalysisKind::RouteCalculateMeasure, json!({})), "geometry/calculatemeasure");
    }

    #[test]
    fn interpolation_and_surface_methods() {
        assert_eq!(
            endpoint(AnalysisKind::Interpolation, json!({"dataset": "Temp@Interpolation", "interpolationType": "Kriging"})),
            "datasets/Temp@Interpolation/interpolation/kriging"
        );
        assert_eq!(
            endpoint(AnalysisKind::Interpolation, json!({"inputPoints": [[0, 0, 1]], "interpolationType": "bogus"})),
            "geometry/interpolation/idw"
        );
        assert_eq!(
            endpoint(AnalysisKind::Surface, json!({"dataset": "Temp", "surfaceAnalystMethod": "ISOREGION"})),
            "datasets/Temp/isoregion"
        );
        assert_eq!(endpoint(AnalysisKind::Surface, json!({"points": [[0, 0]]})), "geometry/isoline");
    }

    #[test]
    fn missing_dataset_leaves_segment_empty() {
        assert_eq!(endpoint(AnalysisKind::MathExpression, json!(null)), "datasets//mathanalyst");
    }

    #[test]
    fn kinds_parse_by_name() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.name().parse::<AnalysisKind>().unwrap(), kind);
        }
        assert!("unknown".parse::<AnalysisKind>().is_err());
    }
}
