//! JavaScript bindings.
//!
//! Exposes `SpatialAnalystService` to JS with the callback-and-chain calling
//! convention, plus a promise-returning `processAsync`.

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use serde::Serialize;
use serde_json::{json, Value};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use crate::console_warn;
use crate::error::{Result, ServiceError};
use crate::models::{DataFormat, ServiceResult};
use crate::operations::AnalysisKind;
use crate::options::ServiceOptions;
use crate::params::{normalize, AnalysisParams};
use crate::service::SpatialAnalystService;

/// Runs request tasks on the browser's microtask queue.
pub struct WasmSpawner;

impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> std::result::Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn read_params(params: JsValue) -> Result<Option<AnalysisParams>> {
    if params.is_null() || params.is_undefined() {
        return Ok(None);
    }
    let value: Value = serde_wasm_bindgen::from_value(params)
        .map_err(|e| ServiceError::InvalidParams(e.to_string()))?;
    AnalysisParams::from_value(value).map(Some)
}

fn read_format(result_format: Option<String>) -> Result<Option<DataFormat>> {
    result_format.map(|f| f.parse()).transpose()
}

// Shape of the object passed to JS callbacks
fn event(outcome: &Result<ServiceResult>) -> Value {
    match outcome {
        Ok(r) => json!({
            "type": "processCompleted",
            "kind": r.kind,
            "format": r.format,
            "result": r.result,
        }),
        Err(e) => json!({
            "type": "processFailed",
            "error": e.to_event_error(),
        }),
    }
}

// Failure reported when a completed result cannot be handed to JS,
// e.g. integers beyond 2^53
fn conversion_failure(reason: &str) -> Result<ServiceResult> {
    Err(ServiceError::Js(format!("could not convert analysis result: {}", reason)))
}

fn deliver(callback: &js_sys::Function, outcome: Result<ServiceResult>) {
    let payload = to_js(&event(&outcome))
        .or_else(|e| {
            console_warn!("Could not convert analysis result: {:?}", e);
            let reason = e.as_string().unwrap_or_else(|| format!("{:?}", e));
            to_js(&event(&conversion_failure(&reason)))
        })
        .unwrap_or_else(|e| e);
    if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
        console_warn!("Analysis callback threw: {:?}", e);
    }
}

#[wasm_bindgen(js_name = SpatialAnalystService)]
#[derive(Clone)]
pub struct JsSpatialAnalystService {
    inner: SpatialAnalystService,
}

#[wasm_bindgen(js_class = SpatialAnalystService)]
impl JsSpatialAnalystService {
    #[wasm_bindgen(constructor)]
    pub fn new(url: &str, options: JsValue) -> std::result::Result<JsSpatialAnalystService, JsValue> {
        let options: ServiceOptions = if options.is_null() || options.is_undefined() {
            ServiceOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let inner = SpatialAnalystService::new(url, options, Rc::new(WasmSpawner))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(JsSpatialAnalystService { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn url(&self) -> String {
        self.inner.url().to_string()
    }

    /// Run the analysis named `analysis` (e.g. `"buffer"`) and resolve with its result.
    #[wasm_bindgen(js_name = processAsync)]
    pub fn process_async(
        &self,
        analysis: &str,
        params: JsValue,
        result_format: Option<String>,
    ) -> js_sys::Promise {
        let inner = self.inner.clone();
        let prepared = analysis
            .parse::<AnalysisKind>()
            .and_then(|kind| Ok((kind, read_params(params)?, read_format(result_format)?)));

        wasm_bindgen_futures::future_to_promise(async move {
            let (kind, params, format) = prepared.map_err(|e| JsValue::from_str(&e.to_string()))?;
            let result = inner
                .process(kind, params.as_ref(), format)
                .await
                .map_err(|e| JsValue::from_str(&e.to_string()))?;
            to_js(&result)
        })
    }
}

impl JsSpatialAnalystService {
    fn run(
        &self,
        kind: AnalysisKind,
        params: JsValue,
        callback: js_sys::Function,
        result_format: Option<String>,
    ) -> JsSpatialAnalystService {
        match read_params(params).and_then(|p| Ok((p, read_format(result_format)?))) {
            Ok((params, format)) => {
                self.inner
                    .submit(kind, params, move |outcome| deliver(&callback, outcome), format);
            }
            // Reported asynchronously like any other failure
            Err(e) => wasm_bindgen_futures::spawn_local(async move { deliver(&callback, Err(e)) }),
        }
        self.clone()
    }
}

macro_rules! js_operations {
    ($($(#[$doc:meta])* $method:ident ($js:literal) => $kind:ident;)*) => {
        #[wasm_bindgen(js_class = SpatialAnalystService)]
        impl JsSpatialAnalystService {
            $(
                $(#[$doc])*
                #[wasm_bindgen(js_name = $js)]
                pub fn $method(
                    &self,
                    params: JsValue,
                    callback: js_sys::Function,
                    result_format: Option<String>,
                ) -> JsSpatialAnalystService {
                    self.run(AnalysisKind::$kind, params, callback, result_format)
                }
            )*
        }
    };
}

js_operations! {
    get_area_solar_radiation_result("getAreaSolarRadiationResult") => AreaSolarRadiation;
    buffer_analysis("bufferAnalysis") => Buffer;
    density_analysis("densityAnalysis") => Density;
    generate_spatial_data("generateSpatialData") => GenerateSpatialData;
    geo_relation_analysis("geoRelationAnalysis") => GeoRelation;
    interpolation_analysis("interpolationAnalysis") => Interpolation;
    math_expression_analysis("mathExpressionAnalysis") => MathExpression;
    overlay_analysis("overlayAnalysis") => Overlay;
    route_calculate_measure("routeCalculateMeasure") => RouteCalculateMeasure;
    route_locate("routeLocate") => RouteLocator;
    surface_analysis("surfaceAnalysis") => Surface;
    terrain_curvature_calculate("terrainCurvatureCalculate") => TerrainCurvature;
    thiessen_analysis("thiessenAnalysis") => Thiessen;
}

/// Normalize a parameter object the way requests do, without sending anything.
#[wasm_bindgen(js_name = normalizeParams)]
pub fn normalize_params(params: JsValue) -> std::result::Result<JsValue, JsValue> {
    let params = read_params(params).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&normalize(params.as_ref()).to_value())
}
