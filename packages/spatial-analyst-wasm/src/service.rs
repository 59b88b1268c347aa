//! The spatial analyst façade.
//!
//! `SpatialAnalystService` holds the service root URL and options and sends
//! one request per call. Results come back either from the `process`
//! future or through a one-shot callback handed to the named operations,
//! which return the service so calls can be chained.

use futures::task::{LocalSpawn, LocalSpawnExt};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

use crate::error::{Result, ServiceError};
use crate::geometry::result_to_geojson;
use crate::models::{DataFormat, ServiceResult};
use crate::operations::AnalysisKind;
use crate::options::ServiceOptions;
use crate::params::{normalize, AnalysisParams, NormalizedParams};
use crate::transport::{self, Transport};
use crate::{console_log, console_warn};

/// Completion callback that runs at most once.
struct Continuation<F>(Rc<RefCell<Option<F>>>);

impl<F> Clone for Continuation<F> {
    fn clone(&self) -> Self {
        Continuation(Rc::clone(&self.0))
    }
}

impl<F: FnOnce(Result<ServiceResult>)> Continuation<F> {
    fn new(callback: F) -> Self {
        Continuation(Rc::new(RefCell::new(Some(callback))))
    }

    // Later resolutions are ignored
    fn resolve(&self, outcome: Result<ServiceResult>) {
        let callback = self.0.borrow_mut().take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}

#[derive(Clone)]
pub struct SpatialAnalystService {
    url: String,
    options: ServiceOptions,
    transport: Rc<dyn Transport>,
    spawner: Rc<dyn LocalSpawn>,
}

impl SpatialAnalystService {
    /// Create a service for `url`, e.g.
    /// `http://localhost:8090/iserver/services/spatialanalyst-sample/restjsr/spatialanalyst`.
    ///
    /// With the default HTTP transport on native targets, `spawner` must run
    /// its tasks inside a tokio runtime. Use [`from_parts`](Self::from_parts)
    /// to supply a different transport.
    pub fn new(
        url: impl Into<String>,
        options: ServiceOptions,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Result<Self> {
        let transport = transport::from_options(&options)?;
        Ok(Self::from_parts(url, options, transport, spawner))
    }

    pub fn from_parts(
        url: impl Into<String>,
        options: ServiceOptions,
        transport: Rc<dyn Transport>,
        spawner: Rc<dyn LocalSpawn>,
    ) -> Self {
        Self {
            url: url.into(),
            options,
            transport,
            spawner,
        }
    }

    pub fn with_transport(mut self, transport: Rc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Full request URL for `kind` with the given body.
    pub fn request_url(&self, kind: AnalysisKind, params: &NormalizedParams) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.url).map_err(|e| {
            ServiceError::InvalidParams(format!("invalid service url '{}': {}", self.url, e))
        })?;

        let path = format!(
            "{}/{}.json",
            url.path().trim_end_matches('/'),
            kind.endpoint(params)
        );
        url.set_path(&path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("returnContent", "true");
            if let Some(token) = &self.options.token {
                query.append_pair(self.options.server_type.credential_key(), token);
            }
        }
        Ok(url.to_string())
    }

    /// Run one analysis and wait for its outcome.
    pub async fn process(
        &self,
        kind: AnalysisKind,
        params: Option<&AnalysisParams>,
        result_format: Option<DataFormat>,
    ) -> Result<ServiceResult> {
        let format = DataFormat::resolve(result_format);
        let body = normalize(params);
        self.dispatch(kind, &body, format).await
    }

    async fn dispatch(
        &self,
        kind: AnalysisKind,
        body: &NormalizedParams,
        format: DataFormat,
    ) -> Result<ServiceResult> {
        let request_id = Uuid::new_v4();
        let url = self.request_url(kind, body)?;
        console_log!(
            "[{}] {} request to {} ({:?}, {})",
            request_id,
            kind,
            url,
            self.options.server_type,
            format
        );

        let payload = body.to_value();
        let outcome = self
            .transport
            .post_json(&url, &payload)
            .await
            .and_then(|response| interpret(kind, format, response));

        match &outcome {
            Ok(_) => console_log!("[{}] {} completed", request_id, kind),
            Err(e) => console_warn!("[{}] {} failed: {}", request_id, kind, e),
        }
        outcome
    }

    /// Start an analysis and hand its outcome to `callback` exactly once.
    pub fn submit<F>(
        &self,
        kind: AnalysisKind,
        params: Option<AnalysisParams>,
        callback: F,
        result_format: Option<DataFormat>,
    ) -> &Self
    where
        F: FnOnce(Result<ServiceResult>) + 'static,
    {
        let continuation = Continuation::new(callback);
        let pending = continuation.clone();
        let service = self.clone();

        let task = async move {
            let outcome = service.process(kind, params.as_ref(), result_format).await;
            pending.resolve(outcome);
        };

        if self.spawner.spawn_local(task).is_err() {
            continuation.resolve(Err(ServiceError::Spawn));
        }
        self
    }
}

fn interpret(kind: AnalysisKind, format: DataFormat, response: Value) -> Result<ServiceResult> {
    if ServiceError::is_server_failure(&response) {
        return Err(ServiceError::from_server_response(response));
    }

    let result = match format {
        DataFormat::GeoJson => result_to_geojson(response),
        DataFormat::IServer => response,
    };
    Ok(ServiceResult {
        kind,
        format,
        result,
    })
}

macro_rules! analysis_operations {
    ($($(#[$doc:meta])* $method:ident => $kind:ident;)*) => {
        impl SpatialAnalystService {
            $(
                $(#[$doc])*
                pub fn $method<F>(
                    &self,
                    params: Option<AnalysisParams>,
                    callback: F,
                    result_format: Option<DataFormat>,
                ) -> &Self
                where
                    F: FnOnce(Result<ServiceResult>) + 'static,
                {
                    self.submit(AnalysisKind::$kind, params, callback, result_format)
                }
            )*
        }
    };
}

analysis_operations! {
    /// Area solar radiation.
    get_area_solar_radiation_result => AreaSolarRadiation;
    /// Buffer analysis on a dataset or on `sourceGeometry`.
    buffer_analysis => Buffer;
    /// Kernel density analysis.
    density_analysis => Density;
    /// Dynamic segmentation.
    generate_spatial_data => GenerateSpatialData;
    geo_relation_analysis => GeoRelation;
    /// Interpolation; `interpolationType` picks the method.
    interpolation_analysis => Interpolation;
    /// Raster algebra.
    math_expression_analysis => MathExpression;
    overlay_analysis => Overlay;
    route_calculate_measure => RouteCalculateMeasure;
    route_locate => RouteLocator;
    /// Isolines or isoregions, per `surfaceAnalystMethod`.
    surface_analysis => Surface;
    terrain_curvature_calculate => TerrainCurvature;
    /// Thiessen polygons from a dataset or from `points`.
    thiessen_analysis => Thiessen;
}
