use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
// Error types shared by every request
pub mod error;
// Value types exchanged with the server
pub mod models;
// Service options
pub mod options;
// Geometry conversion between client, GeoJSON and server encodings
pub mod geometry;
// Request parameter normalization
pub mod params;
// Analysis endpoints
pub mod operations;
// Request transports
pub mod transport;
// The spatial analyst facade
pub mod service;
// JavaScript bindings
pub mod wasm_api;

pub use error::{Result, ServiceError};
pub use models::{Bounds, DataFormat, ServerGeometry, ServerGeometryType, ServerPoint, ServiceResult};
pub use operations::AnalysisKind;
pub use options::{ServerType, ServiceOptions, TransportKind};
pub use params::{normalize, AnalysisParams, NormalizedParams};
pub use service::SpatialAnalystService;
pub use transport::{HttpTransport, JsHelperTransport, Transport};

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => ($crate::console::warn(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("spatial analyst module initialized");
    });
}

/// Names of the analyses `processAsync` accepts.
#[wasm_bindgen(js_name = analysisKinds)]
pub fn analysis_kinds() -> js_sys::Array {
    AnalysisKind::ALL
        .iter()
        .map(|k| JsValue::from_str(k.name()))
        .collect()
}
