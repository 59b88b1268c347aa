//! Request transports.
//!
//! A transport POSTs one JSON body and yields the server's JSON reply.
//! Non-2xx replies are errors. iServer failure bodies sent with a 2xx
//! status come back as `Ok` and are recognized by the service.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::error::{Result, ServiceError};
use crate::options::{ServiceOptions, TransportKind};

pub trait Transport {
    fn post_json<'a>(&'a self, url: &'a str, body: &'a Value) -> LocalBoxFuture<'a, Result<Value>>;
}

/// Build the transport selected by `options`.
pub fn from_options(options: &ServiceOptions) -> Result<Rc<dyn Transport>> {
    Ok(match options.transport {
        TransportKind::Http => Rc::new(HttpTransport::new(options.headers.clone())?),
        TransportKind::JsHelper => Rc::new(JsHelperTransport::new(options.headers.clone())),
    })
}

/// HTTP client backed by `reqwest` (browser `fetch` on wasm32).
///
/// On native targets requests must be polled inside a tokio runtime; reqwest
/// panics when sending without one.
pub struct HttpTransport {
    client: reqwest::Client,
    headers: BTreeMap<String, String>,
}

impl HttpTransport {
    pub fn new(headers: BTreeMap<String, String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, headers })
    }

    async fn send(&self, url: &str, body: &Value) -> Result<Value> {
        let mut req = self.client.post(url).json(body);
        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        read_reply(status, url, &text)
    }
}

// Parse a reply body, turning non-2xx statuses into errors.
fn read_reply(status: StatusCode, url: &str, text: &str) -> Result<Value> {
    let parsed = serde_json::from_str::<Value>(text);
    if status.is_success() {
        return Ok(parsed?);
    }
    match parsed {
        Ok(body) if ServiceError::is_server_failure(&body) => Err(ServiceError::from_server_response(body)),
        _ => Err(ServiceError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        }),
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(&'a self, url: &'a str, body: &'a Value) -> LocalBoxFuture<'a, Result<Value>> {
        self.send(url, body).boxed_local()
    }
}

#[wasm_bindgen]
extern "C" {
    // Host-provided helper: postJson(url, body, headers) -> Promise<string | object>
    #[wasm_bindgen(js_namespace = wasmJsHelpers, js_name = postJson, catch)]
    fn js_post_json(url: &str, body: &str, headers: &str) -> std::result::Result<js_sys::Promise, JsValue>;
}

fn js_error(value: JsValue) -> ServiceError {
    ServiceError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

/// Sends requests through the page's `wasmJsHelpers.postJson`.
pub struct JsHelperTransport {
    headers: BTreeMap<String, String>,
}

impl JsHelperTransport {
    pub fn new(headers: BTreeMap<String, String>) -> Self {
        Self { headers }
    }

    async fn send(&self, url: &str, body: &Value) -> Result<Value> {
        let body = serde_json::to_string(body)?;
        let headers = serde_json::to_string(&self.headers)?;

        let promise = js_post_json(url, &body, &headers).map_err(js_error)?;
        let reply = JsFuture::from(promise).await.map_err(js_error)?;

        // The helper may resolve with raw text or an already parsed object
        let text = match reply.as_string() {
            Some(text) => text,
            None => js_sys::JSON::stringify(&reply)
                .map(String::from)
                .map_err(js_error)?,
        };
        Ok(serde_json::from_str(&text)?)
    }
}

impl Transport for JsHelperTransport {
    fn post_json<'a>(&'a self, url: &'a str, body: &'a Value) -> LocalBoxFuture<'a, Result<Value>> {
        self.send(url, body).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "http://localhost:8090/iserver/services/spatialanalyst/restjsr/spatialanalyst/geometry/buffer.json";

    #[test]
    fn success_reply_is_parsed() {
        let value = read_reply(StatusCode::OK, URL, r#"{"succeed": true}"#).unwrap();
        assert_eq!(value, json!({"succeed": true}));
        assert!(matches!(read_reply(StatusCode::OK, URL, "<html>"), Err(ServiceError::Json(_))));
    }

    #[test]
    fn error_status_with_json_body_is_an_error() {
        match read_reply(StatusCode::BAD_GATEWAY, URL, r#"{"message": "Bad gateway"}"#) {
            Err(ServiceError::Status { status, url }) => {
                assert_eq!(status, 502);
                assert_eq!(url, URL);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn error_status_with_server_error_body_keeps_details() {
        let body = r#"{"succeed": false, "error": {"code": 401, "errorMsg": "token expired"}}"#;
        match read_reply(StatusCode::UNAUTHORIZED, URL, body) {
            Err(ServiceError::Server { code, message, .. }) => {
                assert_eq!(code, 401);
                assert_eq!(message, "token expired");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn error_status_with_text_body_is_a_status_error() {
        let err = read_reply(StatusCode::INTERNAL_SERVER_ERROR, URL, "Internal Server Error").unwrap_err();
        assert_eq!(err.to_event_error()["code"], 500);
    }
}
