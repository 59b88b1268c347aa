use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of server hosting the analysis service.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerType {
    #[default]
    IServer,
    IPortal,
    Online,
}

impl ServerType {
    /// Query parameter carrying the credential for this server type.
    pub fn credential_key(&self) -> &'static str {
        match self {
            ServerType::IServer | ServerType::IPortal => "token",
            ServerType::Online => "key",
        }
    }
}

/// How requests leave the module.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransportKind {
    #[default]
    Http,
    /// Delegate to the host page's `wasmJsHelpers.postJson`.
    JsHelper,
}

/// Options shared by every request a service issues.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOptions {
    pub server_type: ServerType,
    pub token: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub transport: TransportKind,
}

impl ServiceOptions {
    pub fn with_server_type(mut self, server_type: ServerType) -> Self {
        self.server_type = server_type;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
