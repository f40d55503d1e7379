//! Transport-agnostic request dispatch.
//!
//! A dashboard backend (or any other transport) deserializes an
//! [`ApiRequest`], hands it to [`Api::handle`] together with the caller's
//! token, and serializes the [`ApiResponse`] it gets back. Every call is
//! authorized on its own; there is no session.

use crate::docker::ExecRequest;
use crate::engine::Engine;
use crate::error::{Error, ErrorKind, Result};
use crate::repair::FixKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// One engine operation with its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    ListServices,
    GetService {
        name: String,
    },
    Start {
        name: String,
    },
    Stop {
        name: String,
    },
    Restart {
        name: String,
    },
    Enable {
        name: String,
    },
    Disable {
        name: String,
    },
    Delete {
        name: String,
        #[serde(default)]
        force: bool,
    },
    CreateFromDefinition {
        name: String,
        yaml: String,
    },
    CreateFromArchive {
        name: String,
        archive: Vec<u8>,
    },
    Logs {
        name: String,
        #[serde(default)]
        tail: Option<usize>,
    },
    ValidateData,
    ValidateServices,
    Fix {
        #[serde(alias = "type")]
        kind: String,
        #[serde(default)]
        auto_execute: bool,
    },
    Health,
    Exec {
        name: String,
        #[serde(flatten)]
        request: ExecRequest,
    },
    AuthValidate,
}

impl ApiRequest {
    /// Short operation name for logging.
    pub fn op(&self) -> &'static str {
        match self {
            ApiRequest::ListServices => "list_services",
            ApiRequest::GetService { .. } => "get_service",
            ApiRequest::Start { .. } => "start",
            ApiRequest::Stop { .. } => "stop",
            ApiRequest::Restart { .. } => "restart",
            ApiRequest::Enable { .. } => "enable",
            ApiRequest::Disable { .. } => "disable",
            ApiRequest::Delete { .. } => "delete",
            ApiRequest::CreateFromDefinition { .. } => "create_from_definition",
            ApiRequest::CreateFromArchive { .. } => "create_from_archive",
            ApiRequest::Logs { .. } => "logs",
            ApiRequest::ValidateData => "validate_data",
            ApiRequest::ValidateServices => "validate_services",
            ApiRequest::Fix { .. } => "fix",
            ApiRequest::Health => "health",
            ApiRequest::Exec { .. } => "exec",
            ApiRequest::AuthValidate => "auth_validate",
        }
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    fn ack(message: impl Into<String>) -> Self {
        Self::ok(json!({ "success": true, "message": message.into() }))
    }

    pub fn from_error(err: &Error) -> Self {
        let kind = err.kind();
        let mut body = json!({
            "success": false,
            "error": kind.code(),
            "message": err.to_string(),
        });
        if let Some(hint) = err.suggestion() {
            body["hint"] = Value::String(hint);
        }
        Self {
            status: kind.http_status(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Token check applied to every call.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    tokens: Vec<String>,
}

impl Authorizer {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
        }
    }

    /// With no tokens configured every caller is accepted.
    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn authorize(&self, token: Option<&str>) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        match token {
            None | Some("") => Err(Error::Unauthorized("no token provided".to_string())),
            Some(t) if self.tokens.iter().any(|known| known == t) => Ok(()),
            Some(_) => Err(Error::Unauthorized("token is not valid".to_string())),
        }
    }
}

pub struct Api {
    engine: Arc<Engine>,
    auth: Authorizer,
}

impl Api {
    pub fn new(engine: Arc<Engine>, auth: Authorizer) -> Self {
        Self { engine, auth }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Authorize and run one request. Never fails; errors become responses.
    pub async fn handle(&self, token: Option<&str>, request: ApiRequest) -> ApiResponse {
        let op = request.op();
        if let Err(e) = self.auth.authorize(token) {
            debug!("Rejected {} call: {}", op, e);
            if matches!(request, ApiRequest::AuthValidate) {
                return ApiResponse {
                    status: ErrorKind::Unauthorized.http_status(),
                    body: json!({ "authenticated": false, "message": e.to_string() }),
                };
            }
            return ApiResponse::from_error(&e);
        }

        match self.dispatch(request).await {
            Ok(response) => {
                debug!("{} -> {}", op, response.status);
                response
            }
            Err(e) => {
                debug!("{} failed: {}", op, e);
                ApiResponse::from_error(&e)
            }
        }
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let engine = &self.engine;
        let response = match request {
            ApiRequest::ListServices => ApiResponse::ok(serde_json::to_value(engine.list().await?)?),
            ApiRequest::GetService { name } => {
                ApiResponse::ok(serde_json::to_value(engine.get(&name).await?)?)
            }
            ApiRequest::Start { name } => {
                engine.start(&name).await?;
                ApiResponse::ack(format!("Service '{}' started", name))
            }
            ApiRequest::Stop { name } => {
                engine.stop(&name).await?;
                ApiResponse::ack(format!("Service '{}' stopped", name))
            }
            ApiRequest::Restart { name } => {
                engine.restart(&name).await?;
                ApiResponse::ack(format!("Service '{}' restarted", name))
            }
            ApiRequest::Enable { name } => {
                engine.set_enabled(&name, true).await?;
                ApiResponse::ack(format!("Service '{}' enabled", name))
            }
            ApiRequest::Disable { name } => {
                engine.set_enabled(&name, false).await?;
                ApiResponse::ack(format!("Service '{}' disabled", name))
            }
            ApiRequest::Delete { name, force } => {
                engine.delete(&name, force).await?;
                ApiResponse::ack(format!("Service '{}' deleted", name))
            }
            ApiRequest::CreateFromDefinition { name, yaml } => {
                let record = engine.create_from_definition(&name, &yaml).await?;
                ApiResponse::created(serde_json::to_value(record)?)
            }
            ApiRequest::CreateFromArchive { name, archive } => {
                let record = engine.create_from_archive(&name, archive).await?;
                ApiResponse::created(serde_json::to_value(record)?)
            }
            ApiRequest::Logs { name, tail } => {
                ApiResponse::ok(serde_json::to_value(engine.logs(&name, tail).await?)?)
            }
            ApiRequest::ValidateData => {
                ApiResponse::ok(serde_json::to_value(engine.validate_data().await?)?)
            }
            ApiRequest::ValidateServices => {
                ApiResponse::ok(serde_json::to_value(engine.validate_services().await?)?)
            }
            ApiRequest::Fix { kind, auto_execute } => {
                let kind: FixKind = kind.parse()?;
                let report = engine.fix(kind, auto_execute).await?;
                let status = if report.has_failures() {
                    ErrorKind::PartialFailure.http_status()
                } else {
                    200
                };
                ApiResponse {
                    status,
                    body: serde_json::to_value(report)?,
                }
            }
            ApiRequest::Health => ApiResponse::ok(serde_json::to_value(engine.health().await?)?),
            ApiRequest::Exec { name, request } => {
                ApiResponse::ok(serde_json::to_value(engine.exec(&name, &request).await?)?)
            }
            ApiRequest::AuthValidate => ApiResponse::ok(json!({
                "authenticated": true,
                "message": if self.auth.is_open() {
                    "authentication is disabled"
                } else {
                    "token is valid"
                },
            })),
        };
        Ok(response)
    }
}
