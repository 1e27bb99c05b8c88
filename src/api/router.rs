//! Request routing for the REST API
//!
//! Maps `(method, path, query, body)` onto engine calls and wraps the result
//! in an [`Envelope`]. Nothing here touches sockets, so the whole surface is
//! testable against an in-memory database.
//!
//! ## Routes (all under `/api`)
//! - `GET /health`
//! - `GET|POST /blueprints`, `GET|PUT|DELETE /blueprints/{id}`
//! - `GET|POST /contracts` (`?status=&blueprintId=`), `GET|DELETE /contracts/{id}`
//! - `PATCH /contracts/{id}/status`, `PATCH /contracts/{id}/values`
//! - `GET /contracts/{id}/audit-logs`

use chrono::Utc;
use hyper::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::envelope::Envelope;
use crate::domain::{
    BlueprintDraft, BlueprintId, BlueprintPatch, ContractDraft, ContractFilter, ContractStatus,
    ValidationError, ValueInput,
};
use crate::engine::{BlueprintService, ContractEngine, EngineError, EngineResult};
use crate::storage::Database;

/// Routed response: status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    fn data(status: StatusCode, data: impl Serialize) -> EngineResult<Self> {
        let data = serde_json::to_value(data).map_err(|e| EngineError::Internal(e.into()))?;
        Ok(Self {
            status,
            body: Envelope::ok(data).to_json(),
        })
    }

    fn error(err: &EngineError) -> Self {
        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: Envelope::from_error(err).to_json(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,

    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValuesRequest {
    values: Vec<ValueInput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContractQuery {
    status: Option<String>,
    blueprint_id: Option<String>,
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
}

/// Routes one request
pub fn route(
    db: &mut Database,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
) -> Reply {
    let Some(rest) = path.strip_prefix("/api") else {
        return route_not_found(method, path);
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (method, segments.as_slice()) {
        (&Method::GET, ["health"]) => {
            // Health is answered bare, outside the envelope
            return Reply {
                status: StatusCode::OK,
                body: json!({"status": "ok", "timestamp": Utc::now().to_rfc3339()}),
            };
        }

        (&Method::GET, ["blueprints"]) => BlueprintService::new(db)
            .list()
            .and_then(|list| Reply::data(StatusCode::OK, list)),
        (&Method::POST, ["blueprints"]) => parse_body::<BlueprintDraft>(body)
            .and_then(|draft| BlueprintService::new(db).create(draft))
            .and_then(|bp| Reply::data(StatusCode::CREATED, bp)),
        (&Method::GET, ["blueprints", id]) => BlueprintService::new(db)
            .get(id)
            .and_then(|bp| Reply::data(StatusCode::OK, bp)),
        (&Method::PUT, ["blueprints", id]) => parse_body::<BlueprintPatch>(body)
            .and_then(|patch| BlueprintService::new(db).update(id, patch))
            .and_then(|bp| Reply::data(StatusCode::OK, bp)),
        (&Method::DELETE, ["blueprints", id]) => BlueprintService::new(db)
            .delete(id)
            .and_then(|()| Reply::data(StatusCode::OK, Deleted { success: true })),

        (&Method::GET, ["contracts"]) => list_contracts(db, query),
        (&Method::POST, ["contracts"]) => parse_body::<ContractDraft>(body)
            .and_then(|draft| ContractEngine::new(db).create(draft))
            .and_then(|c| Reply::data(StatusCode::CREATED, c)),
        (&Method::GET, ["contracts", id]) => ContractEngine::new(db)
            .get(id)
            .and_then(|c| Reply::data(StatusCode::OK, c)),
        (&Method::DELETE, ["contracts", id]) => ContractEngine::new(db)
            .delete(id)
            .and_then(|()| Reply::data(StatusCode::OK, Deleted { success: true })),
        (&Method::PATCH, ["contracts", id, "status"]) => update_status(db, id, body),
        (&Method::PATCH, ["contracts", id, "values"]) => parse_body::<ValuesRequest>(body)
            .and_then(|req| ContractEngine::new(db).update_values(id, &req.values))
            .and_then(|c| Reply::data(StatusCode::OK, c)),
        (&Method::GET, ["contracts", id, "audit-logs"]) => ContractEngine::new(db)
            .audit_logs(id)
            .and_then(|logs| Reply::data(StatusCode::OK, logs)),

        _ => return route_not_found(method, path),
    };

    match result {
        Ok(reply) => reply,
        Err(err @ EngineError::Internal(_)) => {
            error!(method = %method, path = %path, error = %err, "Request failed");
            Reply::error(&err)
        }
        Err(err) => {
            debug!(method = %method, path = %path, error = %err, "Request rejected");
            Reply::error(&err)
        }
    }
}

fn route_not_found(method: &Method, path: &str) -> Reply {
    Reply {
        status: StatusCode::NOT_FOUND,
        body: Envelope::err(format!("Route {} {} not found", method, path), "ROUTE_NOT_FOUND")
            .to_json(),
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> EngineResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::Malformed(e.to_string()).into())
}

fn parse_status(raw: &str) -> EngineResult<ContractStatus> {
    raw.parse::<ContractStatus>()
        .map_err(|e| ValidationError::Malformed(e).into())
}

fn update_status(db: &mut Database, id: &str, body: &[u8]) -> EngineResult<Reply> {
    let req: StatusRequest = parse_body(body)?;
    let requested = parse_status(&req.status)?;

    let detail = ContractEngine::new(db).update_status(id, requested, req.reason)?;
    Reply::data(StatusCode::OK, detail)
}

fn list_contracts(db: &mut Database, query: Option<&str>) -> EngineResult<Reply> {
    let query: ContractQuery = match query {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| EngineError::from(ValidationError::Malformed(e.to_string())))?,
        None => ContractQuery::default(),
    };

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let blueprint_id = match query.blueprint_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => match raw.parse::<BlueprintId>() {
            Ok(id) => Some(id),
            // No blueprint can have a malformed ID, so nothing matches
            Err(_) => return Reply::data(StatusCode::OK, Vec::<Value>::new()),
        },
        None => None,
    };

    let filter = ContractFilter {
        status,
        blueprint_id,
    };
    let contracts = ContractEngine::new(db).list(&filter)?;
    Reply::data(StatusCode::OK, contracts)
}
