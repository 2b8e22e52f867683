//! HTTP API for health checks, status, and transaction submission

use crate::config::ApiConfig;
use crate::error::{RelayerError, RelayerResult};
use crate::facade::{OperationRequest, TransactionFacade};
use crate::node::SubmitResponse;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<TransactionFacade>,
    pub instance_id: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(facade: Arc<TransactionFacade>, instance_id: impl Into<String>) -> Self {
        Self {
            facade,
            instance_id: instance_id.into(),
            started_at: Utc::now(),
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/status", get(get_status))
        .route("/accounts/:address/sequence", get(get_sequence))
        .route("/transactions/:hash", get(get_transaction))
        .route("/transactions", post(submit_transaction))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> RelayerResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayerError::Internal(format!("API server failed: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check - the node must answer
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let node = state.facade.node_healthy().await;
    let status = if node {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready: node, node }))
}

/// Get relayer status
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = Utc::now() - state.started_at;

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id.clone(),
        started_at: state.started_at,
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        retry_budget: state.facade.retry_budget(),
    })
}

async fn get_sequence(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<SequenceResponse>, ApiError> {
    let sequence = state.facade.sequence(&address).await?;
    Ok(Json(SequenceResponse { address, sequence }))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    match state.facade.transaction(&hash).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Transaction {} not found", hash),
                retryable: false,
                engine_result: None,
                response: None,
            }),
        )
            .into_response()),
    }
}

async fn submit_transaction(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResult>, ApiError> {
    let hash = state
        .facade
        .submit_operation(&request.secret, &request.operation)
        .await?;

    Ok(Json(SubmitResult {
        hash,
        operation: request.operation.name().to_string(),
        account: request.operation.acting_account().to_string(),
    }))
}

/// Relayer error rendered as an HTTP response
struct ApiError(RelayerError);

impl From<RelayerError> for ApiError {
    fn from(e: RelayerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RelayerError::InvalidTransaction(_) => StatusCode::BAD_REQUEST,
            RelayerError::Rejected { .. } | RelayerError::RetriesExhausted { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RelayerError::Rpc { .. }
            | RelayerError::Node { .. }
            | RelayerError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let retryable = self.0.is_retryable();
        warn!(
            "Request failed with {} (retryable: {}): {}",
            status, retryable, self.0
        );

        let body = ErrorResponse {
            error: self.0.to_string(),
            retryable,
            engine_result: self.0.engine_result().map(str::to_string),
            response: self.0.last_response().cloned(),
        };
        (status, Json(body)).into_response()
    }
}

// Request and response types

#[derive(Deserialize)]
struct SubmitRequest {
    secret: String,
    #[serde(flatten)]
    operation: OperationRequest,
}

#[derive(Serialize, Deserialize)]
struct SubmitResult {
    hash: String,
    operation: String,
    account: String,
}

#[derive(Serialize, Deserialize)]
struct SequenceResponse {
    address: String,
    sequence: u32,
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
    /// A fresh call may succeed once the node is reachable again
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<SubmitResponse>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    node: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    instance_id: String,
    started_at: DateTime<Utc>,
    uptime_seconds: u64,
    retry_budget: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LedgerNode, MockLedgerNode, TransactionRecord};
    use crate::tx::test_support::{EchoSigner, ScriptedNode};
    use crate::tx::{
        InMemorySequenceCache, SequenceResolver, TransactionBuilder, TransactionSubmitter,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(node: Arc<dyn LedgerNode>) -> Router {
        let resolver = Arc::new(SequenceResolver::new(Arc::new(InMemorySequenceCache::new())));
        let submitter =
            TransactionSubmitter::new(node, Arc::new(EchoSigner::default()), resolver, 2);
        let facade = TransactionFacade::new(submitter, TransactionBuilder::new("SWT", 10));
        router(AppState::new(Arc::new(facade), "test"))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(Arc::new(ScriptedNode::new(&[1], &[]))), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_reflects_node_health() {
        let mut node = MockLedgerNode::new();
        node.expect_health_check().returning(|| false);

        let (status, body) = send(app(Arc::new(node)), get("/ready")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn test_get_sequence() {
        let node = Arc::new(ScriptedNode::new(&[42], &[]));
        let (status, body) = send(app(node), get("/accounts/jAlice/sequence")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "address": "jAlice", "sequence": 42 }));
    }

    #[tokio::test]
    async fn test_get_transaction() {
        let mut node = MockLedgerNode::new();
        node.expect_fetch_transaction().returning(|hash| {
            if hash == "ABCD" {
                Ok(Some(
                    serde_json::from_value::<TransactionRecord>(json!({
                        "hash": "ABCD",
                        "validated": true,
                        "ledger_index": 100,
                        "meta": { "TransactionResult": "tesSUCCESS" }
                    }))
                    .unwrap(),
                ))
            } else {
                Ok(None)
            }
        });
        let app = app(Arc::new(node));

        let (status, body) = send(app.clone(), get("/transactions/ABCD")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["validated"], true);

        let (status, _) = send(app, get("/transactions/FFFF")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_transfer() {
        let node = Arc::new(ScriptedNode::new(&[5], &["tesSUCCESS"]).with_hash("ABCD"));
        let (status, body) = send(
            app(node.clone()),
            post_json(
                "/transactions",
                json!({
                    "secret": "snoPBjXtMeMyMHUVTgbuqAfg1SUTb",
                    "operation": "transfer",
                    "account": "jAlice",
                    "to": "jBob",
                    "amount": "2.5",
                    "token": "SWT"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hash"], "ABCD");
        assert_eq!(body["account"], "jAlice");
        assert_eq!(node.submitted_blobs(), vec!["jAlice:Payment:5"]);
    }

    #[tokio::test]
    async fn test_invalid_request_is_bad_request() {
        let node = Arc::new(ScriptedNode::new(&[5], &[]));
        let (status, body) = send(
            app(node),
            post_json(
                "/transactions",
                json!({
                    "secret": "s",
                    "operation": "transfer",
                    "account": "jAlice",
                    "to": "jBob",
                    "amount": "lots",
                    "token": "SWT"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("lots"));
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_rejection_carries_engine_result() {
        let node = Arc::new(ScriptedNode::new(&[5], &["tecUNFUNDED_PAYMENT"]));
        let (status, body) = send(
            app(node),
            post_json(
                "/transactions",
                json!({
                    "secret": "s",
                    "operation": "cancel_order",
                    "account": "jAlice",
                    "offer_sequence": 3
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["engine_result"], "tecUNFUNDED_PAYMENT");
        assert_eq!(body["response"]["engine_result"], "tecUNFUNDED_PAYMENT");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_node_transport_error_is_bad_gateway() {
        let mut node = MockLedgerNode::new();
        node.expect_fetch_sequence().returning(|_| {
            Err(RelayerError::Rpc {
                method: "account_info".to_string(),
                message: "connection refused".to_string(),
            })
        });

        let (status, body) = send(app(Arc::new(node)), get("/accounts/jAlice/sequence")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["retryable"], true);
    }
}
