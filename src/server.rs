use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app::transform_use_case::UploadedFile;
use crate::pipeline::orchestrator::{PipelineRunReport, SharedPipeline};

/// One vendor document in an upload request.
#[derive(Debug, Deserialize)]
pub struct UploadedDocument {
    pub filename: String,
    pub content: Value,
}

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub files: Vec<UploadedDocument>,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: PipelineRunReport,
}

async fn home() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Welcome to Data Transformation API" }))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "solar-telemetry",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics() -> impl IntoResponse {
    crate::metrics::render()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Upload → transform → clean → store.
async fn transform(
    Extension(pipeline): Extension<SharedPipeline>,
    Json(request): Json<TransformRequest>,
) -> Response {
    let mut files = Vec::with_capacity(request.files.len());
    for doc in request.files {
        match serde_json::to_vec(&doc.content) {
            Ok(bytes) => files.push(UploadedFile::new(doc.filename, bytes)),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    match pipeline.run(&files).await {
        Ok(report) => Json(TransformResponse {
            message: "Transformation completed",
            report,
        })
        .into_response(),
        Err(e) => {
            error!("Pipeline run failed: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
        }
    }
}

/// Create the HTTP router with all routes.
pub fn create_server(pipeline: SharedPipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/transform", post(transform))
        .layer(Extension(pipeline))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
}

pub async fn serve(addr: SocketAddr, router: Router) -> anyhow::Result<()> {
    info!("🌐 Listening on http://{}", addr);
    Server::bind(&addr).serve(router.into_make_service()).await?;
    Ok(())
}
