use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::criteria::{build_predicate, CriteriaError, Predicate, RawCriteria};
use crate::models::{ErrorBody, FieldsResponse, FilterResponse, ListResponse};
use crate::stats::EligibilityResult;
use crate::store::{StoreError, StudentStore};

/// Maximum number of records returned by the list-all endpoint.
pub const LIST_LIMIT: usize = 10;

const FILTER_FAILED: &str = "Error filtering students";
const LIST_FAILED: &str = "Error fetching students";
const FIELDS_FAILED: &str = "Error testing fields";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StudentStore>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Validation(#[from] CriteriaError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

fn store_failure(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |source| AppError::Store { context, source }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            AppError::MalformedPayload(detail) => {
                (StatusCode::BAD_REQUEST, "Malformed payload", detail)
            }
            AppError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "Invalid filter criteria", err.to_string())
            }
            AppError::Store { context, source } => {
                error!("{context}: {source}");
                (StatusCode::INTERNAL_SERVER_ERROR, context, source.to_string())
            }
        };

        let body = ErrorBody {
            success: false,
            message: message.to_string(),
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let students = Router::new()
        .route("/all", get(list_all))
        .route("/filter-eligible", post(filter_eligible))
        .route("/test-fields", get(test_fields));

    Router::new()
        .route("/", get(root))
        .nest("/api/students", students)
        .with_state(state)
}

pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}

pub async fn serve(store: Arc<dyn StudentStore>, config: &Config) -> anyhow::Result<()> {
    let app = router(AppState { store })
        .layer(cors_layer(&config.cors_allowed_origins)?)
        .layer(TraceLayer::new_for_http());

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Server is running" }))
}

async fn list_all(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let store = &state.store;
    info!(
        database = store.database_name(),
        collection = store.collection_name(),
        "Fetching students"
    );

    let data = store
        .find(&Predicate::default(), Some(LIST_LIMIT))
        .await
        .map_err(store_failure(LIST_FAILED))?;
    debug!("Students found: {}", data.len());

    Ok(Json(ListResponse {
        success: true,
        count: data.len(),
        database: store.database_name().to_string(),
        collection: store.collection_name().to_string(),
        data,
    }))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Criteria from a request body. A body that is empty or not declared as
/// JSON carries no criteria and matches every student.
fn parse_criteria(headers: &HeaderMap, body: &[u8]) -> Result<RawCriteria, AppError> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RawCriteria::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))
}

async fn filter_eligible(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FilterResponse>, AppError> {
    let raw = parse_criteria(&headers, &body)?;
    info!(?raw, "Received filters");

    let criteria = raw.validate()?;
    let predicate = build_predicate(&criteria);
    info!(
        %predicate,
        database = state.store.database_name(),
        collection = state.store.collection_name(),
        "Filtering students"
    );

    let total_in_db = state
        .store
        .count_all()
        .await
        .map_err(store_failure(FILTER_FAILED))?;
    let eligible = state
        .store
        .find(&predicate, None)
        .await
        .map_err(store_failure(FILTER_FAILED))?;
    info!(total_in_db, eligible = eligible.len(), "Filter complete");

    Ok(Json(EligibilityResult::new(eligible, total_in_db).into_response()))
}

async fn test_fields(State(state): State<AppState>) -> Result<Response, AppError> {
    let store = &state.store;
    let total_students = store
        .count_all()
        .await
        .map_err(store_failure(FIELDS_FAILED))?;

    let Some(sample) = store
        .find_one()
        .await
        .map_err(store_failure(FIELDS_FAILED))?
    else {
        let body = json!({
            "success": false,
            "message": "No students found in collection",
            "database": store.database_name(),
            "modelCollection": store.collection_name(),
            "totalCount": total_students,
        });
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    };

    let fields = match serde_json::to_value(&sample) {
        Ok(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    Ok(Json(FieldsResponse {
        success: true,
        message: "Sample student data",
        database: store.database_name().to_string(),
        model_collection: store.collection_name().to_string(),
        total_students,
        fields,
        sample_data: sample,
    })
    .into_response())
}
