use crate::core::handler::{PatchHandler, PatchReply, PatchRequest, RequestMethod};
use crate::domain::model::{Ack, ErrorBody};
use crate::utils::error::{ErrorCategory, PatchError};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, RawQuery, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Serialize)]
struct HealthBody {
    ok: bool,
    store: &'static str,
}

/// `patch` 可以是任意大小的 JSON 物件，因此不套用 axum 預設的 body 上限
pub fn router(handler: PatchHandler) -> Router {
    Router::new()
        .route("/api/patch", any(patch_endpoint))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::new(handler))
}

async fn patch_endpoint(
    State(handler): State<Arc<PatchHandler>>,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let request = PatchRequest {
        method: RequestMethod::from_name(method.as_str()),
        query,
        body: body.to_vec(),
    };

    match handler.handle(request).await {
        Ok(PatchReply::Patch(view)) => json_response(StatusCode::OK, &view),
        Ok(PatchReply::Accepted) => json_response(StatusCode::OK, &Ack { ok: true }),
        Err(e) => error_response(e),
    }
}

async fn healthz(State(handler): State<Arc<PatchHandler>>) -> Response {
    let store = if handler.is_bound() {
        "configured"
    } else {
        "missing"
    };
    json_response(StatusCode::OK, &HealthBody { ok: true, store })
}

pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Method => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCategory::Configuration | ErrorCategory::Storage => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(e: PatchError) -> Response {
    if e.is_client_error() {
        tracing::debug!("Rejected request: {}", e);
    } else {
        tracing::error!("❌ {}", e);
    }

    let category = e.category();
    match category {
        // 儲存層失敗不轉成結構化 JSON
        ErrorCategory::Storage => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
        _ => json_response(status_for(category), &ErrorBody { error: e.to_string() }),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("❌ Failed to encode response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
