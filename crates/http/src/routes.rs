//! Route table and request handlers (`spec.md` §4.E).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE,
};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cache::FileInfoSource;
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::warn;

use crate::range;
use crate::state::AppState;

/// Builds the router: `GET /` and `GET|HEAD /{msg_id}/{name}`.
pub fn router<S: FileInfoSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(root::<S>))
        .route("/{msg_id}/{name}", get(file_route::<S>))
        .with_state(state)
}

async fn root<S: FileInfoSource>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    Json(state.dispatcher.snapshot())
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404: Not Found").into_response()
}

fn range_not_satisfiable(size: u64) -> Response {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_RANGE, format!("bytes */{size}"))
        .body(Body::empty())
        .expect("static response is well-formed")
}

fn content_disposition(name: &str) -> String {
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC).to_string();
    format!("attachment; filename=\"{encoded}\"")
}

async fn file_route<S: FileInfoSource>(
    State(state): State<Arc<AppState<S>>>,
    method: Method,
    Path((msg_id, name)): Path<(i64, String)>,
    headers: HeaderMap,
) -> Response {
    let (client_id, transferrer) = state.dispatcher.select().await;

    let file = match state.resolver.get_file(msg_id, &name).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            transferrer.release_without_stream();
            warn!(msg_id, name, client_id, "file not found");
            return not_found();
        }
        Err(err) => {
            transferrer.release_without_stream();
            warn!(msg_id, name, client_id, error = %err, "upstream fetch failed");
            return not_found();
        }
    };

    let size = file.file_size;
    let requested = headers.get(RANGE).and_then(|v| v.to_str().ok());
    let byte_range = match range::parse(requested, size) {
        Ok(r) => r,
        Err(()) => {
            transferrer.release_without_stream();
            return range_not_satisfiable(size);
        }
    };

    let status =
        if byte_range.is_whole_file(size) { StatusCode::OK } else { StatusCode::PARTIAL_CONTENT };

    let builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, file.mime_type.clone())
        .header(
            CONTENT_RANGE,
            format!("bytes {}-{}/{}", byte_range.from, byte_range.until, size),
        )
        .header(CONTENT_LENGTH, byte_range.len().to_string())
        .header(CONTENT_DISPOSITION, content_disposition(&name))
        .header(ACCEPT_RANGES, "bytes");

    if method == Method::HEAD {
        transferrer.release_without_stream();
        return builder.body(Body::empty()).expect("static response is well-formed");
    }

    let stream = transferrer
        .download(file.location, file.dc_id, size, byte_range.from, byte_range.until, state.part_size)
        .boxed();
    builder.body(Body::from_stream(stream)).expect("streaming response is well-formed")
}
