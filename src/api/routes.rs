//! JSON and SVG routes under `/api/v1`.
//!
//! Every JSON body uses the `{ "data": ..., "meta": ... }` envelope.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use super::state::AppState;
use crate::render::{chart, format::xml_escape, Chart, ChartKind};

/// Routes open to anyone who can reach the server.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Routes serving snapshot data; mounted behind the session guard.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/charts/{name}", get(chart_svg))
}

/// Body for API requests without a recognised session marker.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "data": null, "meta": meta(json!({ "error": "not authenticated" })) })),
    )
        .into_response()
}

fn meta(extra: Value) -> Value {
    let mut meta = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    });
    if let (Some(meta), Value::Object(extra)) = (meta.as_object_mut(), extra) {
        meta.extend(extra);
    }
    meta
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.current();
    Json(json!({
        "data": {
            "status": "ok",
            "upstream": state.api.base_url(),
            "loaded": snapshot.is_loaded(),
            "last_error": snapshot.error,
        },
        "meta": meta(json!({})),
    }))
}

async fn dashboard(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.current();
    Json(json!({
        "data": &*snapshot.data,
        "meta": meta(json!({
            "fetched_at": snapshot.fetched_at.map(|t| t.to_rfc3339()),
            "sequence": snapshot.sequence,
            "events": snapshot.events.len(),
            "error": snapshot.error,
            "unauthorized": snapshot.unauthorized,
        })),
    }))
}

/// Stand-in image for a chart with nothing to draw.
fn placeholder_svg(message: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"60\" viewBox=\"0 0 {w} 60\">\
         <text x=\"{x}\" y=\"30\" text-anchor=\"middle\" font-family=\"sans-serif\" fill=\"#6b7280\">{}</text></svg>",
        xml_escape(message),
        w = chart::WIDTH,
        x = chart::WIDTH / 2.0,
    )
}

async fn chart_svg(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let kind: ChartKind = match name.parse() {
        Ok(kind) => kind,
        Err(message) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "data": null, "meta": meta(json!({ "error": message })) })),
            )
                .into_response();
        }
    };
    let snapshot = state.current();
    let svg = match kind.render(&snapshot.data, Utc::now()) {
        Chart::Svg(svg) => svg,
        Chart::NoData(message) => placeholder_svg(message),
    };
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
}
