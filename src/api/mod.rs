//! Dashboard server -- axum routes, handlers, and middleware.

mod pages;
mod routes;
pub mod state;

use self::state::AppState;
use crate::session::{self, Access};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the application router: HTML pages behind the session guard, and
/// the JSON API under `/api/v1` with everything but health guarded too.
pub fn router(state: AppState) -> Router {
    let pages = pages::page_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));
    let mut api = routes::protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_session))
        .merge(routes::public_routes());
    if let Some(cors) = cors_layer(&state.config.dashboard.cors_origins) {
        api = api.layer(cors);
    }

    Router::new()
        .merge(pages)
        .nest("/api/v1", api)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins only. `None` keeps the API same-origin.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET])
            .allow_credentials(true),
    )
}

/// The request's `Cookie` header, owned so it can be held across awaits.
fn cookie_header(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Redirect page requests without an issued session marker to the login page.
async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let cookies = cookie_header(&request);
    let access = state.session.guard(&path, cookies.as_deref()).await;
    match access {
        Access::Allow => next.run(request).await,
        Access::Redirect(to) => Redirect::to(to).into_response(),
    }
}

/// Answer 401 to API requests without an issued session marker.
async fn require_api_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let cookies = cookie_header(&request);
    let allowed = match session::marker_from_cookies(cookies.as_deref()) {
        Some(marker) => state.session.is_issued(marker).await,
        None => false,
    };
    if allowed {
        next.run(request).await
    } else {
        routes::unauthorized()
    }
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
