//! HTML pages: dashboard, events and anomalies tables, query form, and the
//! login/registration forms.

use askama::Template;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{routing::get, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::state::AppState;
use crate::client::ApiError;
use crate::model::{Anomaly, Credentials, Event, QueryResult, Registration};
use crate::render::format::{format_count, format_summary};
use crate::render::ChartKind;
use crate::session::{marker_from_cookies, LOGIN_PATH, MARKER_COOKIE};

/// Rows shown on the anomalies page.
const ANOMALY_PAGE_SIZE: u32 = 50;

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/events", get(events))
        .route("/anomalies", get(anomalies))
        .route("/query", get(query_form).post(query_submit))
        .route("/login", get(login_form).post(login_submit))
        .route("/register", get(register_form).post(register_submit))
        .route("/logout", axum::routing::post(logout))
}

fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template rendering failed").into_response()
        }
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn score_label(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| "-".to_string())
}

/// Badge class by severity: red above 0.7, yellow above 0.4, green otherwise.
fn score_class(score: Option<f64>) -> &'static str {
    match score {
        Some(s) if s > 0.7 => "high",
        Some(s) if s > 0.4 => "medium",
        Some(_) => "low",
        None => "none",
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct ChartPanel {
    pub title: &'static str,
    pub slug: &'static str,
    pub html: String,
}

pub struct StatCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub user: Option<String>,
    pub loaded: bool,
    pub error: Option<String>,
    pub fetched_at: Option<String>,
    pub summary: String,
    pub stats: Vec<StatCard>,
    pub charts: Vec<ChartPanel>,
    pub refresh_secs: u64,
}

async fn dashboard(State(state): State<AppState>) -> Response {
    let snapshot = state.current();
    let user = state.session.user().await;
    if snapshot.unauthorized && user.is_none() {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let now = Utc::now();
    let data = &snapshot.data;
    let stats = vec![
        StatCard {
            label: "Total Events",
            value: format_count(data.stats.total_events),
        },
        StatCard {
            label: "Anomalies",
            value: format_count(data.stats.total_anomalies),
        },
        StatCard {
            label: "Unique IPs",
            value: format_count(data.stats.unique_ips),
        },
        StatCard {
            label: "Events / min",
            value: format!("{:.1}", data.stats.events_per_minute),
        },
    ];
    let charts = ChartKind::ALL
        .into_iter()
        .map(|kind| ChartPanel {
            title: kind.title(),
            slug: kind.slug(),
            html: kind.render(data, now).to_html(),
        })
        .collect();

    let page = DashboardPage {
        user: user.map(|u| u.username),
        loaded: snapshot.is_loaded(),
        error: snapshot.error.clone(),
        fetched_at: snapshot
            .fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        summary: format_summary(&data.stats),
        stats,
        charts,
        refresh_secs: state.config.dashboard.poll_interval().as_secs(),
    };
    render(StatusCode::OK, &page)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

pub struct EventRow {
    pub timestamp: String,
    pub src_ip: String,
    pub dest_ip: String,
    pub method: String,
    pub url: String,
    pub user_agent: String,
    pub username: String,
    pub status: String,
    pub bytes: String,
    pub raw_line: String,
    pub anomalies: Vec<String>,
}

impl EventRow {
    fn from_event(event: &Event) -> Self {
        Self {
            timestamp: event
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            src_ip: or_dash(event.src_ip.as_deref()),
            dest_ip: or_dash(event.dest_ip.as_deref()),
            method: or_dash(event.method.as_deref()),
            url: or_dash(event.url.as_deref()),
            user_agent: or_dash(event.user_agent.as_deref()),
            username: or_dash(event.username.as_deref()),
            status: event
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            bytes: event
                .bytes
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
            raw_line: or_dash(event.raw_line.as_deref()),
            anomalies: event
                .anomalies
                .iter()
                .map(|a| {
                    format!(
                        "{} ({})",
                        a.reason.as_deref().unwrap_or("anomaly"),
                        score_label(a.score)
                    )
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "events.html")]
pub struct EventsPage {
    pub user: Option<String>,
    pub error: Option<String>,
    pub rows: Vec<EventRow>,
}

async fn events(State(state): State<AppState>) -> Response {
    let snapshot = state.current();
    let page = EventsPage {
        user: state.session.user().await.map(|u| u.username),
        error: snapshot.error.clone(),
        rows: snapshot.events.iter().map(EventRow::from_event).collect(),
    };
    render(StatusCode::OK, &page)
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

pub struct AnomalyRow {
    pub event_id: String,
    pub detector: String,
    pub score: String,
    pub severity: &'static str,
    pub reason: String,
}

impl AnomalyRow {
    fn from_anomaly(anomaly: &Anomaly) -> Self {
        Self {
            event_id: anomaly
                .event_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
            detector: or_dash(anomaly.detector.as_deref()),
            score: score_label(anomaly.score),
            severity: score_class(anomaly.score),
            reason: or_dash(anomaly.reason.as_deref()),
        }
    }
}

#[derive(Template)]
#[template(path = "anomalies.html")]
pub struct AnomaliesPage {
    pub user: Option<String>,
    pub error: Option<String>,
    pub rows: Vec<AnomalyRow>,
}

async fn anomalies(State(state): State<AppState>) -> Response {
    let (rows, error) = match state.api.anomalies(1, ANOMALY_PAGE_SIZE).await {
        Ok(page) => (page.anomalies.iter().map(AnomalyRow::from_anomaly).collect(), None),
        Err(ApiError::Unauthorized) => {
            state.session.clear().await;
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Err(e) => {
            warn!(error = %e, "failed to load anomalies");
            (Vec::new(), Some(e.to_string()))
        }
    };
    let page = AnomaliesPage {
        user: state.session.user().await.map(|u| u.username),
        error,
        rows,
    };
    render(StatusCode::OK, &page)
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "query.html")]
pub struct QueryPage {
    pub user: Option<String>,
    pub prompt: String,
    pub error: Option<String>,
    pub sql: Option<String>,
    pub response: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryPage {
    fn empty(user: Option<String>) -> Self {
        Self {
            user,
            prompt: String::new(),
            error: None,
            sql: None,
            response: None,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn with_result(mut self, result: QueryResult) -> Self {
        self.columns = result
            .rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        self.rows = result
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| match row.get(col) {
                        None | Some(serde_json::Value::Null) => "-".to_string(),
                        Some(serde_json::Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        self.sql = Some(result.sql);
        self.response = result.response;
        self
    }
}

#[derive(Deserialize)]
pub struct QueryForm {
    prompt: String,
}

async fn query_form(State(state): State<AppState>) -> Response {
    let user = state.session.user().await.map(|u| u.username);
    render(StatusCode::OK, &QueryPage::empty(user))
}

async fn query_submit(State(state): State<AppState>, Form(form): Form<QueryForm>) -> Response {
    let user = state.session.user().await.map(|u| u.username);
    let mut page = QueryPage::empty(user);
    page.prompt = form.prompt.clone();
    if form.prompt.trim().is_empty() {
        page.error = Some("Enter a question to run.".to_string());
        return render(StatusCode::BAD_REQUEST, &page);
    }
    match state.api.query(&form.prompt).await {
        Ok(result) => render(StatusCode::OK, &page.with_result(result)),
        Err(ApiError::Unauthorized) => {
            state.session.clear().await;
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            warn!(error = %e, "query failed");
            page.error = Some(e.to_string());
            render(StatusCode::BAD_GATEWAY, &page)
        }
    }
}

// ---------------------------------------------------------------------------
// Login, registration, logout
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "login.html")]
pub struct AuthPage {
    pub register: bool,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    role: String,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn session_cookie(value: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        MARKER_COOKIE, value
    )
}

async fn login_form() -> Response {
    render(
        StatusCode::OK,
        &AuthPage {
            register: false,
            error: None,
        },
    )
}

async fn login_submit(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let credentials = Credentials {
        username: form.username.trim().to_string(),
        password: form.password,
    };
    let failure = |status: StatusCode, message: String| {
        render(
            status,
            &AuthPage {
                register: false,
                error: Some(message),
            },
        )
    };
    match state.session.login(&state.api, &credentials).await {
        Ok(user) => {
            info!(username = %user.username, "operator logged in");
            // The upstream token stays in the server's cookie jar; the browser
            // only gets a marker that passes the page guard.
            let marker = state.session.issue_marker().await;
            (
                [(header::SET_COOKIE, session_cookie(&marker))],
                Redirect::to("/"),
            )
                .into_response()
        }
        Err(ApiError::Unauthorized) => failure(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        ),
        Err(ApiError::Status { body, .. }) => failure(
            StatusCode::UNAUTHORIZED,
            upstream_detail(&body).unwrap_or_else(|| "Invalid username or password".to_string()),
        ),
        Err(e) => failure(StatusCode::BAD_GATEWAY, format!("Login failed: {}", e)),
    }
}

/// Pull FastAPI-style `{"detail": "..."}` out of an error body.
fn upstream_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

async fn register_form() -> Response {
    render(
        StatusCode::OK,
        &AuthPage {
            register: true,
            error: None,
        },
    )
}

async fn register_submit(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let registration = Registration {
        username: form.username.trim().to_string(),
        password: form.password,
        first_name: non_blank(form.first_name),
        last_name: non_blank(form.last_name),
        role: non_blank(form.role),
    };
    match state.api.register(&registration).await {
        Ok(user) => {
            info!(username = %user.username, "account registered");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            let message = match &e {
                ApiError::Status { body, .. } => upstream_detail(body),
                _ => None,
            }
            .unwrap_or_else(|| "Registration failed".to_string());
            warn!(error = %e, "registration failed");
            render(
                StatusCode::BAD_REQUEST,
                &AuthPage {
                    register: true,
                    error: Some(message),
                },
            )
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookies = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    if let Some(marker) = marker_from_cookies(cookies) {
        state.session.revoke_marker(marker).await;
    }
    state.session.logout(&state.api).await;
    (
        [(
            header::SET_COOKIE,
            format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", MARKER_COOKIE),
        )],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_row_fills_missing_fields_with_dash() {
        let row = EventRow::from_event(&Event {
            id: 1,
            method: Some("GET".into()),
            anomalies: vec![Anomaly {
                id: 9,
                reason: Some("burst".into()),
                score: Some(0.876),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert_eq!(row.method, "GET");
        assert_eq!(row.src_ip, "-");
        assert_eq!(row.status, "-");
        assert_eq!(row.anomalies, vec!["burst (0.88)".to_string()]);
    }

    #[test]
    fn test_score_severity() {
        assert_eq!(score_class(Some(0.9)), "high");
        assert_eq!(score_class(Some(0.5)), "medium");
        assert_eq!(score_class(Some(0.1)), "low");
        assert_eq!(score_class(None), "none");
    }

    #[test]
    fn test_upstream_detail() {
        assert_eq!(
            upstream_detail(r#"{"detail":"Username already registered"}"#).as_deref(),
            Some("Username already registered")
        );
        assert_eq!(upstream_detail("<html>"), None);
    }

    #[test]
    fn test_query_result_flattens_rows() {
        let result: QueryResult = serde_json::from_str(
            r#"{"sql":"SELECT 1","rows":[{"ip":"10.0.0.1","n":3,"x":null}],"response":"ok"}"#,
        )
        .unwrap();
        let page = QueryPage::empty(None).with_result(result);
        assert_eq!(page.sql.as_deref(), Some("SELECT 1"));
        assert_eq!(page.rows.len(), 1);
        let ip = page.columns.iter().position(|c| c == "ip").unwrap();
        let x = page.columns.iter().position(|c| c == "x").unwrap();
        assert_eq!(page.rows[0][ip], "10.0.0.1");
        assert_eq!(page.rows[0][x], "-");
    }
}
