//! HTTP API for the vote node.
//!
//! Every request is one page render: the session is opened from the query
//! attributes (`locked`, `numvotes`) and the requested directive runs against
//! it. The host proxy authenticates viewers and forwards their identity in
//! the `X-Vote-User` and `X-Vote-Groups` headers.

use crate::error::{Error, Result};
use crate::node::VoteState;
use bucketvote_core::{
    parse_form, AdminSummary, DirectiveAttributes, PageVoting, StartFragment, SubmitControl,
    Viewer, VoteDirectives, VoteField,
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Form, Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<VoteState>;

/// Header carrying the viewer's user id (absent or invalid means anonymous).
pub const USER_HEADER: &str = "x-vote-user";

/// Header carrying the viewer's groups, comma-separated.
pub const GROUPS_HEADER: &str = "x-vote-groups";

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/sessions/:session_key", post(submit))
        .route("/api/v1/sessions/:session_key/items/:item_key", get(get_vote))
        .route("/api/v1/sessions/:session_key/end", get(end_session))
        .route("/api/v1/sessions/:session_key/summary", get(get_summary))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Identify the viewer from proxy headers.
pub fn viewer_from_headers(headers: &HeaderMap) -> Viewer {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    let groups = headers
        .get(GROUPS_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Viewer::new(user_id, groups)
}

fn attributes(query: HashMap<String, String>) -> DirectiveAttributes {
    query.into_iter().collect()
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

// --- Session endpoints ---

async fn submit(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Json<StartFragment>> {
    let viewer = viewer_from_headers(&headers);
    let mut page = PageVoting::new(
        &*state.storage,
        &state.config.admin_group,
        session_key,
        viewer,
    )
    .with_form(parse_form(fields));

    let fragment = page.vote_start(&attributes(query))?;
    Ok(Json(fragment))
}

async fn get_vote(
    State(state): State<AppState>,
    Path((session_key, item_key)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<VoteField>> {
    let viewer = viewer_from_headers(&headers);
    let mut page = PageVoting::new(
        &*state.storage,
        &state.config.admin_group,
        session_key,
        viewer,
    );

    page.vote_start(&attributes(query))?;
    let field = page.vote(&DirectiveAttributes::new().with("key", &item_key))?;
    Ok(Json(field))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Option<SubmitControl>>> {
    let viewer = viewer_from_headers(&headers);
    let mut page = PageVoting::new(
        &*state.storage,
        &state.config.admin_group,
        session_key,
        viewer,
    );

    let attrs = attributes(query);
    page.vote_start(&attrs)?;
    Ok(Json(page.vote_end(&attrs, "")?))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AdminSummary>> {
    let viewer = viewer_from_headers(&headers);
    let mut page = PageVoting::new(
        &*state.storage,
        &state.config.admin_group,
        session_key,
        viewer,
    );

    page.vote_start(&DirectiveAttributes::new())?;
    match page.vote_admin_summary()? {
        Some(summary) => Ok(Json(summary)),
        None => Err(Error::Vote(bucketvote_core::Error::Unauthorized(
            "the vote summary is only shown to admins".to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::VoteConfig;
    use crate::storage::Storage;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request, StatusCode};
    use bucketvote_core::form::item_field_name;
    use bucketvote_core::VoteStore;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(dir: &TempDir) -> AppState {
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        Arc::new(VoteState {
            storage,
            config: VoteConfig::default(),
        })
    }

    fn form_field(item_key: &str) -> String {
        item_field_name(item_key)
            .replace('+', "%2B")
            .replace('/', "%2F")
            .replace('=', "%3D")
    }

    fn summary_request(groups: &str) -> Request<Body> {
        Request::builder()
            .uri("/api/v1/sessions/pg1/summary")
            .header(USER_HEADER, "7")
            .header(GROUPS_HEADER, groups)
            .body(Body::empty())
            .unwrap()
    }

    fn vote_request(posted_key: &str) -> Request<Body> {
        let body = format!(
            "voteaction=vote&_votekey={posted_key}&{}=1&{}=3",
            form_field("A"),
            form_field("B")
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/sessions/pg1")
            .header("content-type", "application/x-www-form-urlencoded")
            .header(USER_HEADER, "7")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn summary_requires_admin_group() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state.storage.upsert(1, "pg1", "A", 10).unwrap();

        let response = build_router(Arc::clone(&state))
            .oneshot(summary_request("user"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = build_router(state)
            .oneshot(summary_request("user,sysop"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn posted_form_applies_votes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let response = build_router(Arc::clone(&state))
            .oneshot(vote_request("pg1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let fragment: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fragment["notice"], serde_json::Value::Null);

        assert_eq!(state.storage.current_vote(7, "pg1", "A").unwrap(), 2);
        assert_eq!(state.storage.current_vote(7, "pg1", "B").unwrap(), 7);
    }

    #[tokio::test]
    async fn form_for_another_session_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let response = build_router(Arc::clone(&state))
            .oneshot(vote_request("pg2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.storage.records_for_user(7, "pg1").unwrap().is_empty());
    }

    #[test]
    fn viewer_from_proxy_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("42"));
        headers.insert(GROUPS_HEADER, HeaderValue::from_static("user, sysop,,"));

        let viewer = viewer_from_headers(&headers);
        assert_eq!(viewer.user_id, 42);
        assert_eq!(viewer.groups, vec!["user".to_string(), "sysop".to_string()]);
    }

    #[test]
    fn missing_or_bad_user_is_anonymous() {
        assert!(!viewer_from_headers(&HeaderMap::new()).is_authenticated());

        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("admin"));
        assert!(!viewer_from_headers(&headers).is_authenticated());
    }

    #[test]
    fn query_becomes_attributes() {
        let query: HashMap<String, String> = [("numvotes".to_string(), "5".to_string())]
            .into_iter()
            .collect();
        assert_eq!(attributes(query).get("numvotes"), Some("5"));
    }
}
