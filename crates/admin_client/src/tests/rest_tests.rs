use super::*;
use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use list_state::{failure_message, FetchOutcome, FilterMap, ListInit, ListStatus};
use shared::{domain::StudentId, error::ApiError, protocol::StudentSummary};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{session::DEFAULT_REQUEST_TIMEOUT, views::student_list};

const TOKEN: &str = "tok-123";
const TOTAL_STUDENTS: u64 = 23;

#[derive(Clone, Default)]
struct ServerState {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
}

fn student(id: u64) -> StudentSummary {
    StudentSummary {
        student_id: StudentId(id as i64),
        name: format!("student-{id}"),
        email: format!("s{id}@college.test"),
        roll_number: Some(format!("R{id:03}")),
        hostel: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

async fn list_students(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.auth_headers.lock().await.push(auth.clone());
    state.queries.lock().await.push(query.clone());

    if auth.as_deref() != Some("Bearer tok-123") {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError::new(ErrorCode::Forbidden, "admins only")),
        )
            .into_response();
    }

    let page: u64 = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let limit: u64 = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(10);
    let start = (page - 1) * limit;
    let end = (start + limit).min(TOTAL_STUDENTS);
    let items: Vec<StudentSummary> = (start..end).map(student).collect();
    Json(PageResponse {
        items,
        total: TOTAL_STUDENTS,
    })
    .into_response()
}

async fn broken_staff() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn oversized_complaints() -> Response {
    Json(serde_json::json!({ "items": [1, 2, 3], "total": 3 })).into_response()
}

async fn spawn_admin_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/students", get(list_students))
        .route("/staff", get(broken_staff))
        .route("/complaints", get(oversized_complaints))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn request(page: u32, limit: u32) -> PageRequest {
    PageRequest {
        page,
        limit,
        sort_field: Some("name".to_string()),
        sort_direction: Some(list_state::SortDirection::Desc),
        filters: vec![("hostel".to_string(), "north".to_string())],
    }
}

#[tokio::test]
async fn sends_paging_sort_filters_and_bearer_token() {
    let (server_url, state) = spawn_admin_server().await.expect("spawn server");
    let session = Arc::new(
        AdminSession::with_token(&server_url, DEFAULT_REQUEST_TIMEOUT, TOKEN).expect("session"),
    );
    let fetcher = RestPageFetcher::<StudentSummary>::new(session, Resource::Students);

    let page = fetcher.fetch_page(request(3, 10)).await.expect("page");
    assert_eq!(page.total, TOTAL_STUDENTS);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.items[0].student_id, StudentId(20));

    let queries = state.queries.lock().await;
    let query = &queries[0];
    assert_eq!(query.get("page").map(String::as_str), Some("3"));
    assert_eq!(query.get("limit").map(String::as_str), Some("10"));
    assert_eq!(query.get("sortField").map(String::as_str), Some("name"));
    assert_eq!(query.get("sortDirection").map(String::as_str), Some("desc"));
    assert_eq!(query.get("hostel").map(String::as_str), Some("north"));
    assert_eq!(
        state.auth_headers.lock().await[0].as_deref(),
        Some("Bearer tok-123")
    );
}

#[tokio::test]
async fn structured_api_errors_surface_their_message() {
    let (server_url, _state) = spawn_admin_server().await.expect("spawn server");
    let session =
        Arc::new(AdminSession::new(&server_url, DEFAULT_REQUEST_TIMEOUT).expect("session"));
    let fetcher = RestPageFetcher::<StudentSummary>::new(session, Resource::Students);

    let err = fetcher
        .fetch_page(request(1, 10))
        .await
        .expect_err("unauthenticated request must fail");
    let api = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(api.code, ErrorCode::Forbidden);
    assert_eq!(failure_message(&err), "admins only");
}

#[tokio::test]
async fn unstructured_error_bodies_report_http_status() {
    let (server_url, _state) = spawn_admin_server().await.expect("spawn server");
    let session = Arc::new(
        AdminSession::with_token(&server_url, DEFAULT_REQUEST_TIMEOUT, TOKEN).expect("session"),
    );
    let fetcher = RestPageFetcher::<StudentSummary>::new(session, Resource::Staff);

    let err = fetcher.fetch_page(request(1, 10)).await.expect_err("500");
    assert_eq!(failure_message(&err), "HTTP 500 Internal Server Error");
    let api = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(api.code, ErrorCode::Internal);
}

#[tokio::test]
async fn pages_larger_than_the_limit_are_rejected() {
    let (server_url, _state) = spawn_admin_server().await.expect("spawn server");
    let session = Arc::new(
        AdminSession::with_token(&server_url, DEFAULT_REQUEST_TIMEOUT, TOKEN).expect("session"),
    );
    let fetcher = RestPageFetcher::<u32>::new(session, Resource::Complaints);

    let err = fetcher.fetch_page(request(1, 2)).await.expect_err("oversized");
    assert_eq!(
        failure_message(&err),
        "server returned 3 items for a page of 2"
    );
}

#[tokio::test]
async fn student_list_pages_against_live_api() {
    let (server_url, state) = spawn_admin_server().await.expect("spawn server");
    let session = Arc::new(
        AdminSession::with_token(&server_url, DEFAULT_REQUEST_TIMEOUT, TOKEN).expect("session"),
    );
    let list = student_list(&session, ListInit::new(FilterMap::new())).expect("list");

    assert_eq!(list.load().await.settled().await, FetchOutcome::Applied);
    assert_eq!(list.snapshot().total_pages(), 3);

    assert_eq!(list.go_to_page(9).await.settled().await, FetchOutcome::Applied);
    let snapshot = list.snapshot();
    assert_eq!(snapshot.page(), 3);
    assert_eq!(snapshot.items().len(), 3);
    assert_eq!(
        state.queries.lock().await.last().and_then(|q| q.get("page").cloned()),
        Some("3".to_string())
    );
}

#[tokio::test]
async fn failed_fetch_keeps_students_visible() {
    let (server_url, _state) = spawn_admin_server().await.expect("spawn server");
    let session = Arc::new(
        AdminSession::with_token(&server_url, DEFAULT_REQUEST_TIMEOUT, TOKEN).expect("session"),
    );
    let list = student_list(&session, ListInit::new(FilterMap::new())).expect("list");
    list.load().await.settled().await;

    session.logout().await;
    assert_eq!(list.refresh().await.settled().await, FetchOutcome::Failed);
    let snapshot = list.snapshot();
    assert_eq!(snapshot.status(), ListStatus::Failed);
    assert_eq!(snapshot.error(), Some("admins only"));
    assert_eq!(snapshot.items().len(), 10);
}
