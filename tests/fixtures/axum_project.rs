// Axum fixture: a small user service exercising typed extractors, doc
// annotations, validation rules and nested routers.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub plan: Plan,
    /// Users reporting to this one
    pub reports: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Mini,
    Pro,
    Enterprise,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub plan: Plan,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub users: u64,
    pub active_users: u64,
}

#[derive(Clone, Default)]
pub struct AppState;

pub struct Claims {
    pub sub: String,
}

async fn health() -> &'static str {
    "OK"
}

/// Lists users page by page.
async fn list_users(Query(query): Query<ListQuery>) -> Json<Vec<User>> {
    Json(vec![])
}

/// Fetches one user.
async fn get_user(Path(id): Path<u64>) -> Result<Json<User>, ApiError> {
    if id == 0 {
        return Err(not_found(StatusCode::NOT_FOUND));
    }
    todo!()
}

/// Creates a user.
async fn create_user(
    claims: Claims,
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> (StatusCode, Json<User>) {
    (StatusCode::CREATED, Json(todo!()))
}

/// Updates name or email.
///
/// @rule name string|max:64
/// @rule email email
/// @tag users, profile
async fn update_user(Path(id): Path<u64>) -> Json<User> {
    todo!()
}

async fn delete_user(Path(id): Path<u64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

#[deprecated]
async fn legacy_users() -> Json<Vec<User>> {
    Json(vec![])
}

/// @response 200 Stats Aggregate counters
/// @security bearer
async fn stats() -> impl IntoResponse {
    todo!()
}

fn not_found(status: StatusCode) -> ApiError {
    todo!()
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

fn admin_router() -> Router<AppState> {
    Router::new().route("/admin/stats", get(stats))
}

fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ping", get(|| async { "pong" }))
        .nest("/api/v1/users", users_router())
        .route("/legacy/users", get(legacy_users))
        .merge(admin_router())
        .with_state(AppState::default())
}

#[tokio::main]
async fn main() {
    let app = app();
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
