//! Giftlist HTTP server.
//!
//! REST API over the giftlist core.
//!
//! Run with: cargo run --release --features server --bin giftlist-server

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use giftlist::error::GiftlistError;
use giftlist::ids::parse_id;
use giftlist::model::{CreateGift, GiftPatch, ListPatch, UserPatch};
use giftlist::users::SelectKind;
use giftlist::{auth, gifts, lists, sharing, users};

// ============================================================================
// Error mapping
// ============================================================================

struct ApiError(GiftlistError);

impl From<GiftlistError> for ApiError {
    fn from(e: GiftlistError) -> Self {
        ApiError(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GiftlistError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GiftlistError::NotFound(_) => StatusCode::NOT_FOUND,
            GiftlistError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GiftlistError::Conflict(_) => StatusCode::CONFLICT,
            GiftlistError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "storage failure");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Auth extraction
// ============================================================================

/// Resolve the caller from a bearer token, or 401
fn require_auth(headers: &HeaderMap) -> ApiResult<Uuid> {
    optional_auth(headers)?
        .ok_or_else(|| ApiError(GiftlistError::Unauthorized("missing bearer token".into())))
}

/// Resolve the caller if a token is present; anonymous callers get None, but
/// a token that is present and bad is still an error.
fn optional_auth(headers: &HeaderMap) -> ApiResult<Option<Uuid>> {
    let header = match headers.get(axum::http::header::AUTHORIZATION) {
        Some(h) => h,
        None => return Ok(None),
    };
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            ApiError(GiftlistError::Unauthorized(
                "malformed authorization header".into(),
            ))
        })?;
    Ok(Some(auth::validate_session(token)?))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct SignupRequest {
    email: String,
    display_name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: Uuid,
    token: String,
    expires_at: u64,
}

#[derive(Debug, Deserialize)]
struct CreateListRequest {
    title: String,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct IdResponse {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SelectQuery {
    #[serde(default)]
    select: SelectKind,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// Users & sessions

async fn signup(Json(req): Json<SignupRequest>) -> ApiResult<Json<SessionResponse>> {
    let s = auth::signup(&req.email, &req.display_name, &req.password)?;
    Ok(Json(SessionResponse {
        id: s.user_id,
        token: s.token,
        expires_at: s.expires_at,
    }))
}

async fn login(Json(req): Json<LoginRequest>) -> ApiResult<Json<SessionResponse>> {
    let s = auth::login(&req.email, &req.password)?;
    Ok(Json(SessionResponse {
        id: s.user_id,
        token: s.token,
        expires_at: s.expires_at,
    }))
}

async fn logout(headers: HeaderMap) -> ApiResult<StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError(GiftlistError::Unauthorized("missing bearer token".into())))?;
    auth::revoke_session(header)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(headers: HeaderMap) -> ApiResult<Json<Vec<giftlist::project::UserDto>>> {
    require_auth(&headers)?;
    Ok(Json(users::list_users()?))
}

async fn get_me(headers: HeaderMap) -> ApiResult<Json<giftlist::model::User>> {
    let viewer = require_auth(&headers)?;
    Ok(Json(users::get_user(viewer)?))
}

async fn edit_me(headers: HeaderMap, Json(patch): Json<UserPatch>) -> ApiResult<StatusCode> {
    let viewer = require_auth(&headers)?;
    users::edit_user(viewer, viewer, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_me(headers: HeaderMap) -> ApiResult<StatusCode> {
    let viewer = require_auth(&headers)?;
    users::delete_user(viewer, viewer)?;
    Ok(StatusCode::NO_CONTENT)
}

// Lists

async fn all_lists() -> ApiResult<Json<Vec<giftlist::project::ListDto>>> {
    Ok(Json(lists::list_all()?))
}

async fn my_lists(
    headers: HeaderMap,
    Query(q): Query<SelectQuery>,
) -> ApiResult<Json<Vec<giftlist::project::ListDto>>> {
    let viewer = require_auth(&headers)?;
    Ok(Json(users::user_lists(viewer, q.select)?))
}

async fn create_list(
    headers: HeaderMap,
    Json(req): Json<CreateListRequest>,
) -> ApiResult<Json<IdResponse>> {
    let viewer = require_auth(&headers)?;
    let id = lists::create_list(viewer, &req.title, req.description)?;
    Ok(Json(IdResponse { id }))
}

async fn get_list(
    headers: HeaderMap,
    Path(list_id): Path<String>,
) -> ApiResult<Json<giftlist::project::ListDto>> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = optional_auth(&headers)?;
    Ok(Json(lists::get_list(viewer, list_id)?))
}

async fn update_list(
    headers: HeaderMap,
    Path(list_id): Path<String>,
    Json(patch): Json<ListPatch>,
) -> ApiResult<StatusCode> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    lists::update_list(viewer, list_id, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_list(headers: HeaderMap, Path(list_id): Path<String>) -> ApiResult<StatusCode> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    lists::delete_list(viewer, list_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Sharing

async fn share_list(headers: HeaderMap, Path(list_id): Path<String>) -> ApiResult<StatusCode> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    sharing::share(viewer, list_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unshare_list(headers: HeaderMap, Path(list_id): Path<String>) -> ApiResult<StatusCode> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    sharing::unshare(viewer, list_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resolve_invite(
    headers: HeaderMap,
    Path(code): Path<String>,
) -> ApiResult<Json<giftlist::project::ListDto>> {
    let code = parse_id(&code).map_err(ApiError)?;
    let viewer = optional_auth(&headers)?;
    Ok(Json(sharing::resolve_by_code(viewer, code)?))
}

async fn accept_invite(headers: HeaderMap, Path(code): Path<String>) -> ApiResult<StatusCode> {
    let code = parse_id(&code).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    sharing::consume_invite(viewer, code)?;
    Ok(StatusCode::NO_CONTENT)
}

// Gifts

fn parse_pair(list_id: &str, gift_id: &str) -> ApiResult<(Uuid, Uuid)> {
    Ok((
        parse_id(list_id).map_err(ApiError)?,
        parse_id(gift_id).map_err(ApiError)?,
    ))
}

async fn create_gift(
    headers: HeaderMap,
    Path(list_id): Path<String>,
    Json(req): Json<CreateGift>,
) -> ApiResult<Json<IdResponse>> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = require_auth(&headers)?;
    let id = gifts::create_gift(viewer, list_id, &req)?;
    Ok(Json(IdResponse { id }))
}

async fn list_gifts(
    headers: HeaderMap,
    Path(list_id): Path<String>,
) -> ApiResult<Json<Vec<giftlist::project::GiftDto>>> {
    let list_id = parse_id(&list_id).map_err(ApiError)?;
    let viewer = optional_auth(&headers)?;
    Ok(Json(gifts::gifts_of_list(viewer, list_id)?))
}

async fn get_gift(
    headers: HeaderMap,
    Path((list_id, gift_id)): Path<(String, String)>,
) -> ApiResult<Json<giftlist::project::GiftDto>> {
    let (list_id, gift_id) = parse_pair(&list_id, &gift_id)?;
    let viewer = optional_auth(&headers)?;
    Ok(Json(gifts::get_gift(viewer, list_id, gift_id)?))
}

async fn update_gift(
    headers: HeaderMap,
    Path((list_id, gift_id)): Path<(String, String)>,
    Json(patch): Json<GiftPatch>,
) -> ApiResult<StatusCode> {
    let (list_id, gift_id) = parse_pair(&list_id, &gift_id)?;
    let viewer = require_auth(&headers)?;
    gifts::update_gift(viewer, list_id, gift_id, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_gift(
    headers: HeaderMap,
    Path((list_id, gift_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let (list_id, gift_id) = parse_pair(&list_id, &gift_id)?;
    let viewer = require_auth(&headers)?;
    gifts::delete_gift(viewer, list_id, gift_id)?;
    Ok(StatusCode::NO_CONTENT)
}

macro_rules! gift_action {
    ($name:ident, $func:path) => {
        async fn $name(
            headers: HeaderMap,
            Path((list_id, gift_id)): Path<(String, String)>,
        ) -> ApiResult<StatusCode> {
            let (list_id, gift_id) = parse_pair(&list_id, &gift_id)?;
            let viewer = require_auth(&headers)?;
            $func(viewer, list_id, gift_id)?;
            Ok(StatusCode::NO_CONTENT)
        }
    };
}

gift_action!(book_gift, gifts::book);
gift_action!(unbook_gift, gifts::unbook);
gift_action!(fav_gift, gifts::favorite);
gift_action!(unfav_gift, gifts::unfavorite);
gift_action!(hide_gift, gifts::hide);
gift_action!(unhide_gift, gifts::unhide);

// ============================================================================
// Main
// ============================================================================

fn router() -> Router {
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", get(health))
        // Users & sessions
        .route("/users", post(signup).get(list_users))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/users/me", get(get_me).put(edit_me).delete(delete_me))
        // Lists
        .route("/lists", get(all_lists).post(create_list))
        .route("/lists/mine", get(my_lists))
        .route(
            "/lists/:list_id",
            get(get_list).put(update_list).delete(delete_list),
        )
        .route("/lists/:list_id/share", get(share_list))
        .route("/lists/:list_id/unshare", get(unshare_list))
        .route(
            "/lists/invite/:sharing_code",
            get(resolve_invite).put(accept_invite),
        )
        // Gifts
        .route(
            "/lists/:list_id/gifts",
            post(create_gift).get(list_gifts),
        )
        .route(
            "/lists/:list_id/gifts/:gift_id",
            get(get_gift).put(update_gift).delete(delete_gift),
        )
        .route("/lists/:list_id/gifts/:gift_id/book", put(book_gift))
        .route("/lists/:list_id/gifts/:gift_id/unbook", put(unbook_gift))
        .route("/lists/:list_id/gifts/:gift_id/fav", put(fav_gift))
        .route("/lists/:list_id/gifts/:gift_id/unfav", put(unfav_gift))
        .route("/lists/:list_id/gifts/:gift_id/hide", put(hide_gift))
        .route("/lists/:list_id/gifts/:gift_id/unhide", put(unhide_gift))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path =
        std::env::var("GIFTLIST_DB").unwrap_or_else(|_| "./giftlist-data".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    if let Err(e) = giftlist::init(&db_path) {
        tracing::error!(error = %e, path = %db_path, "failed to initialize database");
        std::process::exit(1);
    }
    tracing::info!(path = %db_path, "database initialized");

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), %addr, "giftlist-server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, router()).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
