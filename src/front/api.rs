//! JSON API over the entry store.
//!
//! Every request must carry `Authorization: Bearer <token>` with a token from
//! the configured `api_tokens`. Tokens with the `user` role may only issue
//! `GET` requests. Every error, including malformed ids and bodies, is
//! answered with a JSON `{"error": ...}` body.
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Request, State,
    },
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde_json::json;
use thiserror::Error;

use super::{entries::status_of, AppState};
use crate::{
    csv_codec::{self, ImportReport},
    error::EntryError,
    models::{Entry, EntryPayload},
    settings::Role,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing or unknown API token")]
    Unauthorized,
    #[error("this token is not allowed to modify entries")]
    Forbidden,
    #[error("{1}")]
    Rejected(StatusCode, String),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Rejected(status, _) => *status,
            ApiError::Entry(err) => status_of(err),
        };
        if status.is_server_error() {
            log::error!("api request failed: {self}");
        }

        let body = Json(json!({ "error": self.to_string() }));
        match self {
            ApiError::Unauthorized => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

pub fn new_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/export", get(export))
        .route("/products/import", post(import))
        .route("/products/:id", get(get_one).put(update).delete(delete))
        .route_layer(middleware::from_fn_with_state(state, auth))
}

async fn auth(
    State(s): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = bearer
        .and_then(|bearer| s.tokens.get(bearer.token()).copied())
        .ok_or(ApiError::Unauthorized)?;

    if request.method() != Method::GET && role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}

async fn create(
    State(s): State<AppState>,
    payload: Result<Json<EntryPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Entry>), ApiError> {
    let Json(payload) = payload?;
    let id = s.store.create(payload).await?;
    let entry = s.store.get(id).await?;
    log::info!("api created entry {id}");
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn list(State(s): State<AppState>) -> Result<Json<Vec<Entry>>, ApiError> {
    Ok(Json(s.store.get_all().await?))
}

async fn get_one(
    State(s): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Entry>, ApiError> {
    let Path(id) = id?;
    Ok(Json(s.store.get(id).await?))
}

async fn update(
    State(s): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<EntryPayload>, JsonRejection>,
) -> Result<Json<Entry>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    s.store.update(id, payload).await?;
    Ok(Json(s.store.get(id).await?))
}

async fn delete(
    State(s): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    s.store.delete(id).await?;
    log::info!("api deleted entry {id}");
    Ok(StatusCode::NO_CONTENT)
}

async fn export(State(s): State<AppState>) -> Result<Response, ApiError> {
    let csv = csv_codec::export(&s.store).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
}

async fn import(State(s): State<AppState>, body: String) -> Result<Json<ImportReport>, ApiError> {
    Ok(Json(csv_codec::import(&s.store, body.as_bytes()).await?))
}
