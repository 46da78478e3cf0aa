pub mod api;
pub mod components {
    pub mod table;
}
pub mod entries;
pub mod template;

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    response::Response,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::{
    settings::{Role, Settings},
    store::EntryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: EntryStore,
    pub t: template::Template,
    pub tokens: Arc<HashMap<String, Role>>,
}

impl AppState {
    pub fn new(store: EntryStore, t: template::Template, tokens: HashMap<String, Role>) -> Self {
        Self {
            store,
            t,
            tokens: Arc::new(tokens),
        }
    }
}

/// Web pages at the root, JSON API under `/api`, static files under `/public`.
pub fn router(state: AppState, public_dir: &str) -> Router {
    Router::new()
        .route("/", get(index))
        .merge(entries::new_router())
        .nest("/api", api::new_router(state.clone()))
        .nest_service("/public", ServeDir::new(public_dir))
        .with_state(state)
}

pub async fn start_web_server(store: EntryStore, settings: &Settings) -> anyhow::Result<()> {
    log::info!("loading templates from {}", settings.templates_dir);
    let t = template::Template::new(&settings.templates_dir)?;
    if settings.api_tokens.is_empty() {
        log::warn!("no API tokens configured, every /api request will be rejected");
    }

    let state = AppState::new(store, t, settings.api_tokens.clone());
    let app = router(state, &settings.public_dir);

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;
    log::info!("open website at http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("cannot listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

async fn index(State(s): State<AppState>) -> Result<Response, entries::AppMessage> {
    #[derive(Serialize)]
    struct Ctx {
        count: i64,
        total: f64,
    }

    let count = s
        .store
        .count()
        .await
        .map_err(|err| entries::AppMessage::new_error(err, &s))?;
    let total = s
        .store
        .total()
        .await
        .map_err(|err| entries::AppMessage::new_error(err, &s))?;

    Ok(entries::show(&s, "home.hbs", Ctx { count, total }))
}
