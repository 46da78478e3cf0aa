pub mod transfer;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};

use super::{components::table, AppState};
use crate::{
    csv_codec,
    error::EntryError,
    models::{self, Entry, EntryPayload},
};

/// A full error page, for failures the submitted form cannot fix.
pub struct AppMessage(Response);

impl AppMessage {
    pub fn new_error(err: impl std::fmt::Display, s: &AppState) -> AppMessage {
        log::error!("request failed: {err}");

        #[derive(Serialize)]
        struct Ctx {
            error: String,
        }

        Self(s.t.render_or_500(
            StatusCode::INTERNAL_SERVER_ERROR,
            "error.hbs",
            &Ctx {
                error: err.to_string(),
            },
        ))
    }
}

impl IntoResponse for AppMessage {
    fn into_response(self) -> Response {
        self.0
    }
}

#[derive(Serialize, Default)]
struct Notice {
    info: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct PageCtx<T: Serialize> {
    #[serde(flatten)]
    data: T,
    #[serde(flatten)]
    notice: Notice,
}

pub fn status_of(err: &EntryError) -> StatusCode {
    match err {
        EntryError::NotFound(_) => StatusCode::NOT_FOUND,
        EntryError::InvalidField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EntryError::MalformedImport(_) | EntryError::Csv(_) => StatusCode::BAD_REQUEST,
        EntryError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Renders a page without any notification.
pub fn show<T: Serialize>(s: &AppState, name: &str, data: T) -> Response {
    s.t.render_or_500(
        StatusCode::OK,
        name,
        &PageCtx {
            data,
            notice: Notice::default(),
        },
    )
}

/// Renders a page with the outcome of a submitted form flashed on top.
/// Storage failures replace the page with the error page.
fn report<T: Serialize>(
    s: &AppState,
    name: &str,
    data: T,
    outcome: Result<String, EntryError>,
) -> Result<Response, AppMessage> {
    let (status, notice) = match outcome {
        Ok(info) => (
            StatusCode::OK,
            Notice {
                info: Some(info),
                error: None,
            },
        ),
        Err(err @ EntryError::StorageUnavailable(_)) => return Err(AppMessage::new_error(err, s)),
        Err(err) => (
            status_of(&err),
            Notice {
                info: None,
                error: Some(err.to_string()),
            },
        ),
    };

    Ok(s.t.render_or_500(status, name, &PageCtx { data, notice }))
}

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/create", get(create_form).post(create))
        .route("/update", get(update_form).post(update))
        .route("/delete", get(delete_form).post(delete))
        .route("/get", get(get_form).post(get_one))
        .route("/get_all", get(get_all))
        .route(
            "/import_csv",
            get(transfer::import_form).post(transfer::import),
        )
        .route("/export_csv", get(transfer::export))
}

/// Entry fields exactly as typed in a form.
#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub struct EntryForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    amount: String,
    #[serde(default)]
    category: String,
}

impl EntryForm {
    fn payload(&self) -> Result<EntryPayload, EntryError> {
        let amount = models::parse_amount(&self.amount)?;
        Ok(EntryPayload::new(
            self.name.as_str(),
            amount,
            Some(self.category.as_str()),
        ))
    }

    fn id(&self) -> Result<i64, EntryError> {
        models::parse_id(&self.id)
    }
}

impl From<Entry> for EntryForm {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id.to_string(),
            name: entry.name,
            amount: csv_codec::format_amount(entry.amount),
            category: entry.category.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct FormCtx {
    form: EntryForm,
}

async fn create_form(State(s): State<AppState>) -> Response {
    show(
        &s,
        "create.hbs",
        FormCtx {
            form: EntryForm::default(),
        },
    )
}

async fn create(
    State(s): State<AppState>,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppMessage> {
    let outcome = match form.payload() {
        Ok(payload) => s.store.create(payload).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(id) => report(
            &s,
            "create.hbs",
            FormCtx {
                form: EntryForm::default(),
            },
            Ok(format!("Entry '{}' created with id {id}", form.name.trim())),
        ),
        Err(err) => report(&s, "create.hbs", FormCtx { form }, Err(err)),
    }
}

#[derive(Deserialize)]
struct IdQuery {
    id: Option<String>,
}

async fn update_form(
    State(s): State<AppState>,
    Query(q): Query<IdQuery>,
) -> Result<Response, AppMessage> {
    let Some(raw_id) = q.id.filter(|id| !id.trim().is_empty()) else {
        return Ok(show(
            &s,
            "update.hbs",
            FormCtx {
                form: EntryForm::default(),
            },
        ));
    };

    let entry = match models::parse_id(&raw_id) {
        Ok(id) => s.store.get(id).await,
        Err(err) => Err(err),
    };

    match entry {
        Ok(entry) => Ok(show(
            &s,
            "update.hbs",
            FormCtx {
                form: EntryForm::from(entry),
            },
        )),
        Err(err) => report(
            &s,
            "update.hbs",
            FormCtx {
                form: EntryForm {
                    id: raw_id,
                    ..EntryForm::default()
                },
            },
            Err(err),
        ),
    }
}

async fn update(
    State(s): State<AppState>,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppMessage> {
    let outcome = apply_update(&s, &form).await;
    report(&s, "update.hbs", FormCtx { form }, outcome)
}

async fn apply_update(s: &AppState, form: &EntryForm) -> Result<String, EntryError> {
    let id = form.id()?;
    s.store.update(id, form.payload()?).await?;
    Ok(format!("Entry {id} updated"))
}

#[derive(Serialize)]
struct ListCtx {
    entries: Vec<Entry>,
}

async fn delete_form(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let entries = s
        .store
        .get_all()
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    Ok(show(&s, "delete.hbs", ListCtx { entries }))
}

#[derive(Deserialize)]
struct IdForm {
    #[serde(default)]
    id: String,
}

async fn delete(
    State(s): State<AppState>,
    Form(form): Form<IdForm>,
) -> Result<Response, AppMessage> {
    let outcome = match models::parse_id(&form.id) {
        Ok(id) => s.store.delete(id).await.map(|_| format!("Entry {id} deleted")),
        Err(err) => Err(err),
    };

    let entries = s
        .store
        .get_all()
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    report(&s, "delete.hbs", ListCtx { entries }, outcome)
}

#[derive(Serialize)]
struct GetCtx {
    id: String,
    entry: Option<Entry>,
}

async fn get_form(State(s): State<AppState>) -> Response {
    show(
        &s,
        "get.hbs",
        GetCtx {
            id: String::new(),
            entry: None,
        },
    )
}

async fn get_one(
    State(s): State<AppState>,
    Form(form): Form<IdForm>,
) -> Result<Response, AppMessage> {
    let entry = match models::parse_id(&form.id) {
        Ok(id) => s.store.get(id).await,
        Err(err) => Err(err),
    };

    match entry {
        Ok(entry) => Ok(show(
            &s,
            "get.hbs",
            GetCtx {
                id: form.id,
                entry: Some(entry),
            },
        )),
        Err(err) => report(
            &s,
            "get.hbs",
            GetCtx {
                id: form.id,
                entry: None,
            },
            Err(err),
        ),
    }
}

async fn get_all(
    State(s): State<AppState>,
    Query(q): Query<table::Query>,
) -> Result<Response, AppMessage> {
    let q = q.normalize();

    let count = s
        .store
        .count()
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;
    let entries = s
        .store
        .page(q.limit(), q.offset())
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    let table = table::TableComponent::<Entry>::new(entries, count, "/get_all", q)
        .map_err(|err| AppMessage::new_error(err, &s))?;

    #[derive(Serialize)]
    struct Ctx {
        data: table::TableComponent<Entry>,
    }

    Ok(show(&s, "get_all.hbs", Ctx { data: table }))
}
