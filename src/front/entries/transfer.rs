use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{report, show, AppMessage};
use crate::{
    csv_codec::{self, RejectedRow},
    error::EntryError,
    front::AppState,
};

const UPLOAD_FIELD: &str = "csv_file";

#[derive(Serialize, Default)]
struct Ctx {
    rejected: Vec<RejectedRow>,
}

pub async fn import_form(State(s): State<AppState>) -> Response {
    show(&s, "import_export_csv.hbs", Ctx::default())
}

pub async fn import(
    State(s): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppMessage> {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(err) => return report(&s, "import_export_csv.hbs", Ctx::default(), Err(err)),
    };

    match csv_codec::import(&s.store, upload.as_slice()).await {
        Ok(r) => {
            let info = format!(
                "{} entries imported, {} rows rejected",
                r.imported.len(),
                r.rejected.len()
            );
            report(
                &s,
                "import_export_csv.hbs",
                Ctx {
                    rejected: r.rejected,
                },
                Ok(info),
            )
        }
        Err(err) => report(&s, "import_export_csv.hbs", Ctx::default(), Err(err)),
    }
}

/// Returns the bytes of the uploaded `.csv` file.
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, EntryError> {
    let unreadable = |err: axum::extract::multipart::MultipartError| {
        EntryError::MalformedImport(format!("cannot read upload: {err}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        log::debug!("file_name={}", file_name);
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(EntryError::MalformedImport(
                "the file must be in CSV format".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(unreadable)?;
        return Ok(bytes.to_vec());
    }

    Err(EntryError::MalformedImport(format!(
        "no '{UPLOAD_FIELD}' file in the upload"
    )))
}

pub async fn export(State(s): State<AppState>) -> Result<Response, AppMessage> {
    let csv = csv_codec::export(&s.store)
        .await
        .map_err(|err| AppMessage::new_error(err, &s))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=export.csv"),
        ],
        csv,
    )
        .into_response())
}
