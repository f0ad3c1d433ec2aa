//! CSV export download and CSV import upload.

use crate::error::AppError;
use crate::response::ok;
use crate::state::AppState;
use crate::transfer::{export_csv, import_csv, EXPORT_FILENAME};
use axum::extract::{Multipart, State};
use axum::http::header;

pub async fn export_users_csv(State(state): State<AppState>) -> Result<impl axum::response::IntoResponse, AppError> {
    let bytes = export_csv(&state.pool).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        bytes,
    ))
}

/// POST multipart form with a `file` field holding the CSV.
pub async fn import_users_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut csv_bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let data = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
            csv_bytes = Some(data.to_vec());
            break;
        }
    }
    let csv_bytes = csv_bytes.ok_or_else(|| AppError::BadRequest("missing 'file' field in multipart body".into()))?;
    let summary = import_csv(&state.pool, &csv_bytes).await?;
    Ok(ok(summary))
}
