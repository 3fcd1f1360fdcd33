use crate::error::AppError;
use crate::models::predict_types::{PredictFailure, PredictResponse, RawUpload};
use crate::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{instrument, warn};

const FILE_FIELD: &str = "file";

/// `POST /uploadfile`: classify the uploaded photo.
///
/// Handled failures are still answered with `200`; the body says what went wrong.
#[instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Json<PredictResponse> {
    let raw = match read_upload(&mut multipart).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "rejected upload");
            return Json(PredictResponse::Failure(PredictFailure::from(err)));
        }
    };

    let outcome = match state.predict_timeout {
        Some(deadline) => state.predictor.predict_within(raw, deadline).await,
        None => state.predictor.predict(raw).await,
    };

    Json(outcome.into())
}

async fn read_upload(multipart: &mut Multipart) -> Result<RawUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e.body_text())))?;

        return Ok(RawUpload::new(bytes.to_vec(), file_name));
    }

    Err(AppError::BadRequest(format!(
        "Expected a multipart field named '{}'",
        FILE_FIELD
    )))
}
