use crate::error::AppError;
use crate::models::predict_types::{PredictFailure, PredictionResult, RawUpload};
use crate::services::classifier::categories::CategoryTable;
use crate::services::classifier::inference::{preprocess_image, ScoreVector};
use crate::services::classifier::model_manager::ModelManager;
use crate::services::upload_store::UploadStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Upload → tensor → scores → category, with every failure turned into a
/// [`PredictFailure`] at this boundary.
pub struct Predictor {
    store: UploadStore,
    models: Arc<ModelManager>,
    categories: Arc<CategoryTable>,
}

impl Predictor {
    pub fn new(store: UploadStore, models: Arc<ModelManager>, categories: Arc<CategoryTable>) -> Self {
        Self {
            store,
            models,
            categories,
        }
    }

    #[instrument(skip_all, fields(bytes = raw.bytes.len()))]
    pub async fn predict(&self, raw: RawUpload) -> Result<PredictionResult, PredictFailure> {
        report(self.try_predict(&raw).await)
    }

    /// Like [`Predictor::predict`], but gives up with a timeout failure once
    /// `deadline` has elapsed. Work already handed to a blocking thread runs
    /// to completion in the background; its result is dropped.
    #[instrument(skip_all, fields(bytes = raw.bytes.len(), deadline_ms = deadline.as_millis() as u64))]
    pub async fn predict_within(
        &self,
        raw: RawUpload,
        deadline: Duration,
    ) -> Result<PredictionResult, PredictFailure> {
        let outcome = match tokio::time::timeout(deadline, self.try_predict(&raw)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AppError::Timeout(deadline)),
        };
        report(outcome)
    }

    /// The pipeline itself, with the failure kind left intact.
    pub async fn try_predict(&self, raw: &RawUpload) -> Result<PredictionResult, AppError> {
        let start = Instant::now();

        let stored = self.store.store(raw).await?;
        let file_name = stored.file_name();

        let path = stored.as_path().to_path_buf();
        let tensor = tokio::task::spawn_blocking(move || preprocess_image(&path)).await??;

        let scorer = self.models.get().await?;
        let scores: ScoreVector = tokio::task::spawn_blocking(move || scorer.score(&tensor)).await??;

        let index = scores
            .argmax()
            .ok_or_else(|| AppError::Inference("Model returned no scores".to_string()))?;
        let category = self.categories.resolve(index)?;

        debug!(file = %file_name, scores = ?scores.as_slice(), "scored upload");
        info!(
            file = %file_name,
            index,
            category = %category.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "prediction complete"
        );

        Ok(PredictionResult::new(category.name.clone(), &category.audio_file))
    }
}

fn report(outcome: Result<PredictionResult, AppError>) -> Result<PredictionResult, PredictFailure> {
    outcome.map_err(|err| {
        warn!(kind = %err.kind(), error = %err, "prediction failed");
        PredictFailure::from(&err)
    })
}
