use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Every failure the prediction pipeline can produce.
///
/// `Display` is meant for logs and may carry file-system paths. Anything that
/// leaves the process goes through [`AppError::public_message`] instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to store upload: {0}")]
    Storage(String),
    #[error("image not found: {0}")]
    NotFound(String),
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [usize; 4],
        actual: Vec<usize>,
    },
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("category index {index} is outside the table of {len} entries")]
    UnknownCategory { index: usize, len: usize },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("prediction did not finish within {0:?}")]
    Timeout(Duration),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "StorageError")]
    Storage,
    #[serde(rename = "NotFoundError")]
    NotFound,
    #[serde(rename = "DecodeError")]
    Decode,
    #[serde(rename = "ShapeMismatchError")]
    ShapeMismatch,
    #[serde(rename = "ModelLoadError")]
    ModelLoad,
    #[serde(rename = "UnknownCategoryError")]
    UnknownCategory,
    #[serde(rename = "InferenceError")]
    Inference,
    #[serde(rename = "TimeoutError")]
    Timeout,
    #[serde(rename = "InternalError")]
    Internal,
    #[serde(rename = "BadRequestError")]
    BadRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Storage => "StorageError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::ShapeMismatch => "ShapeMismatchError",
            ErrorKind::ModelLoad => "ModelLoadError",
            ErrorKind::UnknownCategory => "UnknownCategoryError",
            ErrorKind::Inference => "InferenceError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::BadRequest => "BadRequestError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Storage(_) => ErrorKind::Storage,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Decode(_) => ErrorKind::Decode,
            AppError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            AppError::ModelLoad(_) => ErrorKind::ModelLoad,
            AppError::UnknownCategory { .. } => ErrorKind::UnknownCategory,
            AppError::Inference(_) => ErrorKind::Inference,
            AppError::Timeout(_) => ErrorKind::Timeout,
            AppError::Internal(_) => ErrorKind::Internal,
            AppError::BadRequest(_) => ErrorKind::BadRequest,
        }
    }

    /// Message safe to hand to a client: no paths, no source chains.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "The uploaded image could not be saved".to_string(),
            AppError::NotFound(_) => "The uploaded image could not be found".to_string(),
            AppError::Decode(_) => "The uploaded file is not a readable image".to_string(),
            AppError::ShapeMismatch { .. } => {
                "The image could not be converted to the classifier's input shape".to_string()
            }
            AppError::ModelLoad(_) => "The classifier is not available".to_string(),
            AppError::UnknownCategory { index, .. } => {
                format!("The classifier returned an unknown category ({})", index)
            }
            AppError::Inference(_) => "The classifier failed to score the image".to_string(),
            AppError::Timeout(limit) => format!(
                "The prediction did not finish within {} ms",
                limit.as_millis()
            ),
            AppError::Internal(_) => {
                "An internal error occurred while processing the image".to_string()
            }
            AppError::BadRequest(reason) => reason.clone(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            _ => AppError::Storage(err.to_string()),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<ort::Error> for AppError {
    fn from(err: ort::Error) -> Self {
        AppError::Inference(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("worker task failed: {}", err))
    }
}
