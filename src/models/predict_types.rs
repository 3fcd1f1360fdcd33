use crate::error::{AppError, ErrorKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Route prefix under which narration clips are served.
pub const AUDIO_ROUTE: &str = "/audios";

/// Image bytes as received from the caller.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

impl RawUpload {
    pub fn new(bytes: impl Into<Vec<u8>>, file_name: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name,
        }
    }
}

/// Location of an upload after the store has flushed it to disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredImagePath(PathBuf);

impl StoredImagePath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "audio")]
    pub audio_url: String,
}

impl PredictionResult {
    pub fn new(name: impl Into<String>, audio_file: &str) -> Self {
        Self {
            name: name.into(),
            audio_url: format!("{}/{}", AUDIO_ROUTE, audio_file),
        }
    }
}

/// A handled failure: the kind callers can branch on and a message they can show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictFailure {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for PredictFailure {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.public_message(),
        }
    }
}

impl From<AppError> for PredictFailure {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// JSON body returned by the upload endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Data { data: PredictionResult },
    Failure(PredictFailure),
}

impl From<Result<PredictionResult, PredictFailure>> for PredictResponse {
    fn from(outcome: Result<PredictionResult, PredictFailure>) -> Self {
        match outcome {
            Ok(data) => PredictResponse::Data { data },
            Err(failure) => PredictResponse::Failure(failure),
        }
    }
}
