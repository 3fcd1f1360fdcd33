use crate::error::AppError;
use crate::services::classifier::categories::CategoryTable;
use crate::services::classifier::model_manager::ModelArtifacts;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings; every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "artifact-lens", version, about)]
pub struct Config {
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// ONNX graph exported from the trained network.
    #[arg(long, env = "MODEL_PATH", default_value = "modelo/modelo.onnx")]
    pub model_path: PathBuf,

    /// External-data weights file referenced by the graph.
    #[arg(long, env = "WEIGHTS_PATH", default_value = "modelo/pesos.onnx.data")]
    pub weights_path: PathBuf,

    /// JSON category table; the built-in kiosk table is used when absent.
    #[arg(long, env = "CATEGORIES_PATH")]
    pub categories_path: Option<PathBuf>,

    #[arg(long, env = "UPLOAD_DIR", default_value = "media/uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "AUDIO_DIR", default_value = "media/audios")]
    pub audio_dir: PathBuf,

    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://192.168.98:3000"
    )]
    pub allowed_origins: Vec<String>,

    #[arg(long = "body-limit", env = "BODY_LIMIT_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub body_limit: usize,

    #[arg(long, env = "PREDICT_TIMEOUT_SECS")]
    pub predict_timeout_secs: Option<u64>,

    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn predict_timeout(&self) -> Option<Duration> {
        self.predict_timeout_secs.map(Duration::from_secs)
    }

    pub fn model_artifacts(&self) -> ModelArtifacts {
        ModelArtifacts {
            model_path: self.model_path.clone(),
            weights_path: self.weights_path.clone(),
            intra_threads: self.intra_threads,
        }
    }

    pub fn load_categories(&self) -> Result<CategoryTable, AppError> {
        match &self.categories_path {
            Some(path) => CategoryTable::from_json_file(path),
            None => Ok(CategoryTable::default()),
        }
    }
}
