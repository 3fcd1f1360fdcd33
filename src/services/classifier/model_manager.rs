use crate::error::AppError;
use crate::services::classifier::inference::{OnnxClassifier, Scorer};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub type SharedScorer = Arc<dyn Scorer>;

type LoaderFn = dyn Fn() -> Result<SharedScorer, AppError> + Send + Sync;

/// Graph definition plus its external weights, as exported from training.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model_path: PathBuf,
    pub weights_path: PathBuf,
    pub intra_threads: usize,
}

impl ModelArtifacts {
    /// Both files must exist, and the weights must sit beside the graph because
    /// ONNX Runtime resolves external data relative to the graph file.
    pub fn verify(&self) -> Result<(), AppError> {
        for (what, path) in [("model", &self.model_path), ("weights", &self.weights_path)] {
            if !path.is_file() {
                return Err(AppError::ModelLoad(format!(
                    "Missing {} file {}",
                    what,
                    path.display()
                )));
            }
        }

        let model_dir = parent_dir(&self.model_path)?;
        let weights_dir = parent_dir(&self.weights_path)?;
        if model_dir != weights_dir {
            return Err(AppError::ModelLoad(format!(
                "Weights {} must live in the model directory {}",
                self.weights_path.display(),
                model_dir.display()
            )));
        }

        Ok(())
    }

    /// Build the ONNX Runtime session. Blocking; call from a blocking context.
    pub fn load(&self) -> Result<OnnxClassifier, AppError> {
        self.verify()?;

        let _ = ort::init().with_name("artifact-lens").commit();

        let session = Session::builder()
            .map_err(|e| AppError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| AppError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(self.intra_threads)
            .map_err(|e| AppError::ModelLoad(format!("Failed to set intra threads: {}", e)))?
            .with_execution_providers([
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| {
                AppError::ModelLoad(format!("Failed to register CPU execution provider: {}", e))
            })?
            .commit_from_file(&self.model_path)
            .map_err(|e| AppError::ModelLoad(format!("Failed to load ONNX model: {}", e)))?;

        OnnxClassifier::from_session(session)
    }
}

fn parent_dir(path: &Path) -> Result<PathBuf, AppError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    parent.canonicalize().map_err(|e| {
        AppError::ModelLoad(format!("Cannot resolve directory of {}: {}", path.display(), e))
    })
}

/// Process-wide classifier handle, loaded at most once and shared read-only after.
pub struct ModelManager {
    expected_classes: usize,
    loader: Arc<LoaderFn>,
    model: OnceCell<SharedScorer>,
    load_count: AtomicUsize,
}

impl ModelManager {
    /// `expected_classes` is the category table length the model output must match.
    pub fn new<F>(expected_classes: usize, loader: F) -> Self
    where
        F: Fn() -> Result<SharedScorer, AppError> + Send + Sync + 'static,
    {
        Self {
            expected_classes,
            loader: Arc::new(loader),
            model: OnceCell::new(),
            load_count: AtomicUsize::new(0),
        }
    }

    pub fn from_artifacts(artifacts: ModelArtifacts, expected_classes: usize) -> Self {
        Self::new(expected_classes, move || {
            artifacts.load().map(|model| Arc::new(model) as SharedScorer)
        })
    }

    /// How many times the loader has actually run.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Return the shared classifier, loading it first if nobody has yet.
    ///
    /// Concurrent callers wait on the same load. A failed load leaves the
    /// handle empty so a later call can retry.
    pub async fn get(&self) -> Result<SharedScorer, AppError> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<SharedScorer, AppError> {
        let start = Instant::now();
        self.load_count.fetch_add(1, Ordering::SeqCst);

        let loader = Arc::clone(&self.loader);
        let scorer = tokio::task::spawn_blocking(move || loader()).await??;

        if scorer.num_classes() != self.expected_classes {
            return Err(AppError::ModelLoad(format!(
                "Model scores {} classes but the category table has {}",
                scorer.num_classes(),
                self.expected_classes
            )));
        }

        debug!(classes = scorer.num_classes(), "classifier output width verified");
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "classifier loaded"
        );

        Ok(scorer)
    }
}
