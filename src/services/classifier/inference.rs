use crate::error::AppError;
use image::imageops::FilterType;
use image::ImageReader;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

pub const INPUT_HEIGHT: u32 = 100;
pub const INPUT_WIDTH: u32 = 100;
pub const INPUT_CHANNELS: usize = 3;

/// NHWC shape the classifier was trained on.
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_HEIGHT as usize, INPUT_WIDTH as usize, INPUT_CHANNELS];

/// Batch of one RGB image, `[1, height, width, channels]`, pixel values in 0..=255.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array4<f32>);

impl ImageTensor {
    pub fn new(array: Array4<f32>) -> Self {
        Self(array)
    }

    pub fn zeros() -> Self {
        Self(Array4::zeros(INPUT_SHAPE))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.0
    }

    pub fn ensure_input_shape(&self) -> Result<(), AppError> {
        if self.shape() != INPUT_SHAPE {
            return Err(AppError::ShapeMismatch {
                expected: INPUT_SHAPE,
                actual: self.shape().to_vec(),
            });
        }
        Ok(())
    }
}

/// One score per category, in category-table order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector(Vec<f32>);

impl ScoreVector {
    pub fn new(scores: Vec<f32>) -> Self {
        Self(scores)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index of the largest score, `None` only when there are no scores.
    ///
    /// A NaN counts as larger than everything, so the first NaN wins; otherwise
    /// the first of several equal maxima wins.
    pub fn argmax(&self) -> Option<usize> {
        if let Some(idx) = self.0.iter().position(|score| score.is_nan()) {
            return Some(idx);
        }

        let mut scores = self.0.iter().copied().enumerate();
        let (mut best, mut top) = scores.next()?;
        for (idx, score) in scores {
            if score > top {
                best = idx;
                top = score;
            }
        }
        Some(best)
    }
}

/// Anything that can turn an [`ImageTensor`] into per-category scores.
///
/// Implementations are shared across request tasks, so `score` must be safe to
/// call concurrently.
pub trait Scorer: Send + Sync {
    fn num_classes(&self) -> usize;

    fn score(&self, tensor: &ImageTensor) -> Result<ScoreVector, AppError>;
}

/// Load, resize to 100x100 and lay out the image as an NHWC batch of one.
///
/// No scaling is applied: the network consumes raw 0..=255 channel values.
pub fn preprocess_image(path: &Path) -> Result<ImageTensor, AppError> {
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::NotFound(path.display().to_string()),
        _ => AppError::Decode(format!("Failed to open image {}: {}", path.display(), e)),
    })?;

    // Uploads may carry the wrong extension (or none), so trust the content.
    let img = reader
        .with_guessed_format()
        .map_err(|e| AppError::Decode(format!("Failed to read image {}: {}", path.display(), e)))?
        .decode()?;

    let resized = img.resize_exact(INPUT_WIDTH, INPUT_HEIGHT, FilterType::Nearest);
    let rgb = resized.to_rgb8();

    let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32).collect();
    let len = data.len();
    let array = Array4::from_shape_vec(INPUT_SHAPE, data).map_err(|_| AppError::ShapeMismatch {
        expected: INPUT_SHAPE,
        actual: vec![len],
    })?;

    Ok(ImageTensor::new(array))
}

/// ONNX Runtime session wrapped for shared use.
///
/// `Session::run` needs `&mut`, so scoring goes through a mutex.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    num_classes: usize,
}

impl OnnxClassifier {
    /// Wrap a freshly built session, measuring its output width on a blank image.
    pub fn from_session(mut session: Session) -> Result<Self, AppError> {
        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| AppError::ModelLoad("Model declares no inputs".to_string()))?;

        let warmup = run_inference_with_model(&mut session, &input_name, &ImageTensor::zeros())
            .map_err(|e| AppError::ModelLoad(format!("Warm-up inference failed: {}", e)))?;

        if warmup.is_empty() {
            return Err(AppError::ModelLoad("Model produced an empty output".to_string()));
        }

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            num_classes: warmup.len(),
        })
    }
}

impl Scorer for OnnxClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn score(&self, tensor: &ImageTensor) -> Result<ScoreVector, AppError> {
        tensor.ensure_input_shape()?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AppError::Internal("Classifier session lock poisoned".to_string()))?;
        let scores = run_inference_with_model(&mut session, &self.input_name, tensor)?;

        if scores.len() != self.num_classes {
            return Err(AppError::Inference(format!(
                "Model returned {} scores, expected {}",
                scores.len(),
                self.num_classes
            )));
        }

        Ok(ScoreVector::new(scores))
    }
}

/// Run one forward pass and return the first output flattened.
fn run_inference_with_model(
    model: &mut Session,
    input_name: &str,
    input: &ImageTensor,
) -> Result<Vec<f32>, AppError> {
    let input_tensor = Value::from_array(input.as_array().clone())?;
    let outputs = model.run(ort::inputs![input_name => input_tensor])?;

    let output_value = outputs
        .values()
        .next()
        .ok_or_else(|| AppError::Inference("Model produced no outputs".to_string()))?;

    let (_, data) = output_value.try_extract_tensor::<f32>()?;

    Ok(data.to_vec())
}
