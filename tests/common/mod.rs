#![allow(dead_code)]

use artifact_lens_lib::error::AppError;
use artifact_lens_lib::services::classifier::categories::CategoryTable;
use artifact_lens_lib::services::classifier::inference::{ImageTensor, ScoreVector, Scorer};
use artifact_lens_lib::services::classifier::model_manager::{ModelManager, SharedScorer};
use artifact_lens_lib::services::predictor::Predictor;
use artifact_lens_lib::services::upload_store::UploadStore;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Stand-in for the trained network: the red channel of the top-left pixel
/// decides the class, spread evenly over the five categories.
pub struct RedChannelScorer;

impl Scorer for RedChannelScorer {
    fn num_classes(&self) -> usize {
        5
    }

    fn score(&self, tensor: &ImageTensor) -> Result<ScoreVector, AppError> {
        tensor.ensure_input_shape()?;
        let red = tensor.as_array()[[0, 0, 0, 0]];
        let winner = (red as usize * 5) / 256;

        let mut scores = vec![0.02_f32; 5];
        scores[winner] = 0.92;
        Ok(ScoreVector::new(scores))
    }
}

/// Red value that lands in the middle of `index`'s bucket.
pub fn red_for_index(index: usize) -> u8 {
    (index * 51 + 25) as u8
}

pub fn encoded_image(red: u8, width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([red, 40, 90]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_for_index(index: usize) -> Vec<u8> {
    encoded_image(red_for_index(index), 120, 80, ImageFormat::Png)
}

pub fn model_manager() -> Arc<ModelManager> {
    Arc::new(ModelManager::new(5, || {
        Ok(Arc::new(RedChannelScorer) as SharedScorer)
    }))
}

pub fn predictor(upload_dir: &Path) -> (Arc<Predictor>, Arc<ModelManager>) {
    let models = model_manager();
    let predictor = Predictor::new(
        UploadStore::new(upload_dir),
        Arc::clone(&models),
        Arc::new(CategoryTable::default()),
    );
    (Arc::new(predictor), models)
}
