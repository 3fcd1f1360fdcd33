pub mod classifier;
pub mod predictor;
pub mod upload_store;
