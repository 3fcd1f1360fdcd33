pub mod categories;
pub mod inference;
pub mod model_manager;
