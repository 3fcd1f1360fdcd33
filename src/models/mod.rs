pub mod category_types;
pub mod predict_types;
