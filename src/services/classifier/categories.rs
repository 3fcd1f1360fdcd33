use crate::error::AppError;
use crate::models::category_types::Category;
use std::path::Path;

/// Ordered mapping from classifier output position to category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    entries: Vec<Category>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            entries: vec![
                Category::new("Cacao", "cacao.mp3"),
                Category::new("Metate", "metate.mp3"),
                Category::new("Molinillo", "molinillo.mp3"),
                Category::new("Mortero", "mortero.mp3"),
                Category::new("Silla con forma de U", "silla.mp3"),
            ],
        }
    }
}

impl CategoryTable {
    pub fn new(entries: Vec<Category>) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Err(AppError::ModelLoad("Category table is empty".to_string()));
        }

        for (idx, category) in entries.iter().enumerate() {
            if category.name.trim().is_empty() || category.audio_file.trim().is_empty() {
                return Err(AppError::ModelLoad(format!(
                    "Category {} needs both a name and an audio file",
                    idx
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Load a JSON array of `{"name", "audio_file"}` objects, in index order.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::ModelLoad(format!(
                "Failed to read category file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json_str(&content).map_err(|e| {
            AppError::ModelLoad(format!("Invalid category file {}: {}", path.display(), e))
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, AppError> {
        let entries: Vec<Category> = serde_json::from_str(content)
            .map_err(|e| AppError::ModelLoad(format!("Failed to parse category JSON: {}", e)))?;
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, index: usize) -> Result<&Category, AppError> {
        self.entries.get(index).ok_or(AppError::UnknownCategory {
            index,
            len: self.entries.len(),
        })
    }
}
