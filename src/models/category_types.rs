use serde::{Deserialize, Serialize};

/// One row of the category table: what the kiosk shows and which narration it plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub audio_file: String,
}

impl Category {
    pub fn new(name: impl Into<String>, audio_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audio_file: audio_file.into(),
        }
    }
}
