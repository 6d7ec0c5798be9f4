use std::path::PathBuf;

use crate::model::ModelManager;

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(mm: ModelManager, uploads_dir: PathBuf) -> Self {
        Self { mm, uploads_dir }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    /// Root that lesson resource paths are relative to.
    pub fn uploads_dir(&self) -> &std::path::Path {
        &self.uploads_dir
    }
}
