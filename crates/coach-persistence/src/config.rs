use std::path::{Path, PathBuf};

/// Carpeta por defecto si `COACH_STORAGE_DIR` no está definida.
pub const DEFAULT_STORAGE_DIR: &str = "./coach-data";

/// Ubicación en disco de la media y los snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
  pub root: PathBuf,
}

impl StorageConfig {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Lee `COACH_STORAGE_DIR` (cargando `.env` si existe).
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();
    let root = std::env::var("COACH_STORAGE_DIR").ok()
                                                 .filter(|v| !v.trim().is_empty())
                                                 .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string());
    Self::new(root)
  }

  pub fn media_dir(&self) -> PathBuf {
    self.root.join("media")
  }

  pub fn snapshot_dir(&self) -> PathBuf {
    self.root.join("snapshots")
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl Default for StorageConfig {
  fn default() -> Self {
    Self::new(DEFAULT_STORAGE_DIR)
  }
}
