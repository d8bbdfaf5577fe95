//! Persistencia en disco para el motor de flujos: media capturada y snapshots
//! de flujos a medio completar. Implementa los traits `MediaStore` y
//! `SnapshotStore` del crate `flow`.

mod config;
mod media;
mod snapshots;

pub use config::{StorageConfig, DEFAULT_STORAGE_DIR};
pub use media::FsMediaStore;
pub use snapshots::FsSnapshotStore;

use std::sync::Arc;

/// Par de almacenes que comparten la misma raíz.
#[derive(Debug, Clone)]
pub struct FsStorage {
  pub media: Arc<FsMediaStore>,
  pub snapshots: Arc<FsSnapshotStore>,
}

impl FsStorage {
  pub fn new(config: &StorageConfig) -> Self {
    Self { media: Arc::new(FsMediaStore::new(config.media_dir())),
           snapshots: Arc::new(FsSnapshotStore::new(config.snapshot_dir())) }
  }
}

/// Construye el almacenamiento a partir de `COACH_STORAGE_DIR`.
pub fn new_from_env() -> FsStorage {
  let config = StorageConfig::from_env();
  log::info!("almacenamiento en {}", config.root().display());
  FsStorage::new(&config)
}
