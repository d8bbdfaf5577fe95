// Archivo: repository.rs
// Propósito: contratos de persistencia que usa el motor: almacenamiento de
// media (rutas, nunca bytes en el snapshot) y almacenamiento de snapshots de
// flujo para reanudar tras reiniciar el proceso.
use crate::errors::Result;
use crate::snapshot::FlowSnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Colaborador de media. Lo usa exclusivamente `FlowSnapshot` y la sesión
/// al preparar un snapshot.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Guarda la media y devuelve la ruta donde quedó.
    async fn save_media(&self, bytes: &[u8], identifier: &str, flow_type: &str) -> Result<PathBuf>;

    /// Indica si la ruta sigue resolviendo.
    fn media_file_exists(&self, path: &Path) -> bool;
}

/// Persistencia de snapshots, uno por `kind` de feature.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &FlowSnapshot) -> Result<()>;

    fn load(&self, kind: &str) -> Result<Option<FlowSnapshot>>;

    /// Borra el snapshot de `kind`. No falla si no existe.
    fn clear(&self, kind: &str) -> Result<()>;
}
