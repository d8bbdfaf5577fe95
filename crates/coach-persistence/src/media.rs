use flow::{FlowError, MediaStore, Result};
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

/// Media en disco: `<root>/media/<flow_type>/<identifier>`.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
  dir: PathBuf,
}

/// Un segmento de ruta aceptable: no vacío y sin separadores ni `..`.
fn check_segment(what: &str, segment: &str) -> Result<()> {
  let bad = segment.trim().is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']);
  if bad {
    return Err(FlowError::Storage(format!("{} inválido: '{}'", what, segment)));
  }
  Ok(())
}

impl FsMediaStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Borra un archivo guardado. Devuelve false si ya no existía.
  pub async fn remove(&self, path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }
}

#[async_trait]
impl MediaStore for FsMediaStore {
  async fn save_media(&self, bytes: &[u8], identifier: &str, flow_type: &str) -> Result<PathBuf> {
    check_segment("identificador", identifier)?;
    check_segment("tipo de flujo", flow_type)?;
    let folder = self.dir.join(flow_type);
    tokio::fs::create_dir_all(&folder).await?;
    let path = folder.join(identifier);
    tokio::fs::write(&path, bytes).await?;
    debug!("media guardada en {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
  }

  fn media_file_exists(&self, path: &Path) -> bool {
    path.is_file()
  }
}
