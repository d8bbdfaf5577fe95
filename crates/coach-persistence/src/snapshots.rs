use flow::{FlowSnapshot, Result, SnapshotStore};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Snapshots como JSON, uno por `kind`: `<root>/snapshots/<kind>.json`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
  dir: PathBuf,
}

impl FsSnapshotStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Nombre de archivo para un kind; `shot_rater:wrist` -> `shot_rater_wrist.json`.
  fn path_for(&self, kind: &str) -> PathBuf {
    let name: String = kind.chars()
                           .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
                           .collect();
    self.dir.join(format!("{}.json", name))
  }
}

impl SnapshotStore for FsSnapshotStore {
  fn save(&self, snapshot: &FlowSnapshot) -> Result<()> {
    fs::create_dir_all(&self.dir)?;
    let path = self.path_for(&snapshot.kind);
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
    // rename sobre el mismo directorio: nunca queda un snapshot a medias
    fs::rename(&tmp, &path)?;
    debug!("snapshot {} guardado en {}", snapshot.kind, path.display());
    Ok(())
  }

  fn load(&self, kind: &str) -> Result<Option<FlowSnapshot>> {
    let path = self.path_for(kind);
    let raw = match fs::read(&path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice::<FlowSnapshot>(&raw) {
      Ok(snapshot) => Ok(Some(snapshot)),
      Err(e) => {
        warn!("snapshot ilegible en {}: {}; se descarta", path.display(), e);
        self.clear(kind)?;
        Ok(None)
      }
    }
  }

  fn clear(&self, kind: &str) -> Result<()> {
    match fs::remove_file(self.path_for(kind)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}
