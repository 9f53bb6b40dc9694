//! Writing the restored image to disk.

use crate::error::RestoreError;
use crate::model::Restoration;
use std::path::{Path, PathBuf};

/// Default download file name: `<stem>_restored.jpg`.
pub(crate) fn default_file_name(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("{stem}_restored.jpg")
}

/// Resolve where a download goes: an explicit target wins; a directory target gets the
/// default file name appended.
pub(crate) fn resolve_target(
    target: Option<&Path>,
    output_dir: &Path,
    original_name: &str,
) -> PathBuf {
    match target {
        Some(p) if p.is_dir() => p.join(default_file_name(original_name)),
        Some(p) => p.to_path_buf(),
        None => output_dir.join(default_file_name(original_name)),
    }
}

/// Write the JPEG bytes of `restored` and return the path written.
pub(crate) async fn save_restoration(
    restored: &Restoration,
    target: Option<&Path>,
    output_dir: &Path,
    original_name: &str,
) -> Result<PathBuf, RestoreError> {
    let path = resolve_target(target, output_dir, original_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| RestoreError::io(format!("create {}", parent.display()), e))?;
    }
    tokio::fs::write(&path, &restored.jpeg)
        .await
        .map_err(|e| RestoreError::io(format!("write {}", path.display()), e))?;
    tracing::info!(path = %path.display(), bytes = restored.jpeg.len(), "saved restored image");
    Ok(path)
}
