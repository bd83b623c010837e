use std::{
    io::Write as _,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    document::model::AnimationDocument,
    foundation::error::{CastError, CastResult},
};

/// Sibling output path for `input`: `<dir>/<stem>_lottie.json`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "animation".to_string());
    input.with_file_name(format!("{stem}_lottie.json"))
}

/// Validate `doc` and write it as compact JSON to `path`.
///
/// The bytes go to a temporary sibling first and are renamed over `path` only once
/// fully written, so a failed write never leaves a partial document behind.
/// Returns the number of bytes written.
#[tracing::instrument(skip(doc), fields(layers = doc.layers.len()))]
pub fn write_document(path: &Path, doc: &AnimationDocument, overwrite: bool) -> CastResult<u64> {
    doc.validate()?;
    if path.exists() && !overwrite {
        return Err(CastError::invalid_input(format!(
            "'{}' already exists (pass overwrite to replace it)",
            path.display()
        )));
    }
    ensure_parent_dir(path)?;

    let json = doc.to_json()?;
    let tmp = temp_sibling(path);
    let mut guard = TempFileGuard(Some(tmp.clone()));

    let mut file = std::fs::File::create(&tmp)
        .with_context(|| format!("create temp file '{}'", tmp.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("write temp file '{}'", tmp.display()))?;
    file.sync_all()
        .with_context(|| format!("flush temp file '{}'", tmp.display()))?;
    drop(file);

    std::fs::rename(&tmp, path)
        .with_context(|| format!("move '{}' into place at '{}'", tmp.display(), path.display()))?;
    guard.0 = None;

    let bytes = json.len() as u64;
    tracing::info!(
        path = %path.display(),
        size_kib = format_args!("{:.2}", bytes as f64 / 1024.0),
        "wrote animation document"
    );
    Ok(bytes)
}

/// Read and validate a document written by [`write_document`].
pub fn read_document(path: &Path) -> CastResult<AnimationDocument> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read animation document '{}'", path.display()))?;
    AnimationDocument::from_json(&s)
}

fn ensure_parent_dir(path: &Path) -> CastResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "animation.json".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/store.rs"]
mod tests;
