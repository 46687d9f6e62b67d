//! Pre-submission checks. Anything caught here is shown inline and never
//! reaches the backend.

use crate::catalog::CatalogData;
use crate::session::Selection;
use anyhow::{Result, bail};
use std::path::Path;

/// Model formats the slicer accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["stl", "3mf", "step", "obj"];

/// Default upload size ceiling in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

/// Check the model file before uploading: it must exist, carry an accepted
/// extension, and fit under the size ceiling.
pub fn validate_model_file(path: &Path, max_file_size_mb: u64) -> Result<()> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => bail!("file not found: {}", path.display()),
    };
    if !meta.is_file() {
        bail!("not a regular file: {}", path.display());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "unsupported file type .{ext}; expected one of: {}",
            ALLOWED_EXTENSIONS
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    let max_bytes = max_file_size_mb * 1024 * 1024;
    if meta.len() > max_bytes {
        bail!("file is too large. Maximum size is {max_file_size_mb}MB.");
    }
    Ok(())
}

/// Check the user's selection against the catalog: the material must exist,
/// a chosen standard color must belong to it, and multi-color mode needs a
/// material stocking more than one color.
pub fn validate_selection(catalog: &CatalogData, selection: &Selection) -> Result<()> {
    let Some(material_id) = &selection.material_id else {
        bail!("select a material first");
    };
    let Some(material) = catalog.material(material_id) else {
        bail!("unknown material: {material_id}");
    };

    if selection.is_multi_color() && !material.supports_multi_color() {
        bail!("{} does not support multi-color printing", material.name);
    }

    if let Some(crate::session::ColorSelection::Standard { hex }) = &selection.color {
        if !material.colors.iter().any(|c| c.hex.eq_ignore_ascii_case(hex)) {
            bail!("color {hex} is not available for {}", material.name);
        }
    }
    Ok(())
}
