use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Derive a per-city path from a shared template.
///
/// A `{city}` placeholder is substituted when present; otherwise `_<city>` is
/// inserted before the extension, so `data/train.csv` becomes
/// `data/train_beijing.csv`.
pub fn city_output_path(template: &Path, city: &str) -> PathBuf {
    let text = template.to_string_lossy();
    if text.contains("{city}") {
        return PathBuf::from(text.replace("{city}", city));
    }
    let parent = template.parent().unwrap_or_else(|| Path::new(""));
    let stem = template
        .file_stem()
        .unwrap_or_else(|| OsStr::new("output"))
        .to_string_lossy();
    let file_name = match template.extension() {
        Some(ext) => format!("{stem}_{city}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{city}"),
    };
    parent.join(file_name)
}
