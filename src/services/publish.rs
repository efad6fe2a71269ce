//! On-disk layout of the published tree and replace-on-success writes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::PublishError;
use crate::model::canteen::Canteen;
use crate::model::menu::{CombinedMenu, WeekFragment, WeekKey};

pub const COMBINED_FILE: &str = "combined.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Indented, newline-terminated. Written by the pipeline.
    Pretty,
    /// Minified. Written by the reformatter.
    Compact,
}

pub fn canteen_dir(root: &Path, canteen: Canteen) -> PathBuf {
    root.join(canteen.key())
}

/// `<root>/<canteen>/<year>/<week:02>.json`
pub fn week_path(root: &Path, canteen: Canteen, key: WeekKey) -> PathBuf {
    canteen_dir(root, canteen)
        .join(key.year.to_string())
        .join(format!("{:02}.json", key.week))
}

pub fn combined_path(root: &Path, canteen: Canteen) -> PathBuf {
    canteen_dir(root, canteen).join(COMBINED_FILE)
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn to_bytes<T: Serialize>(value: &T, layout: Layout, path: &Path) -> Result<Vec<u8>, PublishError> {
    let mut bytes = match layout {
        Layout::Pretty => serde_json::to_vec_pretty(value),
        Layout::Compact => serde_json::to_vec(value),
    }
    .map_err(|e| PublishError::json(path, e))?;

    if layout == Layout::Pretty {
        bytes.push(b'\n');
    }
    Ok(bytes)
}

fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    path.with_file_name(format!(".{name}.tmp"))
}

/// Writes through a sibling temp file and renames it over `path`, so readers
/// see either the old or the new content.
pub fn replace_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, bytes)?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    replace_file(path, bytes).map_err(|e| PublishError::io(path, e))
}

/// Writes `bytes` unless the file already holds the same content.
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> Result<bool, PublishError> {
    match fs::read(path) {
        Ok(existing) if fingerprint(&existing) == fingerprint(bytes) => {
            debug!(path = %path.display(), "unchanged");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(PublishError::io(path, e)),
    }

    write_atomic(path, bytes)?;
    Ok(true)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T, layout: Layout) -> Result<bool, PublishError> {
    let bytes = to_bytes(value, layout, path)?;
    write_if_changed(path, &bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PublishError> {
    let data = fs::read(path).map_err(|e| PublishError::io(path, e))?;
    serde_json::from_slice(&data).map_err(|e| PublishError::json(path, e))
}

pub fn write_week(root: &Path, fragment: &WeekFragment, layout: Layout) -> Result<bool, PublishError> {
    let path = week_path(root, fragment.canteen, fragment.key);
    write_json(&path, fragment, layout)
}

pub fn write_combined(root: &Path, menu: &CombinedMenu, layout: Layout) -> Result<bool, PublishError> {
    let path = combined_path(root, menu.canteen);
    write_json(&path, menu, layout)
}

/// Previously published `combined.json` of a canteen, if there is one.
pub fn load_combined(root: &Path, canteen: Canteen) -> Result<Option<CombinedMenu>, PublishError> {
    let path = combined_path(root, canteen);
    if !path.exists() {
        return Ok(None);
    }
    let menu: CombinedMenu = read_json(&path)?;
    if menu.canteen != canteen {
        return Err(PublishError::json(
            &path,
            serde::de::Error::custom(format!("file belongs to {}", menu.canteen)),
        ));
    }
    Ok(Some(menu))
}

/// Every `*.json` file below `dir`, sorted by path. Temp files are skipped.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>, PublishError> {
    let mut out = Vec::new();
    collect_json(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PublishError> {
    let entries = fs::read_dir(dir).map_err(|e| PublishError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PublishError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PublishError::io(&path, e))?;

        if file_type.is_dir() {
            collect_json(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json")
            && !entry.file_name().to_string_lossy().starts_with('.')
        {
            out.push(path);
        }
    }
    Ok(())
}
