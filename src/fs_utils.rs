use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use walkdir::WalkDir;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Expands the given paths: files are kept if supported, directories are scanned.
pub fn collect_images(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.exists() {
            return Err(anyhow!("{} does not exist", input.display()));
        }
        if input.is_file() {
            if is_supported_image(input) {
                files.push(input.clone());
            } else {
                log::debug!("skipping unsupported file {}", input.display());
            }
            continue;
        }
        files.extend(collect_dir(input, recursive)?);
    }
    Ok(files)
}

fn collect_dir(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if recursive {
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && is_supported_image(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    } else {
        for entry in fs::read_dir(root)
            .with_context(|| format!("Unable to read directory {}", root.display()))?
        {
            let entry =
                entry.with_context(|| format!("Unable to read entry in {}", root.display()))?;
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

pub fn is_supported_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ref ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str())
    )
}

pub fn prepare_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Unable to create {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let mut candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = split_name(file_name);
    for idx in 1.. {
        let new_name = if let Some(ext) = &ext {
            format!("{stem}-{idx}.{ext}")
        } else {
            format!("{stem}-{idx}")
        };
        candidate = dir.join(new_name);
        if !candidate.exists() {
            break;
        }
    }
    candidate
}

pub fn split_name(file_name: &OsStr) -> (String, Option<String>) {
    let name = file_name.to_string_lossy();
    if let Some((stem, ext)) = name.rsplit_once('.') {
        (stem.to_string(), Some(ext.to_string()))
    } else {
        (name.to_string(), None)
    }
}

/// File name for an exported result: `<stem>-edited.<ext>`.
pub fn edited_file_name(source_name: &str, extension: &str) -> String {
    let base = Path::new(source_name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let (stem, _) = split_name(&base);
    let stem = if stem.trim().is_empty() {
        "image".to_string()
    } else {
        stem
    };
    format!("{stem}-edited.{extension}")
}
