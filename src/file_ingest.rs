use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::entity_store::EntityStore;
use crate::error::{AppError, Result};
use crate::models::{FileRecord, FileType};

/// An uploaded file as it arrives in a request body: original name plus
/// base64 content (optionally with a `data:...;base64,` prefix).
#[derive(Debug, Clone, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub content: String,
}

/// Physical byte storage. Paths are relative to the storage root and use
/// `/` separators regardless of platform.
pub trait FileStorage: Send + Sync {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<u64>;
    fn delete(&self, path: &str) -> Result<()>;
    fn rename(&self, old_path: &str, new_path: &str) -> Result<()>;
}

pub struct DiskStorage {
    base_dir: PathBuf,
}

impl DiskStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        DiskStorage { base_dir: base_dir.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.base_dir.clone();
        for segment in path.split('/').filter(|s| !s.is_empty() && *s != "..") {
            full.push(segment);
        }
        full
    }
}

impl FileStorage for DiskStorage {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<u64> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("creating {}: {}", parent.display(), e)))?;
        }
        fs::write(&full, bytes)
            .map_err(|e| AppError::Storage(format!("writing {}: {}", full.display(), e)))?;
        Ok(bytes.len() as u64)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        fs::remove_file(&full)
            .map_err(|e| AppError::Storage(format!("deleting {}: {}", full.display(), e)))
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old = self.resolve(old_path);
        let new = self.resolve(new_path);
        fs::rename(&old, &new)
            .map_err(|e| AppError::Storage(format!("renaming {}: {}", old.display(), e)))
    }
}

static SANITIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9.\-]").unwrap());

/// Collision-free storage name: millisecond timestamp plus the original
/// name with anything outside `[A-Za-z0-9.-]` replaced by `_`.
pub fn unique_filename(original: &str) -> String {
    let safe = SANITIZE.replace_all(original.trim(), "_");
    format!("{}-{}", Utc::now().timestamp_millis(), safe)
}

pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn classify(extension: &str) -> FileType {
    const CODE: &[&str] = &["js", "ts", "py", "java", "c", "cpp", "rs", "html", "css"];
    const IMAGE: &[&str] = &["jpg", "jpeg", "png", "gif", "svg"];
    if CODE.contains(&extension) {
        FileType::Code
    } else if IMAGE.contains(&extension) {
        FileType::Image
    } else {
        FileType::Document
    }
}

fn decode_content(content: &str) -> Result<Vec<u8>> {
    // Browsers may send a data URL; the payload follows the first comma.
    let payload = if content.starts_with("data:") {
        content.split_once(',').map(|(_, p)| p).unwrap_or("")
    } else {
        content
    };
    BASE64
        .decode(payload.as_bytes())
        .map_err(|e| AppError::Validation(format!("File content is not valid base64: {}", e)))
}

/// Persists one upload inside an open atomic unit: writes the bytes through
/// `storage`, then inserts the metadata record. The record never carries the
/// content itself.
pub async fn ingest<S: EntityStore>(
    store: &S,
    tx: &mut S::Tx,
    storage: &dyn FileStorage,
    creator: &str,
    upload: &FileUpload,
    project_id: &str,
    organization_id: &str,
) -> Result<FileRecord> {
    if upload.name.trim().is_empty() {
        return Err(AppError::Validation("Filename is required".to_string()));
    }
    if upload.content.is_empty() {
        return Err(AppError::Validation("File content is required".to_string()));
    }

    let bytes = decode_content(&upload.content)?;
    let unique = unique_filename(&upload.name);
    let path = format!("{}/{}", project_id, unique);
    let size = storage.write(&path, &bytes)?;
    let extension = extension_of(&upload.name);

    let record = FileRecord {
        file_id: Uuid::new_v4().to_string(),
        name: unique,
        path,
        size,
        extension: extension.clone(),
        file_type: classify(&extension),
        project_id: project_id.to_string(),
        organization_id: organization_id.to_string(),
        created_by: creator.to_string(),
        is_deleted: false,
        created_at: Utc::now(),
    };
    store.insert_file(tx, &record).await?;
    Ok(record)
}

/// Best-effort removal of on-disk artifacts. Failures are logged and
/// swallowed; callers must not treat them as fatal.
pub fn remove_artifacts(storage: &dyn FileStorage, paths: &[String]) {
    for path in paths {
        if let Err(e) = storage.delete(path) {
            warn!("Failed to remove file artifact {}: {}", path, e);
        }
    }
}
