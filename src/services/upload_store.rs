//! Local-disk storage for uploaded bootcamp photos.

use chrono::NaiveDate;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;

/// Directory that receives photo uploads, plus the size ceiling enforced
/// before anything is written.
#[derive(Clone, Debug)]
pub struct UploadStore {
    base_path: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(base_path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            base_path: base_path.into(),
            max_bytes,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Write `data` as `base_path/filename`.
    ///
    /// Bytes go to a temporary file first, are fsynced, then renamed into
    /// place so readers never observe a partial photo. Replaces any existing
    /// file of the same name.
    pub async fn save(&self, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
        ensure_name_safe(filename)?;
        fs::create_dir_all(&self.base_path).await?;

        let final_path = self.base_path.join(filename);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&final_path).await?;
                fs::rename(&tmp_path, &final_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(err);
            }
        }

        Ok(final_path)
    }

    /// Open a stored upload for reading. `Ok(None)` when it does not exist or
    /// the name is not a plain filename.
    pub async fn open(&self, filename: &str) -> io::Result<Option<File>> {
        if ensure_name_safe(filename).is_err() {
            return Ok(None);
        }
        match File::open(self.base_path.join(filename)).await {
            Ok(file) => Ok(Some(file)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// Only bare filenames: no separators, no parent references, no hidden files.
fn ensure_name_safe(name: &str) -> io::Result<()> {
    let unsafe_name = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if unsafe_name {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid upload filename `{}`", name),
        ));
    }
    Ok(())
}

/// True for any `image/*` MIME type.
pub fn is_image(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Extension of the client's filename including the dot, or `""` when it has none.
pub fn file_extension(original_name: &str) -> &str {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(pos) => &base[pos..],
    }
}

/// `BOOTCAMP_<id>_<YYYYMMDD><ext>` for a photo uploaded on `date`.
pub fn photo_filename(id: Uuid, date: NaiveDate, original_name: &str) -> String {
    format!(
        "BOOTCAMP_{}_{}{}",
        id,
        date.format("%Y%m%d"),
        file_extension(original_name)
    )
}

/// Content type to serve a stored upload with, from its extension.
pub fn content_type_for(filename: &str) -> &'static str {
    match file_extension(filename).to_ascii_lowercase().as_str() {
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".svg" => "image/svg+xml",
        ".bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
