use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// URL prefix under which `UploadStore::root` is served.
pub const PUBLIC_PREFIX: &str = "/static/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Uploaded file is empty")]
    Empty,
    #[error("Uploaded file is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("File type '{0}' is not allowed here")]
    UnsupportedType(String),
    #[error("Upload storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Material,
    Avatar,
}

impl UploadKind {
    fn dir(&self) -> &'static str {
        match self {
            UploadKind::Material => "materials",
            UploadKind::Avatar => "avatars",
        }
    }

    fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Material => &[
                "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "mp3", "wav", "m4a",
                "mp4", "webm", "jpg", "jpeg", "png",
            ],
            UploadKind::Avatar => &["jpg", "jpeg", "png", "gif", "webp"],
        }
    }
}

/// Coarse category recorded in `course_materials.file_type`.
pub fn material_file_type(extension: &str) -> &'static str {
    match extension {
        "pdf" => "pdf",
        "mp3" | "wav" | "m4a" => "audio",
        "mp4" | "webm" => "video",
        "jpg" | "jpeg" | "png" | "gif" | "webp" => "image",
        _ => "document",
    }
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Public URL, e.g. `/static/uploads/materials/<uuid>.pdf`
    pub url: String,
    pub path: PathBuf,
    pub extension: String,
}

/// Local directory holding user uploads.
///
/// Stored names are generated (`<uuid>.<ext>`), so nothing the client sends
/// ends up in a path except a lowercased, allow-listed extension.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub async fn new(root: PathBuf, max_size: usize) -> Result<Self, UploadError> {
        for kind in [UploadKind::Material, UploadKind::Avatar] {
            fs::create_dir_all(root.join(kind.dir())).await?;
        }

        info!(path = %root.display(), "Upload store initialized");

        Ok(Self { root, max_size })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn store(
        &self,
        kind: UploadKind,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, UploadError> {
        if data.is_empty() {
            return Err(UploadError::Empty);
        }
        if data.len() > self.max_size {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(UploadError::UnsupportedType(extension));
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.root.join(kind.dir()).join(&file_name);
        fs::write(&path, data).await?;

        debug!(path = %path.display(), size = data.len(), "Stored upload");

        Ok(StoredFile {
            url: format!("{}/{}/{}", PUBLIC_PREFIX, kind.dir(), file_name),
            path,
            extension,
        })
    }
}
