//! File-type filtering for uploads
//!
//! A file passes when both its extension and its (normalized) content type are
//! on the allow-list of the configured category.

use crate::strategy::{extension_of, FileInfo};
use std::fmt;
use std::str::FromStr;

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".svg", ".tif", ".tiff",
];

const IMAGE_MIMETYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/svg+xml",
    "image/tiff",
];

const MODEL_EXTENSIONS: &[&str] = &[
    ".glb", ".gltf", ".obj", ".fbx", ".stl", ".dae", ".3ds", ".ply", ".skp",
];

const MODEL_MIMETYPES: &[&str] = &[
    "model/gltf-binary",
    "model/gltf+json",
    "model/obj",
    "model/stl",
    "model/vnd.collada+xml",
    "application/sla",
    "application/vnd.sketchup.skp",
    "application/octet-stream",
];

/// Upload category used to pick an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadType {
    Image,
    Model,
    #[default]
    Any,
}

impl FromStr for UploadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(UploadType::Image),
            "model" => Ok(UploadType::Model),
            "any" | "all" | "" => Ok(UploadType::Any),
            other => Err(format!("Unknown upload type: {}", other)),
        }
    }
}

impl fmt::Display for UploadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadType::Image => write!(f, "image"),
            UploadType::Model => write!(f, "model"),
            UploadType::Any => write!(f, "any"),
        }
    }
}

/// Normalize MIME type by stripping parameters (e.g. "image/png; charset=binary" -> "image/png").
fn normalize_mime_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileFilter {
    upload_type: UploadType,
}

impl FileFilter {
    pub fn new(upload_type: UploadType) -> Self {
        Self { upload_type }
    }

    pub fn upload_type(&self) -> UploadType {
        self.upload_type
    }

    /// `None` means unrestricted.
    pub fn allowed_extensions(&self) -> Option<&'static [&'static str]> {
        match self.upload_type {
            UploadType::Image => Some(IMAGE_EXTENSIONS),
            UploadType::Model => Some(MODEL_EXTENSIONS),
            UploadType::Any => None,
        }
    }

    /// `None` means unrestricted.
    pub fn allowed_mimetypes(&self) -> Option<&'static [&'static str]> {
        match self.upload_type {
            UploadType::Image => Some(IMAGE_MIMETYPES),
            UploadType::Model => Some(MODEL_MIMETYPES),
            UploadType::Any => None,
        }
    }

    pub fn accepts(&self, file: &FileInfo) -> bool {
        let (Some(extensions), Some(mimetypes)) =
            (self.allowed_extensions(), self.allowed_mimetypes())
        else {
            return true;
        };

        let extension = extension_of(&file.original_name).to_lowercase();
        let mimetype = normalize_mime_type(&file.mimetype);

        extensions.contains(&extension.as_str()) && mimetypes.contains(&mimetype.as_str())
    }
}
