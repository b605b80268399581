//! Destination and filename strategies for uploaded files

use serde::Serialize;
use std::error::Error;

/// Error returned by a filename strategy; surfaces as `UploadError::Filename`.
pub type StrategyError = Box<dyn Error + Send + Sync>;

/// What the upload engine knows about an incoming file before storing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub field_name: String,
    pub original_name: String,
    pub mimetype: String,
}

/// Chooses the object name (without destination) for an incoming file.
pub trait FilenameStrategy: Send + Sync {
    fn filename(&self, file: &FileInfo) -> Result<String, StrategyError>;
}

/// Chooses the destination prefix for an incoming file.
pub trait DestinationStrategy: Send + Sync {
    fn destination(&self, file: &FileInfo) -> String;
}

impl<F> FilenameStrategy for F
where
    F: Fn(&FileInfo) -> Result<String, StrategyError> + Send + Sync,
{
    fn filename(&self, file: &FileInfo) -> Result<String, StrategyError> {
        self(file)
    }
}

impl<F> DestinationStrategy for F
where
    F: Fn(&FileInfo) -> String + Send + Sync,
{
    fn destination(&self, file: &FileInfo) -> String {
        self(file)
    }
}

/// Default filename: 16 random bytes as hex, followed by the original extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomHexFilename;

impl FilenameStrategy for RandomHexFilename {
    fn filename(&self, file: &FileInfo) -> Result<String, StrategyError> {
        let raw: [u8; 16] = rand::random();
        Ok(format!(
            "{}{}",
            hex::encode(raw),
            extension_of(&file.original_name)
        ))
    }
}

/// The same destination for every file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StaticDestination(pub String);

impl StaticDestination {
    pub fn new(destination: impl Into<String>) -> Self {
        Self(destination.into())
    }
}

impl DestinationStrategy for StaticDestination {
    fn destination(&self, _file: &FileInfo) -> String {
        self.0.clone()
    }
}

/// Extension of the last path component, including the dot.
///
/// Dotfiles (`.env`) and names without a dot have no extension; `name.` has
/// the extension `.`.
pub fn extension_of(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    if base.chars().all(|c| c == '.') {
        return "";
    }
    match base.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &base[idx..],
    }
}

/// Join a destination prefix and a filename into an object path.
pub fn join_key(destination: &str, filename: &str) -> String {
    let destination = destination.trim_end_matches('/');
    if destination.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", destination, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> FileInfo {
        FileInfo {
            field_name: "file".to_string(),
            original_name: name.to_string(),
            mimetype: "image/png".to_string(),
        }
    }

    #[test]
    fn extension_of_handles_edge_cases() {
        assert_eq!(extension_of("photo.png"), ".png");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("dir.d/README"), "");
        assert_eq!(extension_of(".env"), "");
        assert_eq!(extension_of("name."), ".");
        assert_eq!(extension_of(".."), "");
        assert_eq!(extension_of(""), "");
    }

    #[test]
    fn random_hex_filename_keeps_extension() {
        let name = RandomHexFilename.filename(&info("photo.PNG")).unwrap();
        assert_eq!(name.len(), 32 + 4);
        assert!(name.ends_with(".PNG"));
        assert!(name[..32].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn random_hex_filenames_differ() {
        let a = RandomHexFilename.filename(&info("a")).unwrap();
        let b = RandomHexFilename.filename(&info("a")).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn closures_are_strategies() {
        let filename = |file: &FileInfo| Ok::<_, StrategyError>(format!("fixed-{}", file.original_name));
        let destination = |file: &FileInfo| format!("by-field/{}", file.field_name);

        assert_eq!(filename.filename(&info("x.txt")).unwrap(), "fixed-x.txt");
        assert_eq!(destination.destination(&info("x.txt")), "by-field/file");
    }

    #[test]
    fn join_key_avoids_double_slashes() {
        assert_eq!(join_key("", "a.png"), "a.png");
        assert_eq!(join_key("uploads", "a.png"), "uploads/a.png");
        assert_eq!(join_key("uploads/", "a.png"), "uploads/a.png");
        assert_eq!(
            StaticDestination::new("up").destination(&info("a")),
            "up".to_string()
        );
    }
}
