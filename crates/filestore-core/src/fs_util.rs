//! Local filesystem helpers

use std::path::{Path, PathBuf};

use tokio::fs;

/// List regular files under `dir`.
///
/// With `recursive` set, subdirectories are walked depth-first. With
/// `remove_parent_prefix` set, returned paths are relative to `dir`;
/// otherwise they are `dir` joined with the entry names.
pub async fn get_file_list(
    dir: impl AsRef<Path>,
    recursive: bool,
    remove_parent_prefix: bool,
) -> std::io::Result<Vec<PathBuf>> {
    let root = dir.as_ref();
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        let mut subdirs = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                if recursive {
                    subdirs.push(path);
                }
            } else if remove_parent_prefix {
                // strip_prefix cannot fail: every walked path starts at root
                let relative = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or(path);
                files.push(relative);
            } else {
                files.push(path);
            }
        }

        // Reverse so the stack pops subdirectories in read order
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, b"x").await.unwrap();
    }

    #[tokio::test]
    async fn lists_recursively_relative_to_root() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.txt")).await;
        touch(&dir.path().join("sub/b.txt")).await;
        touch(&dir.path().join("sub/deeper/c.txt")).await;

        let mut files = get_file_list(dir.path(), true, true).await.unwrap();
        files.sort();

        assert_eq!(
            files,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("sub/b.txt"),
                PathBuf::from("sub/deeper/c.txt"),
            ]
        );
    }

    #[tokio::test]
    async fn non_recursive_skips_subdirectories() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.txt")).await;
        touch(&dir.path().join("sub/b.txt")).await;

        let files = get_file_list(dir.path(), false, false).await.unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt")]);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(get_file_list(dir.path().join("nope"), true, true).await.is_err());
    }
}
