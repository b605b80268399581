//! Storage path normalization
//!
//! Every user-supplied path goes through [`clean_file_path`] before it is used
//! as an object key. Object keys in the bucket depend on the exact output, so
//! the rules here must stay stable.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("filePath {0} is not supported for file_storage")]
    Unsupported(String),
}

/// Normalize a storage path.
///
/// - `None` yields `Ok(None)` (logged as a warning).
/// - A single `/` or `.` is rejected.
/// - Other paths shorter than two characters are returned as-is, with a `/`
///   prepended when `keep_leading_slash` is set and the path is not empty.
/// - A leading `./` is reduced to `/` (keeping) or removed (not keeping).
/// - A leading `/` is removed unless `keep_leading_slash` is set.
pub fn clean_file_path(
    path: Option<&str>,
    keep_leading_slash: bool,
) -> Result<Option<String>, PathError> {
    let Some(path) = path else {
        tracing::warn!("filePath is null or undefined");
        return Ok(None);
    };

    let mut chars = path.chars();
    let first = chars.next();
    let second = chars.next();

    let (first, second) = match (first, second) {
        (None, _) => return Ok(Some(String::new())),
        (Some(c), None) => {
            if c == '/' || c == '.' {
                return Err(PathError::Unsupported(path.to_string()));
            }
            if keep_leading_slash {
                return Ok(Some(format!("/{}", path)));
            }
            return Ok(Some(path.to_string()));
        }
        (Some(a), Some(b)) => (a, b),
    };

    let cleaned = if first == '.' && second == '/' {
        if keep_leading_slash {
            &path[1..]
        } else {
            &path[2..]
        }
    } else if first == '/' && !keep_leading_slash {
        &path[1..]
    } else {
        path
    };

    Ok(Some(cleaned.to_string()))
}
