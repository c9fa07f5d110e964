//! On-disk naming
//!
//! Layout: `{root}/{userName}-{userId}/{title}-{artworkId}/{title}-{artworkId}-{n}.{jpg|png}`.
//! Every name derived from remote data is sanitized before it touches the
//! filesystem.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Characters not allowed in a path segment on common filesystems
pub const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces every illegal character in one path segment with `_`
///
/// ```
/// use pixiv_dl::download::sanitize_component;
///
/// assert_eq!(sanitize_component("a/b:c?"), "a_b_c_");
/// ```
pub fn sanitize_component(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Sanitizes every normal segment of `path`, leaving roots and drive prefixes
pub fn sanitize_path(path: &Path) -> PathBuf {
    path.components()
        .map(|component| match component {
            Component::Normal(segment) => {
                OsString::from(sanitize_component(&segment.to_string_lossy()))
            }
            other => other.as_os_str().to_os_string(),
        })
        .collect()
}

/// `jpg` when the URL ends in `.jpg` (any case), otherwise `png`
pub fn image_extension(url: &str) -> &'static str {
    if url.to_ascii_lowercase().ends_with(".jpg") {
        "jpg"
    } else {
        "png"
    }
}

/// Appends the extension matching `url` to the file name of `path`
///
/// Unlike [`Path::with_extension`], dots already in the name are kept.
pub fn with_image_extension(path: &Path, url: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(image_extension(url));
    path.with_file_name(name)
}

/// Destination folder of one artwork
pub fn artwork_folder(
    root: &Path,
    user_name: &str,
    user_id: &str,
    title: &str,
    artwork_id: &str,
) -> PathBuf {
    root.join(sanitize_component(&format!("{}-{}", user_name, user_id)))
        .join(sanitize_component(&format!("{}-{}", title, artwork_id)))
}

/// File stem of the `index`-th (1-based) image of an artwork
pub fn image_stem(title: &str, artwork_id: &str, index: usize) -> String {
    sanitize_component(&format!("{}-{}-{}", title, artwork_id, index))
}
