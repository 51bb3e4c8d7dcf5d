//! Accepted media format classification.
//!
//! The accepted set travels with the run settings; these helpers match URL
//! path suffixes and response content-types against it.

/// Map a MIME type to a known file extension.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "video/webm" => Some("webm"),
        _ => None,
    }
}

/// Extension of the last path segment, without query or fragment noise.
pub fn path_extension(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// Whether a URL path ends in an accepted extension.
pub fn is_accepted_path(path: &str, formats: &[String]) -> bool {
    path_extension(path)
        .map(|ext| formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Whether a content-type maps to an accepted extension.
pub fn is_accepted_mime(mime: &str, formats: &[String]) -> bool {
    extension_for_mime(mime)
        .map(|ext| formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> Vec<String> {
        vec!["webp".to_string(), "gif".to_string()]
    }

    #[test]
    fn mime_table() {
        assert_eq!(extension_for_mime("image/webp"), Some("webp"));
        assert_eq!(extension_for_mime("image/gif; charset=binary"), Some("gif"));
        assert_eq!(extension_for_mime("video/webm"), Some("webm"));
        assert_eq!(extension_for_mime("text/html"), None);
    }

    #[test]
    fn path_suffix_match() {
        assert!(is_accepted_path("/emotes/a.webp", &formats()));
        assert!(is_accepted_path("/b.GIF", &formats()));
        assert!(!is_accepted_path("/page.html", &formats()));
        assert!(!is_accepted_path("/no-extension", &formats()));
        assert!(!is_accepted_path("/.gitignore/", &formats()));
    }

    #[test]
    fn mime_match_respects_accepted_set() {
        assert!(is_accepted_mime("image/webp", &formats()));
        // webm maps to a known extension but is not in this run's set.
        assert!(!is_accepted_mime("video/webm", &formats()));
        assert!(!is_accepted_mime("text/html", &formats()));
    }
}
