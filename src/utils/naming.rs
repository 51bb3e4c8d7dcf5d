//! Filename resolution: sanitization, extension selection, collision probing.

use std::path::{Path, PathBuf};

use url::Url;

use super::formats;

/// Characters that are illegal in filenames on at least one supported
/// filesystem; replaced with `_` together with all control characters.
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Percent-decode and strip a raw name down to something filesystem-safe.
///
/// May return an empty string; callers substitute a fallback name.
pub fn sanitize_name(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let mut out = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        if ch.is_control() || UNSAFE_CHARS.contains(&ch) {
            // Collapse runs so `a//b` becomes `a_b`, not `a__b`.
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(ch);
        }
    }

    out.trim().trim_matches('.').trim().to_string()
}

/// Resolve the filename for one download.
///
/// Prefers the strategy's name hint, falls back to the URL's last path
/// segment, then to `image_<fallback_index>`. The extension comes from the
/// URL path when it is an accepted format, else from the content-type,
/// else `.bin`.
pub fn resolve_filename(
    url: &Url,
    content_type: Option<&str>,
    name_hint: Option<&str>,
    fallback_index: usize,
    accepted_formats: &[String],
) -> String {
    let mut name = name_hint
        .map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            let last = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or("");
            sanitize_name(last)
        });

    if name.is_empty() {
        name = format!("image_{}", fallback_index);
    }

    let extension = formats::path_extension(url.path())
        .filter(|ext| accepted_formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
        .map(|ext| ext.to_ascii_lowercase())
        .or_else(|| {
            content_type
                .and_then(formats::extension_for_mime)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string());

    let suffix = format!(".{}", extension);
    if !name.to_ascii_lowercase().ends_with(&suffix) {
        name.push_str(&suffix);
    }
    name
}

/// Probe `name`, `name_2`, `name_3`, ... until an unused path is found.
///
/// The path is checked at call time, not reserved; callers must serialize
/// path allocation (the executor downloads sequentially).
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
        _ => (filename.to_string(), String::new()),
    };

    let mut candidate = dir.join(filename);
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}{}", stem, n, ext));
        n += 1;
    }
    candidate
}
