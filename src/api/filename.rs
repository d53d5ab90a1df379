//! Filename derivation for downloaded attachments.
//!
//! Resolution order: `Content-Disposition`, then the URL's last path segment,
//! then an image extension taken from `Content-Type` when the URL lacks one.

use std::path::{Component, Path};

use url::Url;

/// Name used when neither the headers nor the URL yield one.
const FALLBACK_NAME: &str = "download";

/// Derives the filename for a fetched file.
///
/// # Examples
///
/// ```
/// use room_export::api::resolve_file_name;
///
/// let name = resolve_file_name(
///     "https://example.com/contents/xyz123",
///     None,
///     Some("image/gif"),
/// );
/// assert_eq!(name, "xyz123.gif");
/// ```
#[must_use]
pub fn resolve_file_name(
    url: &str,
    content_disposition: Option<&str>,
    content_type: Option<&str>,
) -> String {
    if let Some(name) = content_disposition
        .and_then(parse_content_disposition)
        .filter(|name| !name.trim().is_empty())
    {
        return name;
    }

    let mut name = name_from_url(url).unwrap_or_else(|| FALLBACK_NAME.to_string());
    if let Some(ext) = content_type.and_then(image_extension)
        && !has_extension(&name, ext)
    {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Parses Content-Disposition header to extract filename.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987, preferred when present)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    // Parameter names are case-insensitive; ASCII lowering keeps byte offsets.
    let lowered = header.to_ascii_lowercase();

    if let Some(pos) = lowered.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    if let Some(pos) = lowered.find("filename=") {
        let value = header[pos + 9..].trim();

        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                return Some(stripped[..end].to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim();
            if !filename.is_empty() {
                return Some(filename.to_string());
            }
        }
    }

    None
}

/// Last non-empty path segment of `url`, percent-decoded. Query strings are ignored.
fn name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())?;
    let decoded = urlencoding::decode(last).map_or_else(|_| last.to_string(), |d| d.into_owned());
    (!decoded.is_empty()).then_some(decoded)
}

/// Extension for image content types, without the dot.
fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "image/gif" => Some("gif"),
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/tiff" => Some("tiff"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    let Some(actual) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let actual = actual.to_ascii_lowercase();
    actual == ext
        || (ext == "jpg" && actual == "jpeg")
        || (ext == "tiff" && actual == "tif")
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) and rewrites bare dot segments.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return FALLBACK_NAME.to_string();
    }

    if is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== resolve_file_name ====================

    #[test]
    fn test_disposition_wins_over_url() {
        let name = resolve_file_name(
            "https://example.com/contents/abc/other.bin?x=1",
            Some(r#"attachment; filename="a.png""#),
            Some("image/gif"),
        );
        assert_eq!(name, "a.png");
    }

    #[test]
    fn test_gif_extension_appended_to_bare_segment() {
        let name = resolve_file_name("https://example.com/v1/contents/xyz123", None, Some("image/gif"));
        assert_eq!(name, "xyz123.gif");
    }

    #[test]
    fn test_extension_not_duplicated() {
        let name = resolve_file_name("https://example.com/files/photo.GIF", None, Some("image/gif"));
        assert_eq!(name, "photo.GIF");

        let name = resolve_file_name("https://example.com/files/photo.jpeg", None, Some("image/jpeg"));
        assert_eq!(name, "photo.jpeg");
    }

    #[test]
    fn test_non_image_content_type_leaves_name() {
        let name = resolve_file_name("https://example.com/files/report", None, Some("application/pdf"));
        assert_eq!(name, "report");
    }

    #[test]
    fn test_url_segment_is_decoded_and_query_ignored() {
        let name = resolve_file_name("https://example.com/files/my%20notes.txt?sig=abc", None, None);
        assert_eq!(name, "my notes.txt");
    }

    #[test]
    fn test_trailing_slash_uses_previous_segment() {
        let name = resolve_file_name("https://example.com/files/abc/", None, None);
        assert_eq!(name, "abc");
    }

    #[test]
    fn test_unparseable_url_falls_back() {
        let name = resolve_file_name("not a url", None, Some("image/png"));
        assert_eq!(name, "download.png");
    }

    #[test]
    fn test_blank_disposition_filename_ignored() {
        let name = resolve_file_name("https://example.com/f/real.txt", Some(r#"attachment; filename="""#), None);
        assert_eq!(name, "real.txt");
    }

    // ==================== parse_content_disposition ====================

    #[test]
    fn test_parse_content_disposition_quoted() {
        let header = r#"attachment; filename="example.pdf""#;
        assert_eq!(parse_content_disposition(header), Some("example.pdf".to_string()));
    }

    #[test]
    fn test_parse_content_disposition_unquoted_with_trailing_param() {
        let header = "attachment; filename=example.pdf; size=1234";
        assert_eq!(parse_content_disposition(header), Some("example.pdf".to_string()));
    }

    #[test]
    fn test_parse_content_disposition_rfc5987_preferred() {
        let header = "attachment; filename=\"fallback.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf";
        assert_eq!(parse_content_disposition(header), Some("résumé.pdf".to_string()));
    }

    #[test]
    fn test_parse_content_disposition_case_insensitive() {
        let header = r#"Attachment; FileName="Upper.PNG""#;
        assert_eq!(parse_content_disposition(header), Some("Upper.PNG".to_string()));
    }

    #[test]
    fn test_parse_content_disposition_missing() {
        assert_eq!(parse_content_disposition("inline"), None);
    }

    // ==================== sanitize_filename ====================

    #[test]
    fn test_sanitize_filename_removes_invalid_chars() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j.png"), "a_b_c_d_e_f_g_h_i_j.png");
    }

    #[test]
    fn test_sanitize_filename_rewrites_dot_segments() {
        assert_eq!(sanitize_filename("."), "_");
        assert_eq!(sanitize_filename(".."), "__");
    }

    #[test]
    fn test_sanitize_filename_empty_falls_back() {
        assert_eq!(sanitize_filename("   "), "download");
    }

    #[test]
    fn test_sanitize_filename_preserves_unicode() {
        assert_eq!(sanitize_filename("日本語 (1).pdf"), "日本語 (1).pdf");
    }
}
