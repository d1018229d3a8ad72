//! Source URL validation and upload filename derivation.

use percent_encoding::percent_decode_str;

use crate::error::RelayError;

/// Upload name used when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Longest name we hand to a destination (Linux NAME_MAX).
const NAME_MAX: usize = 255;

/// Trims and validates a submitted source URL. Only absolute http(s) URLs
/// with a host are accepted.
pub fn validate_source_url(raw: &str) -> Result<String, RelayError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RelayError::Validation("URL is empty".to_string()));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| RelayError::Validation(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RelayError::Validation(format!(
            "{trimmed}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::Validation(format!("{trimmed}: missing host")));
    }
    Ok(trimmed.to_string())
}

/// Splits a newline-separated submission into validated URLs, skipping blank lines.
/// Fails on the first invalid line, or when no URL remains.
pub fn parse_submission(text: &str) -> Result<Vec<String>, RelayError> {
    let urls = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(validate_source_url)
        .collect::<Result<Vec<_>, _>>()?;
    if urls.is_empty() {
        return Err(RelayError::Validation("no URL submitted".to_string()));
    }
    Ok(urls)
}

/// Name under which the downloaded payload is uploaded: the last URL path
/// segment (percent-decoded), made safe for a filesystem.
///
/// - `upload_file_name("https://example.com/a/b.iso")` → `"b.iso"`
/// - `upload_file_name("https://example.com/")` → `"download.bin"`
pub fn upload_file_name(source_url: &str) -> String {
    let segment = url::Url::parse(source_url).ok().and_then(|u| {
        u.path_segments()?
            .filter(|s| !s.is_empty())
            .last()
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
    });
    let cleaned = segment.map(|s| sanitize(&s)).unwrap_or_default();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// Replaces separators, NUL and control characters with `_`, collapses runs
/// of `_`, strips leading/trailing dots and underscores, caps length.
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
