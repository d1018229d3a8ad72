//! Shared curl plumbing for the upload and notification clients.

use std::path::Path;
use std::time::Duration;

use crate::error::RelayError;

/// Status code and body of a completed request.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connect timeout for every outbound request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Transfers slower than this many bytes/s for [`LOW_SPEED_TIME`] are aborted.
const LOW_SPEED_LIMIT: u32 = 1024;
const LOW_SPEED_TIME: Duration = Duration::from_secs(60);

/// Easy handle with the limits every outbound request uses. No overall
/// deadline is set; a stalled transfer trips the low-speed limit instead.
pub(crate) fn easy(url: &str) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(CONNECT_TIMEOUT)?;
    easy.low_speed_limit(LOW_SPEED_LIMIT)?;
    easy.low_speed_time(LOW_SPEED_TIME)?;
    Ok(easy)
}

pub(crate) fn headers(lines: &[String]) -> Result<curl::easy::List, curl::Error> {
    let mut list = curl::easy::List::new();
    for line in lines {
        list.append(line)?;
    }
    Ok(list)
}

/// Runs the request and collects the response body in memory.
pub(crate) fn perform(mut easy: curl::easy::Easy) -> Result<HttpResponse, RelayError> {
    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let status = easy.response_code()?;
    Ok(HttpResponse { status, body })
}

/// POST `path` as the multipart field `file`, named `file_name`.
pub(crate) fn post_file(
    mut easy: curl::easy::Easy,
    path: &Path,
    file_name: &str,
) -> Result<HttpResponse, RelayError> {
    let mut form = curl::easy::Form::new();
    form.part("file")
        .file(path)
        .filename(file_name)
        .add()
        .map_err(|e| {
            RelayError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("build upload form: {e}"),
            ))
        })?;
    easy.httppost(form)?;
    perform(easy)
}

/// POST a JSON body.
pub(crate) fn post_json(
    mut easy: curl::easy::Easy,
    body: &serde_json::Value,
    mut extra_headers: Vec<String>,
) -> Result<HttpResponse, RelayError> {
    let payload = body.to_string();
    extra_headers.push("Content-Type: application/json".to_string());
    easy.http_headers(headers(&extra_headers)?)?;
    easy.post(true)?;
    easy.post_fields_copy(payload.as_bytes())?;
    perform(easy)
}

/// First 200 bytes of a body, for error messages.
pub(crate) fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
