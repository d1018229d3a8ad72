//! Gofile: `POST {upload_url}` multipart, optional bearer token.
//! Success body: `{"status": "ok", "data": {"downloadPage": "https://gofile.io/d/.."}}`.

use serde::Deserialize;
use std::path::Path;

use super::Destination;
use crate::error::RelayError;
use crate::http;

const NAME: &str = "gofile";

pub struct Gofile {
    upload_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    #[serde(default)]
    download_page: Option<String>,
}

impl Gofile {
    pub fn new(upload_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            token,
        }
    }
}

fn parse(status: u32, body: &[u8]) -> Result<String, RelayError> {
    if !(200..300).contains(&status) {
        return Err(RelayError::http_status(NAME, status));
    }
    let resp: UploadResponse = serde_json::from_slice(body)
        .map_err(|e| RelayError::malformed(NAME, format!("{e}: {}", http::snippet(body))))?;
    if resp.status != "ok" {
        return Err(RelayError::rejected(NAME, format!("status {}", resp.status)));
    }
    resp.data
        .and_then(|d| d.download_page)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| RelayError::malformed(NAME, "response has no downloadPage"))
}

impl Destination for Gofile {
    fn name(&self) -> &'static str {
        NAME
    }

    fn upload(&self, path: &Path, file_name: &str) -> Result<String, RelayError> {
        let mut easy = http::easy(&self.upload_url)?;
        if let Some(token) = &self.token {
            easy.http_headers(http::headers(&[format!("Authorization: Bearer {token}")])?)?;
        }
        let resp = http::post_file(easy, path, file_name)?;
        parse(resp.status, &resp.body)
    }
}
