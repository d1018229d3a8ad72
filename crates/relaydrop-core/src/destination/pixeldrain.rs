//! Pixeldrain: `POST {base}/api/file` multipart, API key as basic-auth password.
//! Success body: `{"success": true, "id": "abc123"}`.

use serde::Deserialize;
use std::path::Path;

use super::Destination;
use crate::error::RelayError;
use crate::http;

const NAME: &str = "pixeldrain";

pub struct Pixeldrain {
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl Pixeldrain {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn link_for(&self, id: &str) -> String {
        format!("{}/u/{}", self.base_url, id)
    }

    fn parse(&self, status: u32, body: &[u8]) -> Result<String, RelayError> {
        if !(200..300).contains(&status) {
            // Error bodies carry {"success":false,"value":..,"message":..}; keep the message.
            return Err(match serde_json::from_slice::<UploadResponse>(body) {
                Ok(r) if r.message.is_some() => RelayError::Upstream {
                    origin: NAME,
                    status: Some(status),
                    detail: format!("returned HTTP {status}: {}", r.message.unwrap_or_default()),
                },
                _ => RelayError::http_status(NAME, status),
            });
        }
        let resp: UploadResponse = serde_json::from_slice(body)
            .map_err(|e| RelayError::malformed(NAME, format!("{e}: {}", http::snippet(body))))?;
        if !resp.success {
            let reason = resp
                .message
                .or(resp.value)
                .unwrap_or_else(|| "upload not accepted".to_string());
            return Err(RelayError::rejected(NAME, reason));
        }
        match resp.id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(self.link_for(&id)),
            None => Err(RelayError::malformed(NAME, "response has no file id")),
        }
    }
}

impl Destination for Pixeldrain {
    fn name(&self) -> &'static str {
        NAME
    }

    fn upload(&self, path: &Path, file_name: &str) -> Result<String, RelayError> {
        let mut easy = http::easy(&format!("{}/api/file", self.base_url))?;
        if let Some(key) = &self.api_key {
            easy.username("")?;
            easy.password(key)?;
        }
        let resp = http::post_file(easy, path, file_name)?;
        self.parse(resp.status, &resp.body)
    }
}
