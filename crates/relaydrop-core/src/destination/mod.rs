//! Destination file hosts that downloaded payloads are relayed to.
//!
//! Uploads are blocking curl calls; the relay runs them on a blocking thread.
//! A non-success answer or a body without a link fails the whole job. Nothing
//! is retried.

mod gofile;
mod pixeldrain;

pub use gofile::Gofile;
pub use pixeldrain::Pixeldrain;

use std::path::Path;
use std::sync::Arc;

use crate::config::{DestinationKind, RelayConfig};
use crate::error::RelayError;

pub trait Destination: Send + Sync {
    /// Short service name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Upload the file at `path` as `file_name` and return its public link.
    fn upload(&self, path: &Path, file_name: &str) -> Result<String, RelayError>;
}

/// Builds the destination selected in the config.
pub fn from_config(cfg: &RelayConfig) -> Arc<dyn Destination> {
    match cfg.destination {
        DestinationKind::Pixeldrain => Arc::new(Pixeldrain::new(
            cfg.pixeldrain.base_url.clone(),
            cfg.pixeldrain.api_key.clone(),
        )),
        DestinationKind::Gofile => Arc::new(Gofile::new(
            cfg.gofile.upload_url.clone(),
            cfg.gofile.token.clone(),
        )),
    }
}
