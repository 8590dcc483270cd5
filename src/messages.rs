//! User-facing message table.
//!
//! The core only deals in [`ErrorKind`] and [`OperationKind`]; the strings shown to
//! users live here, keyed by those values. English message ids double as gettext
//! msgids, so a compiled `.mo` catalog can translate them without code changes.

use gettext::Catalog;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::{ClipBatchError, ErrorKind, Result};
use crate::request::OperationKind;

pub struct MessageCatalog {
    catalog: Catalog,
}

impl MessageCatalog {
    /// Untranslated (English) messages
    pub fn new() -> Self {
        Self {
            catalog: Catalog::empty(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClipBatchError::file_system(
                format!("Failed to open message catalog {}", path.display()),
                e,
            )
        })?;
        let catalog = Catalog::parse(file)
            .map_err(|e| ClipBatchError::Catalog(format!("{}: {}", path.display(), e)))?;
        info!("Loaded message catalog from {}", path.display());
        Ok(Self { catalog })
    }

    /// Headline for a failed operation
    pub fn failure(&self, kind: ErrorKind, operation: OperationKind) -> String {
        self.catalog.gettext(failure_msgid(kind, operation)).to_string()
    }

    /// Headline for a request rejected before its operation could be determined
    pub fn invalid_request(&self) -> String {
        self.catalog.gettext(INVALID_REQUEST).to_string()
    }

    /// Headline for a successful operation
    pub fn success(&self, operation: OperationKind) -> String {
        self.catalog.gettext(success_msgid(operation)).to_string()
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

const INVALID_REQUEST: &str = "The request is invalid";

fn failure_msgid(kind: ErrorKind, operation: OperationKind) -> &'static str {
    match (kind, operation) {
        (ErrorKind::InvalidRequest, _) => INVALID_REQUEST,
        (ErrorKind::IoFailure, _) => "Could not access the video files",
        (ErrorKind::ToolExecutionFailure, OperationKind::Merge) => "Merging failed",
        (ErrorKind::ToolExecutionFailure, OperationKind::Trim) => "Trimming failed",
        (ErrorKind::ToolExecutionFailure, OperationKind::Speedup) => "Speed change failed",
        (ErrorKind::ToolExecutionFailure, OperationKind::Timelapse) => "Timelapse failed",
    }
}

fn success_msgid(operation: OperationKind) -> &'static str {
    match operation {
        OperationKind::Merge => "Merge successful",
        OperationKind::Trim => "Trim successful",
        OperationKind::Speedup => "Speed change successful",
        OperationKind::Timelapse => "Timelapse successful",
    }
}
