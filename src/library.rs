use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{ClipBatchError, Result};

/// A video file offered to the user for selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// List files directly inside `dir` whose extension matches `extension`
/// (case-insensitive), sorted by name.
///
/// Unreadable metadata is logged and reported as size 0 created "now".
pub async fn list_videos<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<VideoEntry>> {
    let dir = dir.as_ref();
    let suffix = format!(".{}", extension.trim_start_matches('.').to_lowercase());
    let mut videos = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let message = format!("Could not read video directory: {}", dir.display());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(ClipBatchError::file_system(message, source));
            }
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.to_lowercase().ends_with(&suffix) {
            continue;
        }

        let video = match entry.metadata() {
            Ok(metadata) => VideoEntry {
                name,
                size: metadata.len(),
                created_at: metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
            },
            Err(e) => {
                warn!("Error reading file stats for {}: {}", name, e);
                VideoEntry {
                    name,
                    size: 0,
                    created_at: Utc::now(),
                }
            }
        };
        videos.push(video);
    }

    info!("Found {} video files in {}", videos.len(), dir.display());
    Ok(videos)
}
