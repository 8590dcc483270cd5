use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::{ClipBatchError, Result};
use crate::media::{MediaCommand, MediaCommandBuilder, OutputTiming};
use crate::paths::ResolvedPaths;
use crate::request::{self, OperationSpec, SpeedFactor};

/// Everything the job runner needs to execute one ffmpeg job.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub job_id: Uuid,
    pub description: String,
    pub command: MediaCommand,
    pub output_file_name: String,
    pub output_path: PathBuf,
    /// Concat manifest written before the job and removed after it
    pub list_artifact: Option<ListArtifact>,
    /// `None` when the output length cannot be predicted
    pub timing: Option<OutputTiming>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListArtifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Per-request values shared by every invocation of a batch.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub batch_id: Uuid,
    /// Epoch milliseconds stamped into output file names
    pub stamp_millis: i64,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl InvocationContext {
    pub fn new(paths: ResolvedPaths) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            stamp_millis: Utc::now().timestamp_millis(),
            working_dir: paths.working_dir,
            output_dir: paths.output_dir,
        }
    }

    /// Concat manifest path, keyed by batch so concurrent merges never share it
    pub fn list_artifact_path(&self) -> PathBuf {
        self.output_dir.join(format!("videolist-{}.txt", self.batch_id))
    }
}

/// Translates validated operations into ffmpeg invocations. Performs no I/O.
#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    commands: MediaCommandBuilder,
}

impl InvocationBuilder {
    pub fn new(config: MediaConfig) -> Self {
        Self {
            commands: MediaCommandBuilder::new(config),
        }
    }

    /// Build the invocation joining `items` in order into one file.
    pub fn merge(&self, ctx: &InvocationContext, items: &[String]) -> Result<Invocation> {
        if items.len() < 2 {
            return Err(ClipBatchError::invalid_request(
                "At least two videos are required to merge",
            ));
        }
        for item in items {
            request::validate_item_name(item)?;
        }

        let list_path = ctx.list_artifact_path();
        let contents = concat_manifest(&ctx.working_dir, items);
        let output_file_name = format!("merged-{}.mp4", ctx.stamp_millis);
        let output_path = ctx.output_dir.join(&output_file_name);
        let description = format!("Merge {} videos", items.len());
        let mut command = self.commands.merge(list_path.as_path(), output_path.as_path());
        command.description = description.clone();

        Ok(Invocation {
            job_id: Uuid::new_v4(),
            description,
            command,
            output_file_name,
            output_path,
            list_artifact: Some(ListArtifact {
                path: list_path,
                contents,
            }),
            timing: None,
        })
    }

    pub fn trim(
        &self,
        ctx: &InvocationContext,
        item: &str,
        start: f64,
        duration: f64,
    ) -> Result<Invocation> {
        if !start.is_finite() || start < 0.0 || !duration.is_finite() || duration <= 0.0 {
            return Err(ClipBatchError::invalid_request(format!(
                "Invalid trim window: start {}s, duration {}s",
                start, duration
            )));
        }
        let input_path = ctx.working_dir.join(item);
        let output_file_name = output_file_name("trimmed", ctx.stamp_millis, item);
        let output_path = ctx.output_dir.join(&output_file_name);
        let command = self
            .commands
            .trim(input_path.as_path(), output_path.as_path(), start, duration);

        Ok(single(
            format!("Trim {}", item),
            command,
            output_file_name,
            output_path,
            OutputTiming::window(start, duration),
        ))
    }

    pub fn speedup(&self, ctx: &InvocationContext, item: &str, factor: SpeedFactor) -> Invocation {
        let input_path = ctx.working_dir.join(item);
        let prefix = format!("{}x", factor.value());
        let output_file_name = output_file_name(&prefix, ctx.stamp_millis, item);
        let output_path = ctx.output_dir.join(&output_file_name);
        let command = self
            .commands
            .speedup(input_path.as_path(), output_path.as_path(), factor);

        single(
            format!("Speed up {} by {}x", item, factor.value()),
            command,
            output_file_name,
            output_path,
            OutputTiming::scaled(1.0 / f64::from(factor.value())),
        )
    }

    pub fn timelapse(&self, ctx: &InvocationContext, item: &str, fps: u32) -> Result<Invocation> {
        if fps == 0 {
            return Err(ClipBatchError::invalid_request(
                "targetFps must be a positive integer, got 0",
            ));
        }
        let input_path = ctx.working_dir.join(item);
        let prefix = format!("timelapse-{}fps", fps);
        let output_file_name = output_file_name(&prefix, ctx.stamp_millis, item);
        let output_path = ctx.output_dir.join(&output_file_name);
        let command = self
            .commands
            .timelapse(input_path.as_path(), output_path.as_path(), fps);

        Ok(single(
            format!("Timelapse {} at {}fps", item, fps),
            command,
            output_file_name,
            output_path,
            OutputTiming::scaled(1.0 / f64::from(fps)),
        ))
    }

    /// Build the invocation for one item of a single-input operation.
    pub fn for_item(
        &self,
        ctx: &InvocationContext,
        spec: &OperationSpec,
        item: &str,
    ) -> Result<Invocation> {
        match *spec {
            OperationSpec::Trim { start, duration } => self.trim(ctx, item, start, duration),
            OperationSpec::Speedup { factor } => Ok(self.speedup(ctx, item, factor)),
            OperationSpec::Timelapse { fps } => self.timelapse(ctx, item, fps),
            OperationSpec::Merge => Err(ClipBatchError::invalid_request(
                "Merge combines all items into one job and cannot run per item",
            )),
        }
    }
}

fn single(
    description: String,
    mut command: MediaCommand,
    output_file_name: String,
    output_path: PathBuf,
    timing: OutputTiming,
) -> Invocation {
    command.description = description.clone();
    Invocation {
        job_id: Uuid::new_v4(),
        description,
        command,
        output_file_name,
        output_path,
        list_artifact: None,
        timing: Some(timing),
    }
}

/// `<prefix>-<epoch-millis>-<original>`. Two jobs stamped in the same millisecond
/// for the same original name produce the same file name.
pub fn output_file_name(prefix: &str, stamp_millis: i64, original: &str) -> String {
    format!("{}-{}-{}", prefix, stamp_millis, original)
}

/// One `file '<absolute path>'` line per item, in order.
pub fn concat_manifest(working_dir: &Path, items: &[String]) -> String {
    items
        .iter()
        .map(|item| {
            let path = working_dir.join(item);
            // concat demuxer quoting: close the quote, escape, reopen
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'", escaped)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
