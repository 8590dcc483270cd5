//! Clipbatch - Batch Video Transformation
//!
//! Merges, trims, speeds up and timelapses batches of video files by
//! driving ffmpeg, one job at a time, with progress reporting and
//! structured success/failure results.

pub mod batch;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod invocation;
pub mod library;
pub mod media;
pub mod messages;
pub mod paths;
pub mod report;
pub mod request;
pub mod runner;
pub mod workflow;
