use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::error::{ClipBatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Merge,
    Trim,
    Speedup,
    Timelapse,
}

impl OperationKind {
    /// Label used to derive the default output directory (`<label>_output`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Merge => "merged",
            Self::Trim => "trimmed",
            Self::Speedup => "speedup",
            Self::Timelapse => "timelapse",
        }
    }

    /// Whether the operation runs once per item through the batch sequencer.
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Speedup | Self::Timelapse)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Merge => "merge",
            Self::Trim => "trim",
            Self::Speedup => "speedup",
            Self::Timelapse => "timelapse",
        };
        f.write_str(name)
    }
}

/// A batch transformation request as handed over by the caller.
///
/// Parameters are kept loosely typed here so that out-of-range values are reported
/// as invalid requests by [`TransformRequest::validate`] rather than as parse errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub operation: OperationKind,
    #[serde(default, alias = "folder")]
    pub source_directory: Option<PathBuf>,
    #[serde(default)]
    pub output_directory: Option<PathBuf>,
    #[serde(default, alias = "videos")]
    pub items: Vec<String>,
    #[serde(flatten)]
    pub parameters: OperationParameters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_factor: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_duration: Option<f64>,
}

/// Playback speed multipliers supported by speedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedFactor {
    X2,
    X4,
    X8,
}

impl SpeedFactor {
    pub fn value(&self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
        }
    }

    /// Number of chained `atempo=2.0` stages needed to reach this factor.
    pub fn tempo_stages(&self) -> usize {
        match self {
            Self::X2 => 1,
            Self::X4 => 2,
            Self::X8 => 3,
        }
    }
}

impl TryFrom<i64> for SpeedFactor {
    type Error = ClipBatchError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            8 => Ok(Self::X8),
            other => Err(ClipBatchError::invalid_request(format!(
                "Invalid speed factor {}. Allowed: 2, 4, 8",
                other
            ))),
        }
    }
}

/// Fully validated operation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationSpec {
    Merge,
    Trim { start: f64, duration: f64 },
    Speedup { factor: SpeedFactor },
    Timelapse { fps: u32 },
}

impl TransformRequest {
    pub fn new(
        operation: OperationKind,
        source_directory: impl Into<PathBuf>,
        items: Vec<String>,
    ) -> Self {
        Self {
            operation,
            source_directory: Some(source_directory.into()),
            output_directory: None,
            items,
            parameters: OperationParameters::default(),
        }
    }

    /// Check the request before anything touches the disk and resolve defaults
    /// from the configuration.
    pub fn validate(&self, config: &Config) -> Result<OperationSpec> {
        if self.items.is_empty() {
            return Err(ClipBatchError::invalid_request("No videos selected"));
        }
        for item in &self.items {
            validate_item_name(item)?;
        }

        match self.operation {
            OperationKind::Merge => {
                if self.items.len() < 2 {
                    return Err(ClipBatchError::invalid_request(
                        "At least two videos are required to merge",
                    ));
                }
                Ok(OperationSpec::Merge)
            }
            OperationKind::Trim => {
                if self.items.len() != 1 {
                    return Err(ClipBatchError::invalid_request(format!(
                        "Trim takes exactly one video, got {}",
                        self.items.len()
                    )));
                }
                let start = self.parameters.trim_start.unwrap_or(config.trim.default_start);
                let duration = self
                    .parameters
                    .trim_duration
                    .unwrap_or(config.trim.default_duration);
                if !start.is_finite() || start < 0.0 {
                    return Err(ClipBatchError::invalid_request(format!(
                        "trimStart must be a non-negative number of seconds, got {}",
                        start
                    )));
                }
                if !duration.is_finite() || duration <= 0.0 {
                    return Err(ClipBatchError::invalid_request(format!(
                        "trimDuration must be a positive number of seconds, got {}",
                        duration
                    )));
                }
                Ok(OperationSpec::Trim { start, duration })
            }
            OperationKind::Speedup => {
                let factor = self
                    .parameters
                    .speed_factor
                    .as_ref()
                    .ok_or_else(|| ClipBatchError::invalid_request("speedFactor is required"))?;
                Ok(OperationSpec::Speedup {
                    factor: SpeedFactor::try_from(whole_number("speedFactor", factor)?)?,
                })
            }
            OperationKind::Timelapse => {
                let fps = match &self.parameters.target_fps {
                    Some(fps) => whole_number("targetFps", fps)?,
                    None => i64::from(config.timelapse.default_fps),
                };
                let fps = u32::try_from(fps)
                    .ok()
                    .filter(|fps| *fps > 0)
                    .ok_or_else(|| {
                        ClipBatchError::invalid_request(format!(
                            "targetFps must be a positive integer, got {}",
                            fps
                        ))
                    })?;
                Ok(OperationSpec::Timelapse { fps })
            }
        }
    }
}

/// Integral JSON number; `4.0` is accepted, `2.5` is not.
fn whole_number(field: &str, value: &Number) -> Result<i64> {
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|v| v.fract() == 0.0 && v.abs() <= i64::MAX as f64)
                .map(|v| v as i64)
        })
        .ok_or_else(|| {
            ClipBatchError::invalid_request(format!(
                "{} must be an integer, got {}",
                field, value
            ))
        })
}

/// Items are file names inside the source directory, never paths. Control
/// characters are refused so a name always stays on one concat list line.
pub(crate) fn validate_item_name(item: &str) -> Result<()> {
    if item.chars().any(char::is_control) {
        return Err(ClipBatchError::invalid_request(format!(
            "Invalid video name {:?}: control characters are not allowed",
            item
        )));
    }
    let mut components = Path::new(item).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ClipBatchError::invalid_request(format!(
            "Invalid video name '{}': expected a plain file name",
            item
        ))),
    }
}
