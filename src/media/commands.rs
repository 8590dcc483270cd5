use std::path::Path;

use crate::config::{MediaConfig, MergeMode};
use crate::request::SpeedFactor;

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Read the input through the concat demuxer; the list may hold absolute paths
    pub fn concat_input<P: AsRef<Path>>(self, list_path: P) -> Self {
        self.arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(list_path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn log_level<S: Into<String>>(self, level: S) -> Self {
        self.arg("-loglevel").arg(level)
    }

    /// Suppress the copyright and build configuration banner
    pub fn hide_banner(self) -> Self {
        self.arg("-hide_banner")
    }

    /// Emit machine-readable progress (key=value lines) on stderr
    pub fn progress_to_stderr(self) -> Self {
        self.arg("-nostats").arg("-progress").arg("pipe:2")
    }

    /// Start reading the input at `seconds`
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(format_seconds(seconds))
    }

    /// Limit the output to `seconds`
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format_seconds(seconds))
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn audio_bitrate(self, kbps: u32) -> Self {
        self.arg("-b:a").arg(format!("{}k", kbps))
    }

    /// Copy every stream without re-encoding
    pub fn copy_streams(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add video filter graph
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter:v").arg(filter)
    }

    /// Add audio filter graph
    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter:a").arg(filter)
    }

    /// Force the output frame rate
    pub fn frame_rate(self, fps: u32) -> Self {
        self.arg("-r").arg(fps.to_string())
    }

    /// Encode video with the given encoder, speed preset and constant quality target
    pub fn encode_video<S: Into<String>>(self, codec: S, preset: &str, crf: u8) -> Self {
        self.video_codec(codec)
            .arg("-preset")
            .arg(preset)
            .arg("-crf")
            .arg(crf.to_string())
    }

    /// Move the moov atom to the front of the file
    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Shell-like rendering for logs and start signals
    pub fn command_line(&self) -> String {
        std::iter::once(self.binary_path.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for the ffmpeg invocations behind each batch operation
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    config: MediaConfig,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Common prologue: overwrite, log level and progress reporting
    pub fn custom<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, description)
            .overwrite()
            .hide_banner()
            .log_level(&self.config.log_level)
            .progress_to_stderr()
    }

    /// Append user-specified extra options and the output path
    fn finish<P: AsRef<Path>>(&self, cmd: MediaCommand, output_path: P) -> MediaCommand {
        cmd.args(self.config.extra_args.iter().cloned())
            .output(output_path)
    }

    /// Build concat-demuxer merge command
    pub fn merge<P: AsRef<Path>>(&self, list_path: P, output_path: P) -> MediaCommand {
        let cmd = self.custom("Merge").concat_input(list_path);
        let cmd = match self.config.merge_mode {
            MergeMode::Copy => cmd.copy_streams(),
            MergeMode::Reencode => cmd
                .encode_video(&self.config.video_codec, &self.config.preset, self.config.crf)
                .audio_codec(&self.config.audio_codec)
                .audio_bitrate(self.config.audio_bitrate_kbps)
                .faststart(),
        };
        self.finish(cmd, output_path)
    }

    /// Build trim command: video copied verbatim, audio re-encoded
    pub fn trim<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        start: f64,
        duration: f64,
    ) -> MediaCommand {
        let cmd = self
            .custom(format!("Trim ({}s from {}s)", format_seconds(duration), format_seconds(start)))
            .input(input_path)
            .seek(start)
            .duration(duration)
            .copy_video()
            .audio_codec(&self.config.audio_codec)
            .audio_bitrate(self.config.audio_bitrate_kbps);
        self.finish(cmd, output_path)
    }

    /// Build timelapse command: compress timestamps, force frame rate, drop audio
    pub fn timelapse<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        fps: u32,
    ) -> MediaCommand {
        let cmd = self
            .custom(format!("Timelapse ({}fps)", fps))
            .input(input_path)
            .video_filter(pts_scale(fps))
            .frame_rate(fps)
            .encode_video(&self.config.video_codec, &self.config.preset, self.config.crf)
            .no_audio()
            .faststart();
        self.finish(cmd, output_path)
    }

    /// Build speedup command: scale video timestamps and chain audio tempo stages
    pub fn speedup<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        factor: SpeedFactor,
    ) -> MediaCommand {
        let cmd = self
            .custom(format!("Speedup ({}x)", factor.value()))
            .input(input_path)
            .video_filter(pts_scale(factor.value()))
            .audio_filter(atempo_chain(factor))
            .encode_video(&self.config.video_codec, &self.config.preset, self.config.crf)
            .audio_codec(&self.config.audio_codec)
            .audio_bitrate(self.config.audio_bitrate_kbps);
        self.finish(cmd, output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Version check").arg("-version")
    }
}

/// `setpts` filter playing the input `divisor` times faster
pub fn pts_scale(divisor: u32) -> String {
    format!("setpts=(1/{})*PTS", divisor)
}

/// `atempo` accepts factors in [0.5, 2.0] only, so larger factors chain x2 stages
pub fn atempo_chain(factor: SpeedFactor) -> String {
    vec!["atempo=2.0"; factor.tempo_stages()].join(",")
}

fn format_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{}", seconds as u64)
    } else {
        format!("{:.3}", seconds)
    }
}
