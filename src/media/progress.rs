//! Interpretation of ffmpeg's stderr while a job runs.
//!
//! Invocations pass `-progress pipe:2`, so stderr interleaves `key=value` progress
//! blocks with regular log output. Progress lines feed the percentage estimate;
//! everything else is kept as diagnostic text for failure reports.

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

use crate::events::{self, EventSender, JobEvent};

/// Maximum number of stderr lines kept for diagnostics.
pub const DIAGNOSTIC_LINES: usize = 200;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("duration pattern")
});

// both keys carry microseconds
static OUT_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^out_time_(?:us|ms)=(\d+)$").expect("out_time pattern"));

static PROGRESS_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(frame|fps|stream_\d+_\d+_q|bitrate|total_size|out_time_us|out_time_ms|out_time",
        r"|dup_frames|drop_frames|speed|progress)="
    ))
    .expect("progress key pattern")
});

/// How the output duration relates to the input duration, used to turn
/// ffmpeg's `out_time` into a completion percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputTiming {
    /// Seconds skipped at the start of the input
    pub offset: f64,
    /// Output seconds per input second
    pub scale: f64,
    /// Upper bound on output seconds
    pub limit: Option<f64>,
}

impl OutputTiming {
    pub fn unchanged() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
            limit: None,
        }
    }

    pub fn scaled(scale: f64) -> Self {
        Self {
            scale,
            ..Self::unchanged()
        }
    }

    pub fn window(start: f64, duration: f64) -> Self {
        Self {
            offset: start,
            scale: 1.0,
            limit: Some(duration),
        }
    }

    pub fn expected_output_secs(&self, input_secs: f64) -> f64 {
        let secs = (input_secs - self.offset).max(0.0) * self.scale;
        match self.limit {
            Some(limit) => secs.min(limit),
            None => secs,
        }
    }
}

/// Tracks progress for one job and forwards percentage updates as [`JobEvent`]s.
pub struct ProgressTracker {
    job_id: Uuid,
    timing: Option<OutputTiming>,
    events: Option<EventSender>,
    input_secs: Option<f64>,
    last_percent: Option<u32>,
}

impl ProgressTracker {
    pub fn new(job_id: Uuid, timing: Option<OutputTiming>, events: Option<EventSender>) -> Self {
        Self {
            job_id,
            timing,
            events,
            input_secs: None,
            last_percent: None,
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Feed one stderr line. Returns `true` when the line belongs to the
    /// `-progress` stream and should not be kept as diagnostic output.
    pub fn observe_line(&mut self, line: &str) -> bool {
        if let Some(caps) = DURATION_RE.captures(line) {
            let hours: f64 = caps[1].parse().unwrap_or(0.0);
            let minutes: f64 = caps[2].parse().unwrap_or(0.0);
            let seconds: f64 = caps[3].parse().unwrap_or(0.0);
            let total = hours * 3600.0 + minutes * 60.0 + seconds;
            // concat inputs report one duration per file; keep the first
            if self.input_secs.is_none() && total > 0.0 {
                debug!("Job {} input duration: {:.2}s", self.job_id, total);
                self.input_secs = Some(total);
            }
            return false;
        }

        if let Some(caps) = OUT_TIME_RE.captures(line) {
            if let Ok(micros) = caps[1].parse::<f64>() {
                self.update_out_time(micros / 1_000_000.0);
            }
            return true;
        }

        if line == "progress=end" {
            self.report(100.0);
            return true;
        }

        PROGRESS_KEY_RE.is_match(line)
    }

    fn update_out_time(&mut self, out_secs: f64) {
        let (Some(timing), Some(input_secs)) = (self.timing, self.input_secs) else {
            return;
        };
        let expected = timing.expected_output_secs(input_secs);
        if expected > 0.0 {
            self.report((out_secs / expected * 100.0) as f32);
        }
    }

    /// Publish a percentage; updates are forwarded only when the whole-number
    /// percentage advances.
    pub fn report(&mut self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        let whole = percent as u32;
        if self.last_percent.is_some_and(|last| whole <= last) {
            return;
        }
        self.last_percent = Some(whole);
        debug!("Job {} progress: {:.1}%", self.job_id, percent);
        events::emit(
            self.events.as_ref(),
            JobEvent::Progress {
                job_id: self.job_id,
                percent,
            },
        );
    }
}

/// Ring buffer over the most recent diagnostic lines.
#[derive(Debug, Default)]
pub struct DiagnosticBuffer {
    lines: VecDeque<String>,
    dropped: usize,
}

impl DiagnosticBuffer {
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == DIAGNOSTIC_LINES {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_string(self) -> String {
        let mut out = String::new();
        if self.dropped > 0 {
            out.push_str(&format!("... ({} earlier lines omitted)\n", self.dropped));
        }
        out.push_str(&Vec::from(self.lines).join("\n"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut crate::events::EventReceiver) -> Vec<f32> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let JobEvent::Progress { percent, .. } = event {
                out.push(percent);
            }
        }
        out
    }

    #[test]
    fn test_expected_output_secs() {
        assert_eq!(OutputTiming::unchanged().expected_output_secs(10.0), 10.0);
        assert_eq!(OutputTiming::scaled(0.25).expected_output_secs(40.0), 10.0);
        assert_eq!(OutputTiming::window(0.0, 30.0).expected_output_secs(120.0), 30.0);
        assert_eq!(OutputTiming::window(0.0, 30.0).expected_output_secs(12.0), 12.0);
        assert_eq!(OutputTiming::window(50.0, 30.0).expected_output_secs(20.0), 0.0);
    }

    #[test]
    fn test_progress_from_out_time() {
        let (tx, mut rx) = crate::events::channel();
        let timing = Some(OutputTiming::scaled(0.5));
        let mut tracker = ProgressTracker::new(Uuid::new_v4(), timing, Some(tx));

        let duration = "  Duration: 00:00:20.00, start: 0.000000, bitrate: 1205 kb/s";
        assert!(!tracker.observe_line(duration));
        assert!(tracker.observe_line("frame=120"));
        assert!(tracker.observe_line("out_time_us=2500000"));
        assert!(tracker.observe_line("out_time_ms=5000000"));
        assert!(tracker.observe_line("progress=continue"));
        assert!(tracker.observe_line("progress=end"));

        assert_eq!(drain(&mut rx), vec![25.0, 50.0, 100.0]);
    }

    #[test]
    fn test_patterns_compile() {
        LazyLock::force(&DURATION_RE);
        LazyLock::force(&OUT_TIME_RE);
        LazyLock::force(&PROGRESS_KEY_RE);
    }

    #[test]
    fn test_progress_from_info_level_transcript() {
        // stderr of `-hide_banner -loglevel info -nostats -progress pipe:2`
        let transcript = [
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from '/videos/a.mp4':",
            "  Metadata:",
            "    major_brand     : isom",
            "  Duration: 00:00:40.00, start: 0.000000, bitrate: 2011 kb/s",
            "  Stream #0:0[0x1](und): Video: h264 (High), yuv420p, 1920x1080, 30 fps",
            "Stream mapping:",
            "  Stream #0:0 -> #0:0 (h264 (native) -> h264 (libx264))",
            "Output #0, mp4, to '/videos/timelapse_output/t.mp4':",
            "frame=30",
            "fps=0.00",
            "out_time_us=500000",
            "speed=1.0x",
            "progress=continue",
            "frame=60",
            "out_time_us=1000000",
            "progress=continue",
            "progress=end",
        ];

        let (tx, mut rx) = crate::events::channel();
        let timing = Some(OutputTiming::scaled(1.0 / 30.0));
        let mut tracker = ProgressTracker::new(Uuid::new_v4(), timing, Some(tx));
        let mut diagnostic = DiagnosticBuffer::default();
        for line in transcript {
            if !tracker.observe_line(line) {
                diagnostic.push(line);
            }
        }

        let percents = drain(&mut rx);
        assert!(percents.len() >= 3, "got {:?}", percents);
        assert!((percents[0] - 37.5).abs() < 0.01);
        assert!((percents[1] - 75.0).abs() < 0.01);
        assert_eq!(percents.last(), Some(&100.0));
        assert!(!diagnostic.into_string().contains("out_time_us"));
    }

    #[test]
    fn test_no_percentage_without_duration() {
        let (tx, mut rx) = crate::events::channel();
        let mut tracker = ProgressTracker::new(Uuid::new_v4(), None, Some(tx));
        tracker.observe_line("  Duration: 00:01:00.00, start: 0.000000");
        tracker.observe_line("out_time_us=30000000");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_progress_does_not_go_backwards() {
        let (tx, mut rx) = crate::events::channel();
        let mut tracker = ProgressTracker::new(Uuid::new_v4(), None, Some(tx));
        tracker.report(40.0);
        tracker.report(40.4);
        tracker.report(10.0);
        tracker.report(250.0);
        assert_eq!(drain(&mut rx), vec![40.0, 100.0]);
    }

    #[test]
    fn test_log_lines_are_diagnostic() {
        let mut tracker = ProgressTracker::new(Uuid::new_v4(), None, None);
        assert!(!tracker.observe_line("[mov,mp4,m4a,3gp,3g2,mj2 @ 0x1] moov atom not found"));
        assert!(!tracker.observe_line("a.mp4: Invalid data found when processing input"));
    }

    #[test]
    fn test_diagnostic_buffer_keeps_tail() {
        let mut buffer = DiagnosticBuffer::default();
        assert!(buffer.is_empty());
        for i in 0..(DIAGNOSTIC_LINES + 5) {
            buffer.push(format!("line {}", i));
        }
        let text = buffer.into_string();
        assert!(text.starts_with("... (5 earlier lines omitted)\n"));
        assert!(text.contains("line 5\n"));
        assert!(!text.contains("line 4\n"));
        assert!(text.ends_with(&format!("line {}", DIAGNOSTIC_LINES + 4)));
    }
}
