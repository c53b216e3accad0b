use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::{process::Command, sync::mpsc};

use crate::error::MediaError;

/// Notifications a playable media resource produces.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    DurationKnown(f64),
    TimeChanged(f64),
    LoadFailed(String),
}

/// User-facing message for a video that failed to load.
pub fn load_failure_message(reason: &str) -> String {
    format!("Could not load the video: {}", reason)
}

/// A platform resource backing a loaded video. `release` frees it.
pub trait MediaResource: Send {
    fn label(&self) -> &str;
    fn release(&mut self);
}

/// Exclusive owner of one media resource.
///
/// The resource is released exactly once: by [`VideoHandle::release`], or
/// when the handle is dropped (replaced in state or torn down).
pub struct VideoHandle {
    resource: Option<Box<dyn MediaResource>>,
}

impl VideoHandle {
    pub fn new(resource: impl MediaResource + 'static) -> Self {
        Self {
            resource: Some(Box::new(resource)),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.resource.as_deref().map(|r| r.label())
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(mut resource) = self.resource.take() {
            tracing::debug!(label = resource.label(), "releasing media resource");
            resource.release();
        }
    }
}

impl Drop for VideoHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoHandle")
            .field("label", &self.label())
            .finish()
    }
}

/// Video file on disk, held open until released.
pub struct FileMedia {
    path: PathBuf,
    label: String,
    file: Option<File>,
}

impl FileMedia {
    pub fn open(path: &Path) -> Result<Self, MediaError> {
        let file = File::open(path).map_err(|source| MediaError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            label,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probe the file and report either its duration or a load failure.
    pub async fn load_metadata(&self) -> MediaEvent {
        match probe_duration(&self.path).await {
            Ok(duration) => MediaEvent::DurationKnown(duration),
            Err(e) => MediaEvent::LoadFailed(e.to_string()),
        }
    }
}

impl MediaResource for FileMedia {
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) {
        self.file.take();
    }
}

/// Read the container duration with ffprobe
pub async fn probe_duration(path: &Path) -> Result<f64, MediaError> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .await
        .map_err(|e| MediaError::ProbeFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&stdout).ok_or_else(|| MediaError::ProbeFailed {
        path: path.to_path_buf(),
        reason: format!("no usable duration in ffprobe output: {:?}", stdout.trim()),
    })
}

fn parse_probe_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite() && *d > 0.0)
}

/// Simulated playback of a video of known duration.
pub struct PlaybackClock {
    duration: f64,
    tick: Duration,
    speed: f64,
}

impl PlaybackClock {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            tick: Duration::from_millis(250),
            speed: 1.0,
        }
    }

    /// A zero tick is ignored; the interval needs a non-zero period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        if !tick.is_zero() {
            self.tick = tick;
        }
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        }
        self
    }

    /// Start playing. Emits `TimeChanged` per tick and a final event at
    /// exactly the duration; stops early if the receiver is dropped.
    pub fn start(self) -> mpsc::Receiver<MediaEvent> {
        let (tx, rx) = mpsc::channel(16);
        let step = self.tick.as_secs_f64() * self.speed;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.tick);
            let mut position = 0.0_f64;

            loop {
                interval.tick().await;
                let time = position.min(self.duration);
                if tx.send(MediaEvent::TimeChanged(time)).await.is_err() {
                    break;
                }
                if time >= self.duration {
                    break;
                }
                position += step;
            }
        });

        rx
    }
}
