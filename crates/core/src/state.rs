use crate::{media::VideoHandle, types::Segment};

pub const TRANSCRIPT_REQUIRED: &str = "Please paste a transcript first.";
pub const VIDEO_REQUIRED: &str = "Please upload a video first.";

/// Single snapshot of everything the host displays.
#[derive(Debug, Default)]
pub struct AppState {
    pub video: Option<VideoHandle>,
    /// Seconds; 0 while unknown
    pub video_duration: f64,
    pub transcript: String,
    pub current_time: f64,
    pub is_processing: bool,
    pub segments: Vec<Segment>,
    pub error: Option<String>,
}

/// Everything that can change [`AppState`].
#[derive(Debug)]
pub enum Action {
    UploadVideo(VideoHandle),
    SetTranscript(String),
    TimeUpdate(f64),
    MetadataLoaded(f64),
    MediaFailed(String),
    Rejected(&'static str),
    SyncStarted,
    SyncSucceeded(Vec<Segment>),
    SyncFailed(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::UploadVideo(_) => "upload_video",
            Action::SetTranscript(_) => "set_transcript",
            Action::TimeUpdate(_) => "time_update",
            Action::MetadataLoaded(_) => "metadata_loaded",
            Action::MediaFailed(_) => "media_failed",
            Action::Rejected(_) => "rejected",
            Action::SyncStarted => "sync_started",
            Action::SyncSucceeded(_) => "sync_succeeded",
            Action::SyncFailed(_) => "sync_failed",
        }
    }
}

/// Apply one action. The previous state is consumed; a replaced video
/// handle is dropped here, which releases it.
pub fn reduce(state: AppState, action: Action) -> AppState {
    match action {
        Action::UploadVideo(handle) => AppState {
            video: Some(handle),
            video_duration: 0.0,
            current_time: 0.0,
            segments: Vec::new(),
            error: None,
            ..state
        },
        Action::SetTranscript(transcript) => AppState { transcript, ..state },
        Action::TimeUpdate(current_time) => AppState {
            current_time,
            ..state
        },
        Action::MetadataLoaded(video_duration) => AppState {
            video_duration,
            ..state
        },
        Action::MediaFailed(message) => AppState {
            video_duration: 0.0,
            error: Some(message),
            ..state
        },
        Action::Rejected(message) => AppState {
            error: Some(message.to_string()),
            ..state
        },
        Action::SyncStarted => AppState {
            is_processing: true,
            error: None,
            ..state
        },
        Action::SyncSucceeded(segments) => AppState {
            segments,
            is_processing: false,
            ..state
        },
        Action::SyncFailed(message) => AppState {
            error: Some(message),
            is_processing: false,
            ..state
        },
    }
}
