use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    error::SYNC_FAILED_MESSAGE,
    matcher::find_active,
    media::{MediaEvent, VideoHandle, load_failure_message},
    state::{Action, AppState, TRANSCRIPT_REQUIRED, VIDEO_REQUIRED, reduce},
    synchronizer::Synchronizer,
    types::Segment,
};

/// Outcome of [`Controller::request_sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRequest {
    Started,
    AlreadyInFlight,
    Rejected(&'static str),
}

/// Owns the application state and routes every change through [`reduce`].
pub struct Controller {
    state: AppState,
    synchronizer: Arc<dyn Synchronizer>,
    in_flight: Option<JoinHandle<Action>>,
}

impl Controller {
    pub fn new(synchronizer: Arc<dyn Synchronizer>) -> Self {
        Self {
            state: AppState::default(),
            synchronizer,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        find_active(&self.state.segments, self.state.current_time)
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::trace!(action = action.name(), "dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    pub fn upload_video(&mut self, video: VideoHandle) {
        self.dispatch(Action::UploadVideo(video));
    }

    pub fn set_transcript(&mut self, text: impl Into<String>) {
        self.dispatch(Action::SetTranscript(text.into()));
    }

    pub fn on_time_update(&mut self, time: f64) {
        self.dispatch(Action::TimeUpdate(time));
    }

    pub fn on_metadata_loaded(&mut self, duration: f64) {
        self.dispatch(Action::MetadataLoaded(duration));
    }

    pub fn apply_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::DurationKnown(duration) => self.on_metadata_loaded(duration),
            MediaEvent::TimeChanged(time) => self.on_time_update(time),
            MediaEvent::LoadFailed(reason) => {
                tracing::warn!(%reason, "media failed to load");
                self.dispatch(Action::MediaFailed(load_failure_message(&reason)));
            }
        }
    }

    /// Validate and kick off synchronization in the background.
    ///
    /// At most one synchronization runs at a time. The result is applied by
    /// [`Controller::next_completion`].
    pub fn request_sync(&mut self) -> SyncRequest {
        if self.state.is_processing || self.in_flight.is_some() {
            tracing::debug!("synchronization already in flight");
            return SyncRequest::AlreadyInFlight;
        }
        if self.state.transcript.trim().is_empty() {
            self.dispatch(Action::Rejected(TRANSCRIPT_REQUIRED));
            return SyncRequest::Rejected(TRANSCRIPT_REQUIRED);
        }
        let duration = self.state.video_duration;
        if duration.is_nan() || duration <= 0.0 {
            self.dispatch(Action::Rejected(VIDEO_REQUIRED));
            return SyncRequest::Rejected(VIDEO_REQUIRED);
        }

        self.dispatch(Action::SyncStarted);

        let synchronizer = Arc::clone(&self.synchronizer);
        let transcript = self.state.transcript.clone();
        self.in_flight = Some(tokio::spawn(async move {
            match synchronizer.synchronize(&transcript, duration).await {
                Ok(segments) => Action::SyncSucceeded(segments),
                Err(e) => Action::SyncFailed(e.to_string()),
            }
        }));

        SyncRequest::Started
    }

    pub fn is_processing(&self) -> bool {
        self.state.is_processing
    }

    /// Wait for the in-flight synchronization and apply its result.
    /// Returns `None` when nothing is running.
    pub async fn next_completion(&mut self) -> Option<&AppState> {
        let task = self.in_flight.take()?;
        let action = match task.await {
            Ok(action) => action,
            Err(e) => {
                tracing::error!(error = %e, "synchronization task did not complete");
                Action::SyncFailed(SYNC_FAILED_MESSAGE.to_string())
            }
        };
        self.dispatch(action);
        Some(&self.state)
    }
}
