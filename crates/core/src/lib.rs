//! SyncSub Core Library
//!
//! Times a pasted transcript against a video with a generative model and
//! tracks which caption is active during playback.

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod matcher;
pub mod media;
pub mod provider;
pub mod state;
pub mod synchronizer;
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{
    CachedSegments, get_cache_dir, get_root_cache_dir, get_segments_path, load_segments,
    save_segments,
};
pub use config::SyncConfig;
pub use controller::{Controller, SyncRequest};
pub use error::{
    CompletionError, MediaError, Result, SYNC_FAILED_MESSAGE, SyncError, SyncFailure, SyncSubError,
};
pub use format::{format_segment_line, format_segments_readable, format_timestamp};
pub use matcher::find_active;
pub use media::{
    FileMedia, MediaEvent, MediaResource, PlaybackClock, VideoHandle, load_failure_message,
    probe_duration,
};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use state::{Action, AppState, reduce};
pub use synchronizer::{
    CompletionClient, CompletionRequest, HttpCompletionClient, Synchronizer, TranscriptSynchronizer,
};
pub use types::{Segment, SegmentDraft, SyncResult};
