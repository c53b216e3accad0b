use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;

use crate::{
    error::{Result, SyncError, SyncFailure, SyncSubError},
    provider::Provider,
    synchronizer::{Synchronizer, repair_segments},
    types::Segment,
};

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("syncsub")
}

/// Get the cache directory for a transcript timed against a given duration
pub fn get_cache_dir(root: &Path, transcript: &str, duration: f64) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    transcript.trim().hash(&mut hasher);
    duration.to_bits().hash(&mut hasher);
    root.join(format!("{:016x}", hasher.finish()))
}

/// Get the path for cached segments (provider aware)
pub fn get_segments_path(cache_dir: &Path, provider: &Provider) -> PathBuf {
    cache_dir.join(format!("segments_{}.json", provider.slug()))
}

/// Load segments from a cached file
pub async fn load_segments(path: &Path) -> Result<Vec<Segment>> {
    let json_content = fs::read_to_string(path).await?;
    serde_json::from_str(&json_content).map_err(|e| SyncSubError::CacheCorrupted {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Save segments to a file, creating parent directories as needed
pub async fn save_segments(segments: &[Segment], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let pretty_json = serde_json::to_string_pretty(segments)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Replays a previously synchronized segment list instead of calling a model.
pub struct CachedSegments {
    segments: Vec<Segment>,
}

impl CachedSegments {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Transcript text reconstructed from the segments
    pub fn transcript(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn end_time(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0, f64::max)
    }
}

#[async_trait]
impl Synchronizer for CachedSegments {
    async fn synchronize(
        &self,
        _transcript: &str,
        duration: f64,
    ) -> std::result::Result<Vec<Segment>, SyncError> {
        // Saved files can be edited by hand, so they get the same repair as
        // fresh model output.
        let returned = self.segments.len();
        let segments = repair_segments(self.segments.clone(), duration);
        if segments.is_empty() {
            tracing::error!(returned, "cached segments are unusable");
            return Err(SyncFailure::NoUsableSegments { returned }.into());
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("syncsub-test-{}-{}", name, std::process::id()))
    }

    #[test]
    fn cache_dir_depends_on_transcript_and_duration() {
        let root = Path::new("/cache");
        let a = get_cache_dir(root, "hello", 10.0);

        assert_eq!(a, get_cache_dir(root, "  hello\n", 10.0));
        assert_ne!(a, get_cache_dir(root, "hello", 11.0));
        assert_ne!(a, get_cache_dir(root, "goodbye", 10.0));
        assert!(a.starts_with(root));
    }

    #[test]
    fn segments_path_is_provider_aware() {
        let dir = Path::new("/cache/abc");
        assert_eq!(
            get_segments_path(dir, &Provider::Gemini),
            PathBuf::from("/cache/abc/segments_gemini.json")
        );
    }

    #[tokio::test]
    async fn saved_segments_load_back() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("nested").join("segments_gemini.json");
        let segments = vec![Segment {
            id: "seg-0".into(),
            start_time: 0.0,
            end_time: 3.5,
            text: "Hello".into(),
        }];

        save_segments(&segments, &path).await.unwrap();
        assert_eq!(load_segments(&path).await.unwrap(), segments);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn cached_segments_replay_verbatim() {
        let segments = vec![
            Segment {
                id: "seg-0".into(),
                start_time: 0.0,
                end_time: 2.0,
                text: "Hello".into(),
            },
            Segment {
                id: "seg-1".into(),
                start_time: 2.0,
                end_time: 6.5,
                text: " world ".into(),
            },
        ];
        let cached = CachedSegments::new(segments.clone());

        assert_eq!(cached.transcript(), "Hello world");
        assert_eq!(cached.end_time(), 6.5);
        assert_eq!(cached.synchronize("ignored", 6.5).await.unwrap(), segments);
    }

    #[tokio::test]
    async fn cached_replay_is_repaired_against_the_duration() {
        let cached = CachedSegments::new(vec![
            Segment {
                id: "seg-0".into(),
                start_time: 1.0,
                end_time: 4.0,
                text: "late start".into(),
            },
            Segment {
                id: "seg-1".into(),
                start_time: 3.0,
                end_time: 9.0,
                text: "overlapping".into(),
            },
        ]);

        let out = cached.synchronize("ignored", 6.0).await.unwrap();
        let ranges: Vec<_> = out.iter().map(|s| (s.start_time, s.end_time)).collect();
        assert_eq!(ranges, [(0.0, 4.0), (4.0, 6.0)]);
    }

    #[tokio::test]
    async fn empty_cached_replay_is_a_sync_failure() {
        let cached = CachedSegments::new(vec![]);

        let err = cached.synchronize("ignored", 5.0).await.unwrap_err();
        assert_eq!(err.to_string(), crate::error::SYNC_FAILED_MESSAGE);
        assert!(matches!(
            err.cause,
            SyncFailure::NoUsableSegments { returned: 0 }
        ));
    }

    #[tokio::test]
    async fn corrupt_cache_is_reported_with_its_path() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("segments_grok.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load_segments(&path).await.unwrap_err();
        assert!(matches!(err, SyncSubError::CacheCorrupted { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
