use serde::{Deserialize, Serialize};

/// One time-coded caption unit. Times are seconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl Segment {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A segment as the model returns it, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDraft {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

impl SegmentDraft {
    pub fn into_segment(self, index: usize) -> Segment {
        Segment {
            id: format!("seg-{}", index),
            start_time: self.start_time,
            end_time: self.end_time,
            text: self.text,
        }
    }
}

/// Top-level object the model is asked to produce.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResult {
    pub segments: Vec<SegmentDraft>,
}
