use crate::types::Segment;

/// Segment whose range contains `time`, both ends inclusive.
///
/// Scans in sequence order, so on a boundary shared by two adjacent segments
/// the earlier one wins. Gaps and an empty list yield `None`.
pub fn find_active(segments: &[Segment], time: f64) -> Option<&Segment> {
    segments.iter().find(|s| s.contains(time))
}
