use crate::{matcher::find_active, types::Segment};

/// Format seconds as M:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{}:{:02}", mins, secs)
}

/// One line of the analysis breakdown
pub fn format_segment_line(segment: &Segment, active: bool) -> String {
    let marker = if active { "▶" } else { " " };
    format!(
        "{} [{}–{}] {}",
        marker,
        format_timestamp(segment.start_time),
        format_timestamp(segment.end_time),
        segment.text.trim()
    )
}

/// Readable listing of every segment, marking the one active at `current_time`.
pub fn format_segments_readable(segments: &[Segment], current_time: f64) -> String {
    let active_id = find_active(segments, current_time).map(|s| s.id.as_str());

    let mut output = String::new();
    output.push_str(&format!("## Segments ({})\n\n", segments.len()));
    for segment in segments {
        let active = Some(segment.id.as_str()) == active_id;
        output.push_str(&format_segment_line(segment, active));
        output.push('\n');
    }
    output
}
