use console::style;
use syncsub_core::{Controller, PlaybackClock, format_timestamp};

/// Replay the synchronized captions against a simulated playback clock,
/// printing a line whenever the active caption changes. Ctrl-C stops early.
pub async fn play(controller: &mut Controller, speed: f64) {
    let duration = controller.state().video_duration;
    if controller.state().segments.is_empty() || duration <= 0.0 {
        println!("{}", style("Nothing to preview").dim());
        return;
    }

    println!(
        "{} {}\n",
        style("Preview").cyan().bold(),
        style(format!("{}x, Ctrl-C to stop", speed)).dim()
    );

    let mut events = PlaybackClock::new(duration).with_speed(speed).start();
    let mut shown: Option<String> = None;
    let mut gap_shown = false;

    loop {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        controller.apply_media_event(event);

        let now = controller.state().current_time;
        match controller.active_segment() {
            Some(segment) if shown.as_deref() != Some(segment.id.as_str()) => {
                println!(
                    "{} {}",
                    style(format!("[{}]", format_timestamp(now))).cyan(),
                    segment.text.trim()
                );
                shown = Some(segment.id.clone());
                gap_shown = false;
            }
            None if !gap_shown => {
                println!(
                    "{} {}",
                    style(format!("[{}]", format_timestamp(now))).cyan(),
                    style("Waiting for playback...").dim().italic()
                );
                shown = None;
                gap_shown = true;
            }
            _ => {}
        }
    }

    println!(
        "\n{} {}",
        style("Stopped at").dim(),
        style(format_timestamp(controller.state().current_time)).yellow()
    );
}
