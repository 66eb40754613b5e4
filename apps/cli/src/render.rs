use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lectern_core::{
    chat::{Bubble, BubbleStatus},
    format::format_clock,
    library::{EMPTY_LIBRARY, Library},
    session::LogView,
    subtitles::SubtitleTrack,
    suggestions::Suggestion,
    types::Role,
    upload::{StepStatus, UploadOverlay, UploadStep},
};

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

pub fn error_line(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

pub fn print_library(library: &Library) {
    if library.is_empty() {
        println!("{}", style(EMPTY_LIBRARY).dim());
        return;
    }
    for video in library.visible() {
        println!("  {}  {}", style(&video.name).bold(), style(&video.url).dim());
    }
}

/// Lecturer replies print their Markdown source unless `html` is set.
pub fn print_bubble(bubble: &Bubble, html: bool) {
    let label = match bubble.role {
        Role::Student => style("you").cyan().bold(),
        Role::Lecturer => style("lecturer").magenta().bold(),
    };
    let body = if html { &bubble.html } else { &bubble.text };
    match bubble.status {
        BubbleStatus::Pending => println!("{label} {}", style("…").dim()),
        BubbleStatus::Done => println!("{label} {body}"),
        BubbleStatus::Failed => println!("{label} {} {}", style("✗").red().bold(), style(body).red()),
    }
    if let Some(point) = bubble.frame {
        println!(
            "  {}",
            style(format!("frame at ({:.2}, {:.2})", point.x, point.y)).dim()
        );
    }
}

pub fn print_subtitles(track: &SubtitleTrack) {
    if track.is_empty() {
        println!("{}", style("Subtitles are not ready yet").dim());
        return;
    }
    for (i, seg) in track.segments().iter().enumerate() {
        let range = format!("[{} - {}]", format_clock(seg.start), format_clock(seg.end));
        if track.active() == Some(i) {
            println!("{} {:>3} {} {}", style("▸").green(), i + 1, style(range).green(), style(&seg.text).bold());
        } else {
            println!("  {:>3} {} {}", i + 1, style(range).dim(), seg.text);
        }
    }
}

pub fn print_suggestions(items: &[Suggestion]) {
    for (i, item) in items.iter().enumerate() {
        println!(
            "  {} {} {}",
            style(format!("{}.", i + 1)).cyan(),
            item.text,
            style(format!("[{} - {}]", item.start, item.end)).dim()
        );
    }
}

pub fn print_log(log: &LogView) {
    for block in log.render() {
        let mut lines = block.lines();
        if let Some(head) = lines.next() {
            println!("{}", style(head).bold());
        }
        for line in lines {
            println!("  {line}");
        }
    }
}

/// `✓ Extracting audio  ● Transcribing  · Summarizing`
pub fn upload_progress(overlay: &UploadOverlay) -> String {
    UploadStep::ALL
        .iter()
        .map(|step| match overlay.status(*step) {
            StepStatus::Done => format!("{} {}", style("✓").green(), step.label()),
            StepStatus::Active => format!("{} {}", style("●").cyan(), style(step.label()).bold()),
            StepStatus::Pending => style(format!("· {}", step.label())).dim().to_string(),
        })
        .collect::<Vec<_>>()
        .join("  ")
}
