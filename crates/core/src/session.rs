use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    chat::ChatPanel,
    format::format_log_header,
    frame::Overlay,
    markdown::render_markdown,
    subtitles::SubtitleTrack,
    suggestions::SuggestionBoard,
    types::{ClickPoint, LogEntry, VideoEntry},
};

pub const SUMMARY_PENDING: &str = "Summary is not ready yet";
pub const LOG_EMPTY: &str = "Empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    About,
    Log,
}

impl Tab {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chat" => Some(Self::Chat),
            "about" | "summary" => Some(Self::About),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SummaryView {
    #[default]
    NotLoaded,
    Pending,
    Ready {
        text: String,
        html: String,
    },
}

impl SummaryView {
    pub fn ready(text: String) -> Self {
        let html = render_markdown(&text);
        Self::Ready { text, html }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Text for the about panel.
    pub fn display(&self) -> &str {
        match self {
            Self::NotLoaded => "",
            Self::Pending => SUMMARY_PENDING,
            Self::Ready { text, .. } => text,
        }
    }
}

/// Backend processing log as last fetched.
#[derive(Debug, Clone, Default)]
pub struct LogView {
    entries: Vec<LogEntry>,
}

impl LogView {
    pub fn replace(&mut self, entries: Vec<LogEntry>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// One block per entry: header, content, then the frame URL if any.
    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![LOG_EMPTY.to_string()];
        }
        self.entries
            .iter()
            .map(|entry| {
                let mut block = format_log_header(entry);
                if !entry.content.is_empty() {
                    block.push('\n');
                    block.push_str(&entry.content);
                }
                if let Some(url) = &entry.image_url {
                    block.push('\n');
                    block.push_str(url);
                }
                block
            })
            .collect()
    }
}

/// Everything tied to the video that is currently open. Replaced wholesale
/// when another video loads, so nothing leaks between videos.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub video: VideoEntry,
    pub subtitles: SubtitleTrack,
    pub suggestions: SuggestionBoard,
    pub chat: ChatPanel,
    pub summary: SummaryView,
    pub log: LogView,
    pub tab: Tab,
    last_click: Option<ClickPoint>,
    tooltip: Option<Overlay>,
    annotation: Option<Overlay>,
}

impl Session {
    pub fn new(video: VideoEntry, suggestion_cap: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            video,
            subtitles: SubtitleTrack::default(),
            suggestions: SuggestionBoard::with_cap(suggestion_cap),
            chat: ChatPanel::default(),
            summary: SummaryView::default(),
            log: LogView::default(),
            tab: Tab::default(),
            last_click: None,
            tooltip: None,
            annotation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.video.name
    }

    /// Remember the click; the explain tooltip only appears while idle.
    pub fn record_click(&mut self, point: ClickPoint, now: Instant) {
        self.last_click = Some(point);
        if !self.chat.is_busy() {
            self.tooltip = Some(Overlay::tooltip(point, now));
        }
    }

    /// Last click, or the frame centre when there was none.
    pub fn click_point(&self) -> ClickPoint {
        self.last_click.unwrap_or_default()
    }

    pub fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }

    pub fn tooltip(&self, now: Instant) -> Option<&Overlay> {
        self.tooltip.as_ref().filter(|o| o.is_visible(now))
    }

    pub fn annotate(&mut self, point: ClickPoint, now: Instant) {
        self.annotation = Some(Overlay::annotation(point, now));
    }

    pub fn annotation(&self, now: Instant) -> Option<&Overlay> {
        self.annotation.as_ref().filter(|o| o.is_visible(now))
    }
}
