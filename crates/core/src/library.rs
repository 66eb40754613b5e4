use crate::types::VideoEntry;

pub const EMPTY_LIBRARY: &str = "No videos uploaded yet";

/// Video list with the current filter text.
#[derive(Debug, Default)]
pub struct Library {
    videos: Vec<VideoEntry>,
    filter: String,
}

impl Library {
    pub fn replace(&mut self, videos: Vec<VideoEntry>) {
        self.videos = videos;
    }

    pub fn videos(&self) -> &[VideoEntry] {
        &self.videos
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&VideoEntry> {
        self.videos.iter().find(|v| v.name == name)
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_lowercase();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Entries whose name contains the filter, ignoring case.
    pub fn visible(&self) -> impl Iterator<Item = &VideoEntry> {
        self.videos
            .iter()
            .filter(|v| v.name.to_lowercase().contains(&self.filter))
    }
}
