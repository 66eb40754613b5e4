use std::collections::HashSet;

use crate::{format::parse_hhmmss, types::RawSuggestion};

pub const DEFAULT_SUGGESTION_CAP: usize = 6;

/// Canned chat prompt, valid while playback is inside `[start_secs, end_secs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub key: String,
    pub text: String,
    pub start: String,
    pub end: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl Suggestion {
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.start_secs && t <= self.end_secs
    }
}

/// Drop items with empty text, unparseable timestamps or an empty window.
pub fn parse_suggestions(items: &[RawSuggestion]) -> Vec<Suggestion> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let text = item.text.trim();
            let start = item.start.trim();
            let end = item.end.trim();
            let start_secs = parse_hhmmss(start)?;
            let end_secs = parse_hhmmss(end)?;
            if text.is_empty() || end_secs <= start_secs {
                return None;
            }
            Some(Suggestion {
                key: format!("{}-{}-{}", idx, start, end),
                text: text.to_string(),
                start: start.to_string(),
                end: end.to_string(),
                start_secs,
                end_secs,
            })
        })
        .collect()
}

/// Per-video suggestions plus the key set that was last handed to the view.
#[derive(Debug)]
pub struct SuggestionBoard {
    items: Vec<Suggestion>,
    rendered: HashSet<String>,
    cap: usize,
}

impl Default for SuggestionBoard {
    fn default() -> Self {
        Self::with_cap(DEFAULT_SUGGESTION_CAP)
    }
}

impl SuggestionBoard {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            rendered: HashSet::new(),
            cap,
        }
    }

    pub fn load(&mut self, items: Vec<Suggestion>) {
        self.items = items;
        self.rendered.clear();
    }

    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn items(&self) -> &[Suggestion] {
        &self.items
    }

    /// Items whose window contains `t`, in list order, capped.
    pub fn active_at(&self, t: f64) -> Vec<&Suggestion> {
        self.items
            .iter()
            .filter(|it| it.is_active_at(t))
            .take(self.cap)
            .collect()
    }

    /// Recompute the active set for `t`. Returns the set to render only when
    /// its keys differ from what was rendered last.
    pub fn update(&mut self, t: f64) -> Option<Vec<Suggestion>> {
        let active: Vec<Suggestion> = self.active_at(t).into_iter().cloned().collect();
        let keys: HashSet<String> = active.iter().map(|s| s.key.clone()).collect();
        if keys == self.rendered {
            return None;
        }
        self.rendered = keys;
        Some(active)
    }
}
