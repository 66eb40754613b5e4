use crate::types::SubtitleSegment;

/// Index of the first segment whose `[start, end)` interval contains `t`.
pub fn active_index(segments: &[SubtitleSegment], t: f64) -> Option<usize> {
    segments.iter().position(|s| t >= s.start && t < s.end)
}

/// Vertical extent of a box in the subtitle list, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalSpan {
    pub top: f64,
    pub bottom: f64,
}

const SCROLL_MARGIN: f64 = 8.0;

/// Scroll delta that brings `item` back inside `container` with a small margin.
/// Zero when the item is already visible.
pub fn scroll_adjustment(container: VerticalSpan, item: VerticalSpan) -> f64 {
    if item.top < container.top + SCROLL_MARGIN {
        item.top - container.top - SCROLL_MARGIN
    } else if item.bottom > container.bottom - SCROLL_MARGIN {
        item.bottom - container.bottom + SCROLL_MARGIN
    } else {
        0.0
    }
}

/// Subtitle list of the current video together with its highlight state.
#[derive(Debug, Default)]
pub struct SubtitleTrack {
    segments: Vec<SubtitleSegment>,
    active: Option<usize>,
}

impl SubtitleTrack {
    pub fn new(segments: Vec<SubtitleSegment>) -> Self {
        Self {
            segments,
            active: None,
        }
    }

    pub fn replace(&mut self, segments: Vec<SubtitleSegment>) {
        self.segments = segments;
        self.active = None;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    pub fn segments(&self) -> &[SubtitleSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The panel is only shown once there is something to show.
    pub fn is_visible(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_segment(&self) -> Option<&SubtitleSegment> {
        self.active.and_then(|i| self.segments.get(i))
    }

    /// Move the highlight to the segment playing at `t`. Returns `true` when
    /// the highlighted row changed.
    pub fn sync(&mut self, t: f64) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let next = active_index(&self.segments, t);
        let changed = next != self.active;
        self.active = next;
        changed
    }

    /// Seek target when the user picks a row.
    pub fn seek_target(&self, index: usize) -> Option<f64> {
        self.segments.get(index).map(|s| s.start + 0.01)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> SubtitleSegment {
        SubtitleSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn first_match_wins_on_half_open_interval() {
        let segs = vec![seg(0.0, 5.0, "a"), seg(5.0, 10.0, "b"), seg(4.0, 8.0, "overlap")];
        assert_eq!(active_index(&segs, 0.0), Some(0));
        assert_eq!(active_index(&segs, 4.5), Some(0));
        assert_eq!(active_index(&segs, 5.0), Some(1));
        assert_eq!(active_index(&segs, 10.0), None);
        assert_eq!(active_index(&[], 1.0), None);
    }

    #[test]
    fn at_most_one_highlight_for_any_time() {
        let segs = vec![seg(0.0, 2.0, "a"), seg(1.0, 3.0, "b"), seg(2.5, 4.0, "c")];
        let mut track = SubtitleTrack::new(segs);
        let mut t = 0.0;
        while t < 5.0 {
            track.sync(t);
            let expected = active_index(track.segments(), t);
            assert_eq!(track.active(), expected);
            t += 0.1;
        }
    }

    #[test]
    fn sync_reports_changes_only() {
        let mut track = SubtitleTrack::new(vec![seg(0.0, 2.0, "a"), seg(2.0, 4.0, "b")]);
        assert!(track.sync(0.5));
        assert!(!track.sync(1.5));
        assert!(track.sync(2.0));
        assert_eq!(track.active_segment().map(|s| s.text.as_str()), Some("b"));
        assert!(track.sync(9.0));
        assert_eq!(track.active(), None);

        track.clear();
        assert!(!track.sync(0.5));
        assert!(!track.is_visible());
    }

    #[test]
    fn seek_target_lands_inside_segment() {
        let track = SubtitleTrack::new(vec![seg(3.0, 6.0, "a")]);
        assert_eq!(track.seek_target(0), Some(3.01));
        assert_eq!(track.seek_target(1), None);
    }

    #[test]
    fn scroll_keeps_row_inside_margin() {
        let container = VerticalSpan {
            top: 100.0,
            bottom: 300.0,
        };
        let inside = VerticalSpan {
            top: 150.0,
            bottom: 170.0,
        };
        let above = VerticalSpan {
            top: 90.0,
            bottom: 110.0,
        };
        let below = VerticalSpan {
            top: 290.0,
            bottom: 310.0,
        };
        assert_eq!(scroll_adjustment(container, inside), 0.0);
        assert_eq!(scroll_adjustment(container, above), -18.0);
        assert_eq!(scroll_adjustment(container, below), 18.0);
    }
}
