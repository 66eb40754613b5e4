use std::time::Duration;

use tokio::time::Instant;

/// Delay before the overlay pretends transcription has started.
pub const TRANSCRIBE_STEP_DELAY: Duration = Duration::from_millis(800);
/// How long the overlay lingers after the request completes.
pub const OVERLAY_LINGER: Duration = Duration::from_millis(600);

/// Stages shown while an upload is in flight. They are driven by local
/// timers, not by server progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadStep {
    Extract,
    Transcribe,
    Summarize,
}

impl UploadStep {
    pub const ALL: [UploadStep; 3] = [Self::Extract, Self::Transcribe, Self::Summarize];

    pub fn label(self) -> &'static str {
        match self {
            Self::Extract => "Extracting audio",
            Self::Transcribe => "Transcribing",
            Self::Summarize => "Summarizing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Default)]
pub struct UploadOverlay {
    visible: bool,
    current: Option<UploadStep>,
    hide_at: Option<Instant>,
}

impl UploadOverlay {
    pub fn show(&mut self) {
        self.visible = true;
        self.current = Some(UploadStep::Extract);
        self.hide_at = None;
    }

    /// Steps only move forward.
    pub fn advance(&mut self, step: UploadStep) {
        if self.visible && self.current.is_none_or(|c| step > c) {
            self.current = Some(step);
        }
    }

    /// The request is over; keep the overlay up a little longer.
    pub fn finish(&mut self, now: Instant) {
        if self.visible {
            self.hide_at = Some(now + OVERLAY_LINGER);
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        self.visible && self.hide_at.is_none_or(|t| now < t)
    }

    pub fn current(&self) -> Option<UploadStep> {
        self.current
    }

    pub fn status(&self, step: UploadStep) -> StepStatus {
        match self.current {
            Some(c) if step == c => StepStatus::Active,
            Some(c) if step < c => StepStatus::Done,
            _ => StepStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn steps_mark_earlier_ones_done() {
        let now = Instant::now();
        let mut overlay = UploadOverlay::default();
        overlay.show();
        assert_eq!(overlay.status(UploadStep::Extract), StepStatus::Active);
        assert_eq!(overlay.status(UploadStep::Transcribe), StepStatus::Pending);

        overlay.advance(UploadStep::Summarize);
        assert_eq!(overlay.status(UploadStep::Extract), StepStatus::Done);
        assert_eq!(overlay.status(UploadStep::Transcribe), StepStatus::Done);
        assert_eq!(overlay.status(UploadStep::Summarize), StepStatus::Active);

        // the transcribe timer firing late must not move the overlay back
        overlay.advance(UploadStep::Transcribe);
        assert_eq!(overlay.current(), Some(UploadStep::Summarize));

        overlay.finish(now);
        assert!(overlay.is_visible(now + Duration::from_millis(599)));
        assert!(!overlay.is_visible(now + OVERLAY_LINGER));

        // a second upload starts over
        overlay.show();
        assert!(overlay.is_visible(now + OVERLAY_LINGER));
        assert_eq!(overlay.status(UploadStep::Extract), StepStatus::Active);
        assert_eq!(overlay.status(UploadStep::Summarize), StepStatus::Pending);
    }
}
