use std::path::PathBuf;

use image::DynamicImage;
use lectern_core::{FrameSource, MediaElement, PlayRejected};
use tokio::time::Instant;

/// Media element that advances on the wall clock instead of decoding
/// anything. Duration stays unknown until the caller sets it.
#[derive(Debug)]
pub struct SimulatedMedia {
    src: Option<String>,
    position: f64,
    playing_since: Option<Instant>,
    rate: f64,
    volume: f64,
    muted: bool,
    duration: f64,
    /// Refuse unmuted playback until a gesture was seen, like a browser
    require_gesture: bool,
    gesture_seen: bool,
}

impl SimulatedMedia {
    pub fn new(require_gesture: bool) -> Self {
        Self {
            src: None,
            position: 0.0,
            playing_since: None,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            duration: f64::NAN,
            require_gesture,
            gesture_seen: false,
        }
    }

    pub fn note_gesture(&mut self) {
        self.gesture_seen = true;
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn clamp(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        if self.duration.is_finite() && self.duration > 0.0 {
            t.min(self.duration)
        } else {
            t
        }
    }

    /// Fold elapsed playing time into `position`.
    fn settle(&mut self) {
        self.position = self.current_time();
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }
}

impl MediaElement for SimulatedMedia {
    fn play(&mut self) -> Result<(), PlayRejected> {
        if self.src.is_none() {
            return Err(PlayRejected {
                reason: "no source loaded".into(),
            });
        }
        if self.require_gesture && !self.muted && !self.gesture_seen {
            return Err(PlayRejected {
                reason: "NotAllowedError: play() needs a user gesture".into(),
            });
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.playing_since = None;
    }

    fn is_paused(&self) -> bool {
        self.playing_since.is_none()
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.settle();
        self.rate = rate;
    }

    fn seek(&mut self, t: f64) {
        self.position = self.clamp(t);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn current_time(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64() * self.rate)
            .unwrap_or(0.0);
        self.clamp(self.position + elapsed)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn load(&mut self, src: Option<&str>) {
        self.src = src.map(str::to_string);
        self.position = 0.0;
        self.playing_since = None;
        self.duration = f64::NAN;
    }
}

/// Frame source backed by an image on disk, re-read on every capture.
pub struct StillFrame {
    path: Option<PathBuf>,
}

impl StillFrame {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl FrameSource for StillFrame {
    fn current_frame(&mut self) -> lectern_core::Result<Option<DynamicImage>> {
        match &self.path {
            Some(path) => Ok(Some(image::open(path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_follows_rate_and_seeks() {
        let mut media = SimulatedMedia::new(false);
        assert!(media.play().is_err());

        media.load(Some("http://localhost/video/a.mp4"));
        media.play().unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(media.current_time(), 10.0);

        media.set_playback_rate(2.0);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(media.current_time(), 20.0);

        media.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(media.current_time(), 20.0);

        media.set_duration(30.0);
        media.seek(100.0);
        assert_eq!(media.current_time(), 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn gesture_policy_allows_muted_playback() {
        let mut media = SimulatedMedia::new(true);
        media.load(Some("a.mp4"));
        assert!(media.play().is_err());

        media.set_muted(true);
        assert!(media.play().is_ok());

        media.pause();
        media.set_muted(false);
        media.note_gesture();
        assert!(media.play().is_ok());
    }

    #[test]
    fn missing_frame_path_yields_nothing() {
        let mut frame = StillFrame::new(None);
        assert!(frame.current_frame().unwrap().is_none());
    }
}
