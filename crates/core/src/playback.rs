use tracing::{debug, warn};

use crate::format::{EMPTY_TIME_DISPLAY, time_display};

#[derive(Debug, Clone, thiserror::Error)]
#[error("Playback was rejected: {reason}")]
pub struct PlayRejected {
    pub reason: String,
}

/// The media element the controller drives. Implemented by the terminal
/// player's simulated clock and by test doubles.
pub trait MediaElement {
    /// Start or resume playback. Autoplay policies surface as `PlayRejected`.
    fn play(&mut self) -> Result<(), PlayRejected>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn set_volume(&mut self, volume: f64);
    fn set_playback_rate(&mut self, rate: f64);
    fn seek(&mut self, t: f64);
    fn current_time(&self) -> f64;
    /// Zero or NaN while unknown.
    fn duration(&self) -> f64;
    /// Swap the source; `None` unloads the current one.
    fn load(&mut self, src: Option<&str>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoplayOutcome {
    WithSound,
    /// Playing muted, waiting for a user gesture to restore sound
    Muted,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Pointer,
    Mouse,
    Touch,
    Key,
    UnmuteButton,
}

pub const PLAY_LABEL: &str = "\u{25B6}";
pub const PAUSE_LABEL: &str = "\u{23F8}";

pub struct PlaybackController<M> {
    media: M,
    state: PlayerState,
    volume: f64,
    rate: f64,
    scrub_resume: Option<bool>,
    pending_unmute: bool,
    start_control: bool,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            state: PlayerState::Idle,
            volume: 1.0,
            rate: 1.0,
            scrub_resume: None,
            pending_unmute: false,
            start_control: false,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn current_time(&self) -> f64 {
        let t = self.media.current_time();
        if t.is_finite() { t } else { 0.0 }
    }

    pub fn is_playing(&self) -> bool {
        !self.media.is_paused()
    }

    pub fn unmute_visible(&self) -> bool {
        self.pending_unmute
    }

    pub fn start_control_visible(&self) -> bool {
        self.start_control
    }

    pub fn play_pause_label(&self) -> &'static str {
        if self.media.is_paused() {
            PLAY_LABEL
        } else {
            PAUSE_LABEL
        }
    }

    pub fn time_display(&self) -> String {
        time_display(self.current_time(), self.media.duration())
            .unwrap_or_else(|| EMPTY_TIME_DISPLAY.to_string())
    }

    /// Unload whatever was playing and point the element at `src`, keeping
    /// the configured volume and speed.
    pub fn load(&mut self, src: &str) {
        self.media.pause();
        self.media.load(None);
        self.reset_affordances();
        self.state = PlayerState::Loading;
        self.media.load(Some(src));
        self.media.set_volume(self.volume);
        self.media.set_playback_rate(self.rate);
    }

    pub fn mark_ready(&mut self) {
        if self.state == PlayerState::Loading {
            self.state = PlayerState::Ready;
        }
    }

    pub fn close(&mut self) {
        self.media.pause();
        self.media.load(None);
        self.reset_affordances();
        self.state = PlayerState::Closed;
    }

    pub fn play(&mut self) -> Result<(), PlayRejected> {
        self.media.play()?;
        self.state = PlayerState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.media.pause();
        if matches!(self.state, PlayerState::Playing | PlayerState::Ready) {
            self.state = PlayerState::Paused;
        }
    }

    pub fn toggle(&mut self) {
        if self.media.is_paused() {
            if let Err(e) = self.play() {
                warn!(error = %e, "play request rejected");
            }
        } else {
            self.pause();
        }
    }

    /// Apply a slider value. Non-numeric input is ignored; the rest is clamped to `[0, 1]`.
    pub fn set_volume_input(&mut self, raw: &str) {
        if let Ok(v) = raw.trim().parse::<f64>() {
            self.set_volume(v);
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(self.volume);
    }

    pub fn set_speed_input(&mut self, raw: &str) {
        if let Ok(r) = raw.trim().parse::<f64>() {
            self.set_speed(r);
        }
    }

    pub fn set_speed(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }
        self.rate = rate;
        self.media.set_playback_rate(rate);
    }

    pub fn seek(&mut self, t: f64) {
        if t.is_finite() {
            self.media.seek(t.max(0.0));
        }
    }

    /// Drag on the seek bar started: hold playback so timeupdates do not fight the drag.
    pub fn begin_scrub(&mut self) {
        let was_playing = !self.media.is_paused();
        if was_playing {
            self.pause();
        }
        self.scrub_resume = Some(was_playing);
    }

    pub fn scrub_to(&mut self, t: f64) {
        self.seek(t);
    }

    /// Drag released: commit the position and resume if playback was running.
    pub fn end_scrub(&mut self, t: f64) {
        self.seek(t);
        if self.scrub_resume.take() == Some(true) {
            if let Err(e) = self.play() {
                warn!(error = %e, "resume after scrub rejected");
            }
        }
    }

    /// Try to start with sound; when the autoplay policy refuses, start muted
    /// and arm the one-shot unmute.
    pub fn autoplay(&mut self) -> AutoplayOutcome {
        self.media.set_muted(false);
        match self.play() {
            Ok(()) => {
                self.pending_unmute = false;
                AutoplayOutcome::WithSound
            }
            Err(e) => {
                debug!(error = %e, "unmuted autoplay refused, retrying muted");
                self.media.set_muted(true);
                match self.play() {
                    Ok(()) => {
                        self.pending_unmute = true;
                        AutoplayOutcome::Muted
                    }
                    Err(e) => {
                        warn!(error = %e, "muted autoplay refused");
                        AutoplayOutcome::Blocked
                    }
                }
            }
        }
    }

    /// Any user gesture after a muted autoplay restores sound once.
    /// Returns `true` when this gesture did the unmuting.
    pub fn on_gesture(&mut self, gesture: Gesture) -> bool {
        if !self.pending_unmute {
            return false;
        }
        debug!(?gesture, "unmuting after user gesture");
        self.pending_unmute = false;
        self.media.set_muted(false);
        self.media.set_volume(self.volume);
        if let Err(e) = self.play() {
            warn!(error = %e, "play after unmute rejected");
        }
        true
    }

    /// Single-video mode: show the start control instead of autoplaying.
    pub fn show_start_control(&mut self) {
        self.media.set_muted(false);
        self.start_control = true;
    }

    pub fn press_start(&mut self) {
        if !self.start_control {
            return;
        }
        self.start_control = false;
        self.media.set_muted(false);
        self.media.set_volume(self.volume);
        if let Err(e) = self.play() {
            debug!(error = %e, "manual start rejected");
        }
    }

    fn reset_affordances(&mut self) {
        self.scrub_resume = None;
        self.pending_unmute = false;
        self.start_control = false;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedMedia;
    use super::*;

    #[test]
    fn muted_fallback_then_first_gesture_unmutes() {
        let mut player = PlaybackController::new(ScriptedMedia::rejecting(1));
        player.load("/video/a.mp4");

        assert_eq!(player.autoplay(), AutoplayOutcome::Muted);
        assert!(player.media().muted);
        assert!(!player.media().paused);
        assert!(player.unmute_visible());
        assert_eq!(player.media().play_calls, 2);

        assert!(player.on_gesture(Gesture::Pointer));
        assert!(!player.media().muted);
        assert!(!player.unmute_visible());

        player.media_mut().muted = true;
        assert!(!player.on_gesture(Gesture::Key));
        assert!(player.media().muted);
    }

    #[test]
    fn autoplay_with_sound_keeps_control_hidden() {
        let mut player = PlaybackController::new(ScriptedMedia::new());
        player.load("/video/a.mp4");
        assert_eq!(player.autoplay(), AutoplayOutcome::WithSound);
        assert!(!player.unmute_visible());
        assert!(!player.on_gesture(Gesture::Touch));
        assert_eq!(player.state(), PlayerState::Playing);
    }

    #[test]
    fn autoplay_can_be_blocked_entirely() {
        let mut player = PlaybackController::new(ScriptedMedia::rejecting(2));
        player.load("/video/a.mp4");
        assert_eq!(player.autoplay(), AutoplayOutcome::Blocked);
        assert!(!player.unmute_visible());
        assert!(player.media().paused);
    }

    #[test]
    fn scrub_resumes_only_if_playing() {
        let mut player = PlaybackController::new(ScriptedMedia::new());
        player.load("/video/a.mp4");
        player.play().unwrap();

        player.begin_scrub();
        assert!(player.media().paused);
        player.scrub_to(30.0);
        player.end_scrub(42.0);
        assert_eq!(player.media().time, 42.0);
        assert!(!player.media().paused);

        player.pause();
        player.begin_scrub();
        player.end_scrub(10.0);
        assert!(player.media().paused);
    }

    #[test]
    fn volume_and_speed_inputs() {
        let mut player = PlaybackController::new(ScriptedMedia::new());
        player.set_volume_input("1.7");
        assert_eq!(player.media().volume, 1.0);
        player.set_volume_input("0.3");
        assert_eq!(player.volume(), 0.3);
        player.set_volume_input("loud");
        assert_eq!(player.volume(), 0.3);

        player.set_speed_input("1.5");
        assert_eq!(player.media().rate, 1.5);
        player.set_speed_input("0");
        player.set_speed_input("fast");
        assert_eq!(player.rate(), 1.5);

        player.load("/video/b.mp4");
        assert_eq!(player.media().volume, 0.3);
        assert_eq!(player.media().rate, 1.5);
    }

    #[test]
    fn labels_and_time_display() {
        let mut player = PlaybackController::new(ScriptedMedia::new());
        assert_eq!(player.play_pause_label(), PLAY_LABEL);
        assert_eq!(player.time_display(), EMPTY_TIME_DISPLAY);
        player.media_mut().duration = 125.0;
        player.seek(61.0);
        player.toggle();
        assert_eq!(player.play_pause_label(), PAUSE_LABEL);
        assert_eq!(player.time_display(), "01:01 / 02:05");
    }

    #[test]
    fn toggle_flips_between_play_and_pause() {
        let mut player = PlaybackController::new(ScriptedMedia::rejecting(1));
        player.load("/video/a.mp4");

        // a rejected play leaves the player paused
        player.toggle();
        assert!(player.media().paused);
        assert_eq!(player.play_pause_label(), PLAY_LABEL);

        player.toggle();
        assert!(player.is_playing());
        player.toggle();
        assert!(!player.is_playing());
        assert_eq!(player.play_pause_label(), PLAY_LABEL);
    }

    #[test]
    fn start_control_plays_with_sound() {
        let mut player = PlaybackController::new(ScriptedMedia::new());
        player.load("/video/a.mp4");
        player.show_start_control();
        assert!(player.start_control_visible());
        player.press_start();
        assert!(!player.start_control_visible());
        assert!(!player.media().muted);
        assert!(!player.media().paused);
    }

    #[test]
    fn close_resets_state() {
        let mut player = PlaybackController::new(ScriptedMedia::rejecting(1));
        player.load("/video/a.mp4");
        player.autoplay();
        player.close();
        assert_eq!(player.state(), PlayerState::Closed);
        assert!(!player.unmute_visible());
        assert!(player.media().src.is_none());
    }
}
