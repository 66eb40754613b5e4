use std::{path::Path, sync::Arc};

use tokio::{
    sync::mpsc,
    time::{Instant, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    api::{LectureApi, UPLOAD_FAILED, video_url},
    config::{AppConfig, LaunchMode},
    error::{LecternError, Result},
    frame::{FrameSource, capture_with_marker},
    library::Library,
    playback::{MediaElement, PlaybackController},
    polling::{PollEvent, PollKind, PollOutcome, PollPlan, Poller},
    session::{Session, SummaryView, Tab},
    suggestions::{Suggestion, parse_suggestions},
    types::{ChatRequest, ClickPoint, ExplainFrameRequest, VideoEntry},
    upload::{TRANSCRIBE_STEP_DELAY, UploadOverlay, UploadStep},
};

pub const DELETE_FAILED: &str = "Failed to delete the file";
pub const FRAME_CAPTURE_FAILED: &str = "Could not capture the frame";

/// How playback begins once a video is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Try with sound, fall back to muted
    Autoplay,
    /// Wait for the user to press the start control
    StartControl,
    Paused,
}

/// What changed on a playback time tick.
#[derive(Debug, Default, PartialEq)]
pub struct TimeUpdate {
    pub subtitle_changed: bool,
    pub suggestions: Option<Vec<Suggestion>>,
}

/// Owns the player, the video list and the open session, and is the only
/// place where backend calls and view state meet.
pub struct LectureController<M> {
    api: Arc<dyn LectureApi>,
    config: AppConfig,
    player: PlaybackController<M>,
    library: Library,
    upload: UploadOverlay,
    session: Option<Session>,
    poller: Poller,
    poll_events: mpsc::UnboundedReceiver<PollEvent>,
    notice: Option<String>,
}

impl<M: MediaElement> LectureController<M> {
    pub fn new(api: Arc<dyn LectureApi>, media: M, config: AppConfig) -> Self {
        let (poller, poll_events) = Poller::new();
        Self {
            api,
            config,
            player: PlaybackController::new(media),
            library: Library::default(),
            upload: UploadOverlay::default(),
            session: None,
            poller,
            poll_events,
            notice: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn player(&self) -> &PlaybackController<M> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlaybackController<M> {
        &mut self.player
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn upload_overlay(&self) -> &UploadOverlay {
        &self.upload
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Last user-facing error, cleared on read.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// The log panel only exists in list mode.
    pub fn log_panel_available(&self) -> bool {
        self.config.mode() == LaunchMode::List
    }

    fn subtitle_plan(&self) -> PollPlan {
        PollPlan {
            attempts: self.config.subtitle_poll_attempts,
            delay: self.config.poll_delay(),
        }
    }

    fn summary_plan(&self) -> PollPlan {
        PollPlan {
            attempts: self.config.summary_poll_attempts,
            delay: self.config.poll_delay(),
        }
    }

    /// List mode fetches the library; single-video mode opens the configured
    /// video behind the start control.
    pub async fn init(&mut self) {
        match self.config.mode() {
            LaunchMode::List => self.refresh_videos().await,
            LaunchMode::Single(name) => {
                info!(video = %name, "single-video mode");
                let video = VideoEntry {
                    url: video_url(&self.config.base_url, &name),
                    name,
                };
                self.load_video(video, StartMode::StartControl).await;
            }
        }
    }

    /// Failures keep the previous list.
    pub async fn refresh_videos(&mut self) {
        match self.api.list_videos().await {
            Ok(videos) => self.library.replace(videos),
            Err(e) => warn!(error = %e, "failed to fetch video list"),
        }
    }

    /// Open a listed video by name with autoplay.
    pub async fn open(&mut self, name: &str) -> Result<()> {
        if self.library.find(name).is_none() {
            self.refresh_videos().await;
        }
        let video = self
            .library
            .find(name)
            .cloned()
            .ok_or_else(|| LecternError::UnknownVideo(name.to_string()))?;
        self.load_video(video, StartMode::Autoplay).await;
        Ok(())
    }

    pub async fn upload_file(
        &mut self,
        path: &Path,
        on_step: impl FnMut(&UploadOverlay),
    ) -> Result<VideoEntry> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| LecternError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.upload(&file_name, bytes, on_step).await
    }

    /// Send the file while the overlay walks through its steps. On success
    /// the new video is opened paused and the list refreshed.
    pub async fn upload(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        mut on_step: impl FnMut(&UploadOverlay),
    ) -> Result<VideoEntry> {
        info!(file = %file_name, size = bytes.len(), "uploading");
        self.upload.show();
        on_step(&self.upload);

        let api = Arc::clone(&self.api);
        let request = api.upload(file_name, bytes);
        tokio::pin!(request);
        let result = tokio::select! {
            result = &mut request => result,
            _ = sleep(TRANSCRIBE_STEP_DELAY) => {
                self.upload.advance(UploadStep::Transcribe);
                on_step(&self.upload);
                request.await
            }
        };

        match result {
            Ok(video) => {
                self.upload.advance(UploadStep::Summarize);
                on_step(&self.upload);
                self.upload.finish(Instant::now());
                info!(video = %video.name, "upload finished");
                self.load_video(video.clone(), StartMode::Paused).await;
                self.refresh_videos().await;
                Ok(video)
            }
            Err(e) => {
                self.upload.finish(Instant::now());
                warn!(error = %e, "upload failed");
                self.notice = Some(match &e {
                    LecternError::Backend(message) => message.clone(),
                    _ => UPLOAD_FAILED.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Deleting the open video also closes it.
    pub async fn delete_video(&mut self, name: &str) -> Result<()> {
        if let Err(e) = self.api.delete_video(name).await {
            warn!(video = %name, error = %e, "delete failed");
            self.notice = Some(DELETE_FAILED.to_string());
            return Err(e);
        }
        info!(video = %name, "deleted");
        if self.session.as_ref().is_some_and(|s| s.name() == name) {
            self.close_video().await;
        }
        self.refresh_videos().await;
        Ok(())
    }

    /// Replace the session with one for `video`. Polls started for the
    /// previous video are cancelled; its backend log is left alone.
    pub async fn load_video(&mut self, video: VideoEntry, start: StartMode) {
        if let Some(old) = self.session.take() {
            debug!(video = %old.name(), "replacing session");
            self.poller.cancel(old.id);
        }

        info!(video = %video.name, ?start, "loading video");
        self.player.load(&video.url);
        match start {
            StartMode::Autoplay => {
                let outcome = self.player.autoplay();
                debug!(?outcome, "autoplay");
            }
            StartMode::StartControl => self.player.show_start_control(),
            StartMode::Paused => {}
        }

        let mut session = Session::new(video, self.config.suggestion_cap);
        let name = session.name().to_string();

        let segments = match self.api.subtitles(&name).await {
            Ok(segments) => segments,
            Err(e) => {
                debug!(video = %name, error = %e, "subtitles not available");
                Vec::new()
            }
        };
        if segments.is_empty() {
            if let Err(e) = self.api.ensure_processed(&name).await {
                warn!(video = %name, error = %e, "ensure_processed failed");
            }
            self.poller.start(
                Arc::clone(&self.api),
                session.id,
                PollKind::Subtitles,
                name.clone(),
                self.subtitle_plan(),
            );
        } else {
            session.subtitles.replace(segments);
        }

        let suggestions = match self.api.suggestions(&name).await {
            Ok(items) => parse_suggestions(&items),
            Err(e) => {
                debug!(video = %name, error = %e, "suggestions not available");
                Vec::new()
            }
        };
        session.suggestions.load(suggestions);

        self.session = Some(session);
    }

    /// The element has enough data to start.
    pub fn on_media_ready(&mut self) {
        self.player.mark_ready();
    }

    /// Reset everything tied to the open video and drop its backend log.
    /// Closing twice only clears the log once.
    pub async fn close_video(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.poller.cancel(session.id);
        self.player.close();
        info!(video = %session.name(), "closed");
        if let Err(e) = self.api.clear_logs(session.name()).await {
            warn!(video = %session.name(), error = %e, "failed to clear log");
        }
    }

    /// Move the subtitle highlight and the suggestion set to the current time.
    pub fn on_time_update(&mut self) -> TimeUpdate {
        let t = self.player.current_time();
        let Some(session) = self.session.as_mut() else {
            return TimeUpdate::default();
        };
        TimeUpdate {
            subtitle_changed: session.subtitles.sync(t),
            suggestions: session.suggestions.update(t),
        }
    }

    pub fn select_subtitle(&mut self, index: usize) -> bool {
        let Some(target) = self
            .session
            .as_ref()
            .and_then(|s| s.subtitles.seek_target(index))
        else {
            return false;
        };
        self.player.seek(target);
        self.on_time_update();
        true
    }

    /// Ask the lecturer. Returns `false` when nothing was sent: blank
    /// question, no video, or a request already in flight.
    pub async fn send_chat(&mut self, question: &str) -> bool {
        let current_time = self.player.current_time();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(pending) = session.chat.begin_question(question) else {
            return false;
        };

        debug!(video = %session.video.name, question = %pending.question, "chat request");
        let result = self
            .api
            .chat(&ChatRequest {
                name: &session.video.name,
                current_time,
                dialog: session.chat.dialog(),
                question: &pending.question,
            })
            .await;
        if let Err(e) = &result {
            warn!(video = %session.video.name, error = %e, "chat request failed");
        }
        session
            .chat
            .complete(&pending, result.map_err(|e| e.to_string()));
        true
    }

    /// Send the text of a visible suggestion as a question.
    pub async fn choose_suggestion(&mut self, key: &str) -> bool {
        let text = self.session.as_ref().and_then(|s| {
            s.suggestions
                .items()
                .iter()
                .find(|it| it.key == key)
                .map(|it| it.text.clone())
        });
        match text {
            Some(text) => self.send_chat(&text).await,
            None => false,
        }
    }

    pub fn click_video(&mut self, point: ClickPoint) {
        if let Some(session) = self.session.as_mut() {
            session.record_click(point, Instant::now());
        }
    }

    /// Capture the frame at the last click and ask the backend about it.
    /// Ignored without a video or while another request is in flight.
    pub async fn explain_frame(&mut self, source: &mut dyn FrameSource) -> bool {
        if self.session.as_ref().is_none_or(|s| s.chat.is_busy()) {
            return false;
        }
        if self.player.is_playing() {
            self.player.pause();
        }
        let current_time = self.player.current_time();
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let point = session.click_point();
        session.hide_tooltip();
        // the transcript only changes once there is a frame to send
        let image = match capture_with_marker(source, point) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "frame capture failed");
                self.notice = Some(format!("{FRAME_CAPTURE_FAILED}: {e}"));
                return false;
            }
        };
        let Some(pending) = session.chat.begin_frame(point) else {
            return false;
        };

        debug!(video = %session.video.name, x = point.x, y = point.y, "explain frame");
        let result = self
            .api
            .explain_frame(&ExplainFrameRequest {
                name: &session.video.name,
                current_time,
                image: &image,
            })
            .await;
        match &result {
            Ok(_) => session.annotate(point, Instant::now()),
            Err(e) => warn!(video = %session.video.name, error = %e, "explain request failed"),
        }
        session
            .chat
            .complete(&pending, result.map_err(|e| e.to_string()));
        true
    }

    /// Picking a chat entry tied to a frame shows its marker again.
    pub fn select_chat_entry(&mut self, bubble: usize) -> Option<ClickPoint> {
        let session = self.session.as_mut()?;
        let point = session.chat.replay_point(bubble)?;
        session.annotate(point, Instant::now());
        Some(point)
    }

    pub async fn select_tab(&mut self, tab: Tab) -> bool {
        if tab == Tab::Log && !self.log_panel_available() {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.tab = tab;
        match tab {
            Tab::Chat => {}
            Tab::About => self.load_summary().await,
            Tab::Log => self.load_log().await,
        }
        true
    }

    /// Fetch the summary; while it is empty keep polling in the background.
    pub async fn load_summary(&mut self) {
        let plan = self.summary_plan();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let name = session.name().to_string();
        match self.api.summary(&name).await {
            Ok(text) if !text.trim().is_empty() => session.summary = SummaryView::ready(text),
            Ok(_) => {
                session.summary = SummaryView::Pending;
                let id = session.id;
                if !self.poller.is_running(id, PollKind::Summary) {
                    self.poller
                        .start(Arc::clone(&self.api), id, PollKind::Summary, name, plan);
                }
            }
            Err(e) => warn!(video = %name, error = %e, "failed to fetch summary"),
        }
    }

    pub async fn load_log(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.api.logs(session.name()).await {
            Ok(entries) => session.log.replace(entries),
            Err(e) => warn!(video = %session.name(), error = %e, "failed to fetch log"),
        }
    }

    pub async fn clear_log(&mut self) {
        let Some(name) = self.session.as_ref().map(|s| s.name().to_string()) else {
            return;
        };
        match self.api.clear_logs(&name).await {
            Ok(()) => self.load_log().await,
            Err(e) => warn!(video = %name, error = %e, "failed to clear log"),
        }
    }

    /// Apply a poll result. Results for a session that is no longer open are
    /// dropped. Returns `true` when the view changed.
    pub fn apply_poll_event(&mut self, event: PollEvent) -> bool {
        let t = self.player.current_time();
        let Some(session) = self.session.as_mut().filter(|s| s.id == event.session_id) else {
            debug!(session = %event.session_id, "discarding stale poll result");
            return false;
        };
        match event.outcome {
            PollOutcome::Subtitles(segments) => {
                info!(video = %session.name(), count = segments.len(), "subtitles arrived");
                session.subtitles.replace(segments);
                session.subtitles.sync(t);
            }
            PollOutcome::Summary(text) => session.summary = SummaryView::ready(text),
        }
        true
    }

    /// Apply whatever poll results have already arrived.
    pub fn drain_poll_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.poll_events.try_recv() {
            if self.apply_poll_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next poll result without applying it.
    pub async fn next_poll_event(&mut self) -> Option<PollEvent> {
        self.poll_events.recv().await
    }
}
