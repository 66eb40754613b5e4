use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{api::LectureApi, types::SubtitleSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    Subtitles,
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Subtitles(Vec<SubtitleSegment>),
    Summary(String),
}

/// A poll result stamped with the session that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PollEvent {
    pub session_id: Uuid,
    pub outcome: PollOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPlan {
    pub attempts: u32,
    pub delay: Duration,
}

/// Background retries for resources the backend is still producing.
/// Each task waits `delay` before every attempt and stops at the first
/// non-empty result; nothing is sent when the attempts run out.
pub struct Poller {
    tx: mpsc::UnboundedSender<PollEvent>,
    tasks: Vec<(Uuid, PollKind, JoinHandle<()>)>,
}

impl Poller {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                tasks: Vec::new(),
            },
            rx,
        )
    }

    pub fn start(
        &mut self,
        api: Arc<dyn LectureApi>,
        session_id: Uuid,
        kind: PollKind,
        name: String,
        plan: PollPlan,
    ) {
        self.tasks.retain(|(_, _, handle)| !handle.is_finished());

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            for attempt in 1..=plan.attempts {
                sleep(plan.delay).await;
                debug!(video = %name, ?kind, attempt, "polling");
                if let Some(outcome) = fetch(api.as_ref(), kind, &name).await {
                    info!(video = %name, ?kind, attempt, "poll succeeded");
                    let _ = tx.send(PollEvent {
                        session_id,
                        outcome,
                    });
                    return;
                }
            }
            info!(video = %name, ?kind, attempts = plan.attempts, "poll gave up");
        });
        self.tasks.push((session_id, kind, handle));
    }

    /// Abort every task started for `session_id`.
    pub fn cancel(&mut self, session_id: Uuid) {
        self.tasks.retain(|(id, _, handle)| {
            if *id == session_id {
                handle.abort();
                false
            } else {
                true
            }
        });
    }

    pub fn cancel_all(&mut self) {
        for (_, _, handle) in self.tasks.drain(..) {
            handle.abort();
        }
    }

    pub fn is_running(&self, session_id: Uuid, kind: PollKind) -> bool {
        self.tasks
            .iter()
            .any(|(id, k, handle)| *id == session_id && *k == kind && !handle.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn fetch(api: &dyn LectureApi, kind: PollKind, name: &str) -> Option<PollOutcome> {
    match kind {
        PollKind::Subtitles => match api.subtitles(name).await {
            Ok(segments) if !segments.is_empty() => Some(PollOutcome::Subtitles(segments)),
            Ok(_) => None,
            Err(e) => {
                debug!(video = %name, error = %e, "subtitle poll failed");
                None
            }
        },
        PollKind::Summary => match api.summary(name).await {
            Ok(text) if !text.trim().is_empty() => Some(PollOutcome::Summary(text)),
            Ok(_) => None,
            Err(e) => {
                debug!(video = %name, error = %e, "summary poll failed");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use tokio::time::timeout;

    use super::*;
    use crate::{api::testing::ScriptedApi, error::LecternError};

    const PLAN: PollPlan = PollPlan {
        attempts: 12,
        delay: Duration::from_secs(5),
    };

    fn seg(text: &str) -> SubtitleSegment {
        SubtitleSegment {
            start: 0.0,
            end: 1.0,
            text: text.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_non_empty_result() {
        let api = Arc::new(ScriptedApi {
            subtitles: VecDeque::from([
                Ok(vec![]),
                Err(LecternError::Backend("busy".into())),
                Ok(vec![seg("hello")]),
            ])
            .into(),
            ..Default::default()
        });
        let (mut poller, mut rx) = Poller::new();
        let session = Uuid::new_v4();
        let started = tokio::time::Instant::now();
        poller.start(api.clone(), session, PollKind::Subtitles, "a.mp4".into(), PLAN);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id, session);
        assert_eq!(event.outcome, PollOutcome::Subtitles(vec![seg("hello")]));
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_eq!(api.count("GET /subtitles/a.mp4.json"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_silently_after_last_attempt() {
        let api = Arc::new(ScriptedApi::default());
        let (mut poller, mut rx) = Poller::new();
        let plan = PollPlan {
            attempts: 3,
            delay: Duration::from_secs(5),
        };
        poller.start(api.clone(), Uuid::new_v4(), PollKind::Summary, "a.mp4".into(), plan);

        assert!(timeout(Duration::from_secs(60), rx.recv()).await.is_err());
        assert_eq!(api.count("GET /summary/a.mp4"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_session_sends_nothing() {
        let api = Arc::new(ScriptedApi {
            summaries: VecDeque::from(["ready".to_string()]).into(),
            ..Default::default()
        });
        let (mut poller, mut rx) = Poller::new();
        let old = Uuid::new_v4();
        let current = Uuid::new_v4();
        poller.start(api.clone(), old, PollKind::Summary, "a.mp4".into(), PLAN);
        poller.start(api.clone(), current, PollKind::Subtitles, "b.mp4".into(), PLAN);
        assert!(poller.is_running(old, PollKind::Summary));
        assert!(!poller.is_running(old, PollKind::Subtitles));

        poller.cancel(old);
        assert!(!poller.is_running(old, PollKind::Summary));
        assert!(poller.is_running(current, PollKind::Subtitles));

        assert!(timeout(Duration::from_secs(120), rx.recv()).await.is_err());
        assert_eq!(api.count("GET /summary/a.mp4"), 0);
        assert_eq!(api.count("GET /subtitles/b.mp4.json"), 12);
    }
}
