use crate::{
    markdown::{escape_html, render_markdown},
    types::{ClickPoint, DialogTurn, Role, TurnKind},
};

pub const NO_ANSWER: &str = "No answer";
pub const FRAME_QUESTION: &str = "Explain this fragment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleStatus {
    /// Loader shown while the request is in flight
    Pending,
    Done,
    Failed,
}

/// One rendered chat entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub role: Role,
    pub text: String,
    pub html: String,
    pub status: BubbleStatus,
    /// Set on entries that belong to a frame explanation
    pub frame: Option<ClickPoint>,
}

/// Handle for an answer that has not arrived yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReply {
    pub bubble: usize,
    pub question: String,
}

/// The backend reports model failures inside a normal answer, worded
/// "Ошибка обращения к LLM". Matching is case-insensitive.
pub fn answer_signals_failure(answer: &str) -> bool {
    answer.to_lowercase().contains("ошибка")
}

/// Chat transcript of the current session with the single in-flight guard.
#[derive(Debug, Default)]
pub struct ChatPanel {
    dialog: Vec<DialogTurn>,
    bubbles: Vec<Bubble>,
    busy: bool,
}

impl ChatPanel {
    pub fn dialog(&self) -> &[DialogTurn] {
        &self.dialog
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Input, send button and explain button share this state.
    pub fn inputs_enabled(&self) -> bool {
        !self.busy
    }

    pub fn clear(&mut self) {
        self.dialog.clear();
        self.bubbles.clear();
        self.busy = false;
    }

    /// Append the question and a loader. `None` when the question is blank or
    /// another request is still outstanding; the transcript is left untouched.
    pub fn begin_question(&mut self, question: &str) -> Option<PendingReply> {
        let question = question.trim();
        if question.is_empty() || self.busy {
            return None;
        }
        self.dialog.push(DialogTurn::student(question));
        self.push_student_bubble(question, None);
        Some(self.open_reply(question, None))
    }

    /// Same as [`begin_question`](Self::begin_question) for a frame explanation,
    /// tagging both entries with the click position.
    pub fn begin_frame(&mut self, point: ClickPoint) -> Option<PendingReply> {
        if self.busy {
            return None;
        }
        self.dialog.push(DialogTurn::frame(FRAME_QUESTION, point));
        self.push_student_bubble(FRAME_QUESTION, Some(point));
        Some(self.open_reply(FRAME_QUESTION, Some(point)))
    }

    /// Fill the loader with the answer, or with the error text on failure.
    pub fn complete(&mut self, pending: &PendingReply, outcome: Result<Option<String>, String>) {
        self.busy = false;
        let Some(bubble) = self.bubbles.get_mut(pending.bubble) else {
            return;
        };

        match outcome {
            Ok(answer) => {
                let answer = answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                let failed = answer_signals_failure(&answer);
                bubble.html = render_markdown(&answer);
                bubble.status = if failed {
                    BubbleStatus::Failed
                } else {
                    BubbleStatus::Done
                };
                bubble.text = answer.clone();
                if !failed {
                    let mut turn = DialogTurn::lecturer(answer);
                    if let Some(point) = bubble.frame {
                        turn.normx = Some(point.x);
                        turn.normy = Some(point.y);
                        turn.kind = Some(TurnKind::Frame);
                    }
                    self.dialog.push(turn);
                }
            }
            Err(message) => {
                bubble.html = escape_html(&message);
                bubble.text = message;
                bubble.status = BubbleStatus::Failed;
            }
        }
    }

    /// Marker position to replay when the user picks a chat entry. Entries not
    /// tied to a frame yield `None`.
    pub fn replay_point(&self, bubble: usize) -> Option<ClickPoint> {
        self.bubbles.get(bubble).and_then(|b| b.frame)
    }

    fn push_student_bubble(&mut self, text: &str, frame: Option<ClickPoint>) {
        self.bubbles.push(Bubble {
            role: Role::Student,
            text: text.to_string(),
            html: escape_html(text),
            status: BubbleStatus::Done,
            frame,
        });
    }

    fn open_reply(&mut self, question: &str, frame: Option<ClickPoint>) -> PendingReply {
        self.bubbles.push(Bubble {
            role: Role::Lecturer,
            text: String::new(),
            html: String::new(),
            status: BubbleStatus::Pending,
            frame,
        });
        self.busy = true;
        PendingReply {
            bubble: self.bubbles.len() - 1,
            question: question.to_string(),
        }
    }
}
