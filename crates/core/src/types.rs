use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Suggestion item as the backend sends it, timestamps still in `HH:MM:SS`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSuggestion {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Lecturer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTurn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TurnKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normy: Option<f64>,
}

impl DialogTurn {
    pub fn student(text: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            text: text.into(),
            kind: None,
            normx: None,
            normy: None,
        }
    }

    pub fn lecturer(text: impl Into<String>) -> Self {
        Self {
            role: Role::Lecturer,
            ..Self::student(text)
        }
    }

    pub fn frame(text: impl Into<String>, point: ClickPoint) -> Self {
        Self {
            kind: Some(TurnKind::Frame),
            normx: Some(point.x),
            normy: Some(point.y),
            ..Self::student(text)
        }
    }

    pub fn click_point(&self) -> Option<ClickPoint> {
        match (self.normx, self.normy) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(ClickPoint::new(x, y)),
            _ => None,
        }
    }
}

/// Click position inside the video frame, both axes normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickPoint {
    pub x: f64,
    pub y: f64,
}

impl ClickPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    /// Normalize a pixel position relative to a `width` x `height` rectangle.
    pub fn from_pixels(px: f64, py: f64, width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::default();
        }
        Self::new(px / width, py / height)
    }
}

impl Default for ClickPoint {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub time: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub name: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubtitlesResponse {
    #[serde(default)]
    pub segments: Vec<SubtitleSegment>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SuggestionsResponse {
    #[serde(default)]
    pub items: Vec<RawSuggestion>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnswerResponse {
    pub answer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SummaryResponse {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LogsResponse {
    #[serde(default)]
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest<'a> {
    pub name: &'a str,
    pub current_time: f64,
    pub dialog: &'a [DialogTurn],
    pub question: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainFrameRequest<'a> {
    pub name: &'a str,
    pub current_time: f64,
    pub image: &'a str,
}
