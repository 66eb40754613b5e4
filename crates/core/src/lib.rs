//! Lectern Core Library
//!
//! Client side of a video-lecture player: backend API, playback control,
//! subtitle sync, lecturer chat and frame explanations.

pub mod api;
pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod frame;
pub mod library;
pub mod markdown;
pub mod playback;
pub mod polling;
pub mod session;
pub mod subtitles;
pub mod suggestions;
pub mod types;
pub mod upload;

// Re-export commonly used items at crate root
pub use api::{HttpApi, LectureApi};
pub use config::{AppConfig, LaunchMode};
pub use controller::{LectureController, StartMode, TimeUpdate};
pub use error::{LecternError, Result};
pub use format::{format_clock, parse_position};
pub use frame::FrameSource;
pub use markdown::render_markdown;
pub use playback::{Gesture, MediaElement, PlayRejected, PlayerState};
pub use session::{Session, Tab};
pub use types::{ClickPoint, DialogTurn, LogEntry, SubtitleSegment, VideoEntry};
