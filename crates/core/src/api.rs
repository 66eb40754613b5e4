use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Response, multipart};
use tracing::debug;

use crate::{
    error::{LecternError, Result},
    types::{
        AnswerResponse, ChatRequest, ExplainFrameRequest, LogEntry, LogsResponse, RawSuggestion,
        SubtitleSegment, SubtitlesResponse, SuggestionsResponse, SummaryResponse, UploadResponse,
        VideoEntry,
    },
};

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, URI_COMPONENT).to_string()
}

pub const UPLOAD_FAILED: &str = "Upload failed";

/// Everything the player needs from the lecture backend.
#[async_trait]
pub trait LectureApi: Send + Sync {
    async fn list_videos(&self) -> Result<Vec<VideoEntry>>;
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<VideoEntry>;
    async fn delete_video(&self, name: &str) -> Result<()>;
    async fn subtitles(&self, name: &str) -> Result<Vec<SubtitleSegment>>;
    async fn suggestions(&self, name: &str) -> Result<Vec<RawSuggestion>>;
    async fn ensure_processed(&self, name: &str) -> Result<()>;
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>>;
    async fn explain_frame(&self, request: &ExplainFrameRequest<'_>) -> Result<Option<String>>;
    async fn summary(&self, name: &str) -> Result<String>;
    async fn logs(&self, name: &str) -> Result<Vec<LogEntry>>;
    async fn clear_logs(&self, name: &str) -> Result<()>;
}

pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn resolve(&self, url: &str) -> String {
        resolve_url(&self.base_url, url)
    }
}

/// Backend URLs are usually relative to the server root.
pub fn resolve_url(base_url: &str, url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// Where the backend serves a video by name.
pub fn video_url(base_url: &str, name: &str) -> String {
    resolve_url(base_url, &format!("/video/{}", encode_name(name)))
}

async fn ensure_success(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(LecternError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl LectureApi for HttpApi {
    async fn list_videos(&self) -> Result<Vec<VideoEntry>> {
        let response = self.client.get(self.url("/videos")).send().await?;
        let mut videos: Vec<VideoEntry> = ensure_success(response, "/videos")
            .await?
            .json()
            .await?;
        for video in &mut videos {
            video.url = self.resolve(&video.url);
        }
        debug!(count = videos.len(), "listed videos");
        Ok(videos)
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<VideoEntry> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;

        let ok = response.status().is_success();
        let body: UploadResponse = response.json().await?;
        match (ok, body) {
            (
                true,
                UploadResponse {
                    name: Some(name),
                    url: Some(url),
                    ..
                },
            ) => Ok(VideoEntry {
                url: self.resolve(&url),
                name,
            }),
            (_, UploadResponse { error: Some(e), .. }) => Err(LecternError::Backend(e)),
            _ => Err(LecternError::Backend(UPLOAD_FAILED.to_string())),
        }
    }

    async fn delete_video(&self, name: &str) -> Result<()> {
        let path = format!("/video/{}", encode_name(name));
        let response = self.client.delete(self.url(&path)).send().await?;
        ensure_success(response, &path).await?;
        Ok(())
    }

    async fn subtitles(&self, name: &str) -> Result<Vec<SubtitleSegment>> {
        let path = format!("/subtitles/{}.json", encode_name(name));
        let response = self.client.get(self.url(&path)).send().await?;
        let body: SubtitlesResponse = ensure_success(response, &path).await?.json().await?;
        Ok(body.segments)
    }

    async fn suggestions(&self, name: &str) -> Result<Vec<RawSuggestion>> {
        let path = format!("/suggestions/{}", encode_name(name));
        let response = self.client.get(self.url(&path)).send().await?;
        let body: SuggestionsResponse = ensure_success(response, &path).await?.json().await?;
        Ok(body.items)
    }

    async fn ensure_processed(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/api/ensure_processed"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        ensure_success(response, "/api/ensure_processed").await?;
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await?;
        let body: AnswerResponse = ensure_success(response, "/api/chat").await?.json().await?;
        Ok(body.answer)
    }

    async fn explain_frame(&self, request: &ExplainFrameRequest<'_>) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.url("/api/explain_frame"))
            .json(request)
            .send()
            .await?;
        let body: AnswerResponse = ensure_success(response, "/api/explain_frame")
            .await?
            .json()
            .await?;
        Ok(body.answer)
    }

    async fn summary(&self, name: &str) -> Result<String> {
        let path = format!("/summary/{}", encode_name(name));
        let response = self.client.get(self.url(&path)).send().await?;
        let body: SummaryResponse = ensure_success(response, &path).await?.json().await?;
        Ok(body.text)
    }

    async fn logs(&self, name: &str) -> Result<Vec<LogEntry>> {
        let path = format!("/logs/{}", encode_name(name));
        let response = self.client.get(self.url(&path)).send().await?;
        let body: LogsResponse = ensure_success(response, &path).await?.json().await?;
        Ok(body.entries)
    }

    async fn clear_logs(&self, name: &str) -> Result<()> {
        let path = format!("/logs/{}", encode_name(name));
        let response = self.client.delete(self.url(&path)).send().await?;
        ensure_success(response, &path).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;

    /// In-memory backend. Scripted responses are consumed in order; once a
    /// script runs dry the call returns an empty result.
    #[derive(Default)]
    pub struct ScriptedApi {
        pub videos: Mutex<Vec<VideoEntry>>,
        pub subtitles: Mutex<VecDeque<Result<Vec<SubtitleSegment>>>>,
        pub summaries: Mutex<VecDeque<String>>,
        pub suggestions: Mutex<Vec<RawSuggestion>>,
        pub answers: Mutex<VecDeque<Result<Option<String>>>>,
        pub logs: Mutex<Vec<LogEntry>>,
        pub fail_delete: bool,
        pub fail_upload: Option<String>,
        /// Time the upload request takes to answer
        pub upload_latency: Option<std::time::Duration>,
        /// `"METHOD path"` for every call, in order
        pub calls: Mutex<Vec<String>>,
        /// `(question, dialog length)` per chat request
        pub chats: Mutex<Vec<(String, usize)>>,
        pub frames: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
        }

        fn next_answer(&self) -> Result<Option<String>> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some("ok".to_string())))
        }
    }

    #[async_trait]
    impl LectureApi for ScriptedApi {
        async fn list_videos(&self) -> Result<Vec<VideoEntry>> {
            self.record("GET /videos".into());
            Ok(self.videos.lock().unwrap().clone())
        }

        async fn upload(&self, file_name: &str, _bytes: Vec<u8>) -> Result<VideoEntry> {
            self.record("POST /upload".into());
            if let Some(latency) = self.upload_latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(e) = &self.fail_upload {
                return Err(LecternError::Backend(e.clone()));
            }
            let entry = VideoEntry {
                name: file_name.to_string(),
                url: format!("/video/{}", encode_name(file_name)),
            };
            self.videos.lock().unwrap().push(entry.clone());
            Ok(entry)
        }

        async fn delete_video(&self, name: &str) -> Result<()> {
            let path = format!("/video/{}", encode_name(name));
            self.record(format!("DELETE {path}"));
            if self.fail_delete {
                return Err(LecternError::Status {
                    endpoint: path,
                    status: 500,
                });
            }
            self.videos.lock().unwrap().retain(|v| v.name != name);
            Ok(())
        }

        async fn subtitles(&self, name: &str) -> Result<Vec<SubtitleSegment>> {
            self.record(format!("GET /subtitles/{}.json", encode_name(name)));
            self.subtitles.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn suggestions(&self, name: &str) -> Result<Vec<RawSuggestion>> {
            self.record(format!("GET /suggestions/{}", encode_name(name)));
            Ok(self.suggestions.lock().unwrap().clone())
        }

        async fn ensure_processed(&self, _name: &str) -> Result<()> {
            self.record("POST /api/ensure_processed".into());
            Ok(())
        }

        async fn chat(&self, request: &ChatRequest<'_>) -> Result<Option<String>> {
            self.record("POST /api/chat".into());
            self.chats
                .lock()
                .unwrap()
                .push((request.question.to_string(), request.dialog.len()));
            self.next_answer()
        }

        async fn explain_frame(&self, request: &ExplainFrameRequest<'_>) -> Result<Option<String>> {
            self.record("POST /api/explain_frame".into());
            self.frames.lock().unwrap().push(request.image.to_string());
            self.next_answer()
        }

        async fn summary(&self, name: &str) -> Result<String> {
            self.record(format!("GET /summary/{}", encode_name(name)));
            Ok(self.summaries.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn logs(&self, name: &str) -> Result<Vec<LogEntry>> {
            self.record(format!("GET /logs/{}", encode_name(name)));
            Ok(self.logs.lock().unwrap().clone())
        }

        async fn clear_logs(&self, name: &str) -> Result<()> {
            self.record(format!("DELETE /logs/{}", encode_name(name)));
            self.logs.lock().unwrap().clear();
            Ok(())
        }
    }
}
