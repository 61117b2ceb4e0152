//! Remote generation boundary.
//!
//! Everything the lifecycle needs from the generative service goes through
//! [`RemoteGenerationClient`]. One instance is built at startup and shared
//! as `Arc<dyn RemoteGenerationClient>`.

mod credential;
mod gemini;

pub use credential::{EnvKeySelector, KeySelector, NoopKeySelector};
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::error::ClientError;
use crate::scene::ImageSize;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Opaque reference to a long-running video generation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Snapshot of a video job as reported by one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatus {
    pub done: bool,
    /// Location of the produced video, when the job finished with one
    pub result_uri: Option<String>,
    /// Service-reported failure for a finished job
    pub error: Option<String>,
}

impl JobStatus {
    pub fn running() -> Self {
        Self::default()
    }

    pub fn finished(result_uri: Option<String>) -> Self {
        Self {
            done: true,
            result_uri,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            done: true,
            result_uri: None,
            error: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait RemoteGenerationClient: Send + Sync {
    /// JSON content constrained by `schema`.
    async fn generate_structured_content(
        &self,
        system_instruction: &str,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> ClientResult<serde_json::Value>;

    /// Returns a `data:` URI holding the generated image.
    async fn generate_image(&self, prompt: &str, size: ImageSize) -> ClientResult<String>;

    async fn generate_video(&self, prompt: &str) -> ClientResult<JobHandle>;

    async fn poll_job(&self, job: &JobHandle) -> ClientResult<JobStatus>;

    /// Download binary content produced by a finished job.
    async fn fetch_media(&self, uri: &str) -> ClientResult<Vec<u8>>;

    /// `history` is the transcript before `message`.
    async fn chat(&self, message: &str, history: &[ChatMessage]) -> ClientResult<String>;
}
