//! Scripted in-memory generation service shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

use tubemagic::api::{ClientResult, KeySelector};
use tubemagic::project::{FileStorage, KeyValueStorage, MemoryStorage, ProjectStore};
use tubemagic::{
    AssetLifecycleController, ChatMessage, ClientError, ImageSize, JobHandle, JobStatus, MediaDir,
    PollPolicy, RemoteGenerationClient, StoreError,
};

pub const IMAGE_URI: &str = "data:image/png;base64,iVBORw0KGgo=";
pub const VIDEO_URI: &str = "https://files.example/video.mp4";

pub enum Reply {
    Ok(String),
    Fail,
    EntityNotFound,
}

/// One scripted image response, optionally held until `gate` is notified.
pub struct ImageStep {
    pub reply: Reply,
    pub gate: Option<Arc<Notify>>,
}

#[derive(Default)]
pub struct FakeClient {
    pub package: Mutex<Option<Value>>,
    pub images: Mutex<VecDeque<ImageStep>>,
    pub polls: Mutex<VecDeque<ClientResult<JobStatus>>>,
    pub video_submit_fails: AtomicBool,
    pub chat_reply: Mutex<Option<String>>,

    /// Notified each time an image request reaches the service
    pub image_entered: Arc<Notify>,
    pub image_calls: Mutex<Vec<(String, ImageSize)>>,
    pub poll_count: AtomicU32,
    pub chat_histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeClient {
    pub fn new() -> Self {
        let client = Self::default();
        *client.package.lock() = Some(sample_package(3));
        *client.chat_reply.lock() = Some("Try a question in the title.".into());
        client
    }

    pub fn with_package(self, package: Option<Value>) -> Self {
        *self.package.lock() = package;
        self
    }

    pub fn push_image(&self, reply: Reply, gate: Option<Arc<Notify>>) {
        self.images.lock().push_back(ImageStep { reply, gate });
    }

    pub fn push_polls(&self, statuses: impl IntoIterator<Item = JobStatus>) {
        self.polls.lock().extend(statuses.into_iter().map(Ok));
    }

    pub fn push_poll_error(&self, error: ClientError) {
        self.polls.lock().push_back(Err(error));
    }
}

#[async_trait]
impl RemoteGenerationClient for FakeClient {
    async fn generate_structured_content(
        &self,
        _system_instruction: &str,
        _prompt: &str,
        _schema: &Value,
    ) -> ClientResult<Value> {
        self.package.lock().clone().ok_or(ClientError::Api {
            status: 500,
            message: "internal".into(),
        })
    }

    async fn generate_image(&self, prompt: &str, size: ImageSize) -> ClientResult<String> {
        self.image_calls.lock().push((prompt.to_string(), size));
        let step = self.images.lock().pop_front();
        self.image_entered.notify_one();

        let Some(step) = step else {
            return Ok(IMAGE_URI.to_string());
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        match step.reply {
            Reply::Ok(uri) => Ok(uri),
            Reply::Fail => Err(ClientError::Api {
                status: 429,
                message: "quota exceeded".into(),
            }),
            Reply::EntityNotFound => Err(ClientError::EntityNotFound(
                "Requested entity was not found.".into(),
            )),
        }
    }

    async fn generate_video(&self, _prompt: &str) -> ClientResult<JobHandle> {
        if self.video_submit_fails.load(Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 400,
                message: "bad prompt".into(),
            });
        }
        Ok(JobHandle("operations/fake".into()))
    }

    async fn poll_job(&self, _job: &JobHandle) -> ClientResult<JobStatus> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        self.polls
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatus::running()))
    }

    async fn fetch_media(&self, _uri: &str) -> ClientResult<Vec<u8>> {
        Ok(b"fake mp4 bytes".to_vec())
    }

    async fn chat(&self, _message: &str, history: &[ChatMessage]) -> ClientResult<String> {
        self.chat_histories.lock().push(history.to_vec());
        self.chat_reply.lock().clone().ok_or(ClientError::Api {
            status: 503,
            message: "unavailable".into(),
        })
    }
}

/// Selector that records how often the user was asked for a key.
pub struct RecordingSelector {
    pub selected: bool,
    pub prompts: AtomicUsize,
}

impl RecordingSelector {
    pub fn new(selected: bool) -> Self {
        Self {
            selected,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySelector for RecordingSelector {
    async fn has_selected_key(&self) -> bool {
        self.selected
    }

    async fn open_select_key(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub client: Arc<FakeClient>,
    pub keys: Arc<RecordingSelector>,
    pub store: Arc<ProjectStore>,
    pub assets: Arc<AssetLifecycleController>,
    pub dir: TempDir,
}

pub fn harness(client: FakeClient) -> Harness {
    harness_with(client, RecordingSelector::new(true), PollPolicy::default())
}

pub fn harness_with(client: FakeClient, keys: RecordingSelector, policy: PollPolicy) -> Harness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage = Box::new(FileStorage::new(dir.path()));
    build(dir, storage, client, keys, policy)
}

/// Harness whose history lives in `storage` instead of the temp dir.
pub fn harness_on(client: FakeClient, storage: Box<dyn KeyValueStorage>) -> Harness {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    build(dir, storage, client, RecordingSelector::new(true), PollPolicy::default())
}

fn build(
    dir: TempDir,
    storage: Box<dyn KeyValueStorage>,
    client: FakeClient,
    keys: RecordingSelector,
    policy: PollPolicy,
) -> Harness {
    let client = Arc::new(client);
    let keys = Arc::new(keys);
    let store = Arc::new(ProjectStore::open(client.clone(), storage, 15));
    let assets = Arc::new(AssetLifecycleController::new(
        client.clone(),
        store.clone(),
        keys.clone(),
        MediaDir::new(dir.path().join("media")),
        policy,
    ));

    Harness {
        client,
        keys,
        store,
        assets,
        dir,
    }
}

/// In-memory storage whose writes fail while `failing` is set.
#[derive(Default)]
pub struct FlakyStorage {
    pub failing: Arc<AtomicBool>,
    inner: MemoryStorage,
}

impl FlakyStorage {
    pub fn new(failing: Arc<AtomicBool>) -> Self {
        Self {
            failing,
            inner: MemoryStorage::new(),
        }
    }
}

impl KeyValueStorage for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }
}

pub fn poll_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(5),
        max_attempts,
    }
}

pub fn sample_package(scenes: usize) -> Value {
    let scenes: Vec<Value> = (0..scenes)
        .map(|i| {
            json!({
                "text": format!("Habit number {}.", i + 1),
                "visualPrompt": format!("Cinematic morning shot {}", i + 1)
            })
        })
        .collect();

    json!({
        "script": "Five habits that change your mornings. Habit number 1...",
        "voiceOver": "[energetic] Five habits.\n[calm] Habit number 1.",
        "scenes": scenes,
        "subtitles": "5 HABITS",
        "musicStyle": "uplifting lofi",
        "youtubeTitle": "5 Life-Changing Morning Habits",
        "youtubeDescription": "Start your day right.",
        "tags": ["morning routine", "habits", "productivity"],
        "hashtags": ["#shorts", "#morning"],
        "thumbnailText": "WAKE UP BETTER"
    })
}
