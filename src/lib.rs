//! TubeMagic: one prompt in, a YouTube production package out.
//!
//! Scripts and metadata come from a single structured generation call;
//! per-scene images and videos are generated on demand and tracked by
//! [`asset::AssetLifecycleController`].

pub mod api;
pub mod asset;
pub mod chat;
pub mod config;
pub mod error;
pub mod project;
pub mod scene;

pub use api::{GeminiClient, JobHandle, JobStatus, KeySelector, RemoteGenerationClient};
pub use asset::{AssetLifecycleController, MediaDir, PollPolicy};
pub use chat::{ChatController, ChatMessage, ChatRole};
pub use config::Config;
pub use error::{AssetError, ChatError, ClientError, GenerationError, Result, StoreError, TubeMagicError};
pub use project::{FileStorage, KeyValueStorage, MemoryStorage, Project, ProjectStore};
pub use scene::{AssetKind, AssetStatus, ImageSize, Scene, SceneOutput};
