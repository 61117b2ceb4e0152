use thiserror::Error;

use crate::scene::AssetKind;

/// Failures at the remote generation boundary.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The selected credential no longer resolves to a project on the
    /// service side ("Requested entity was not found").
    #[error("Requested entity was not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not found. Set GEMINI_API_KEY or run `tubemagic config --set-api-key KEY`")]
    MissingApiKey,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn is_entity_not_found(&self) -> bool {
        matches!(self, ClientError::EntityNotFound(_))
    }
}

/// Project creation failed; the prompt stays editable for another try.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Content generation failed: {0}")]
    Remote(#[from] ClientError),

    #[error("Failed to parse automation package: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Automation package is incomplete: {0}")]
    Incomplete(String),

    #[error("Failed to save project: {0}")]
    Store(#[from] StoreError),
}

impl GenerationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::EmptyPrompt => "Describe your vision first.",
            _ => "Automation sequence interrupted. Please try a different topic.",
        }
    }
}

/// A per-scene image or video request failed. Nothing is retried automatically.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("No project is loaded")]
    NoProject,

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("{kind} generation failed: {source}")]
    Remote {
        kind: AssetKind,
        #[source]
        source: ClientError,
    },

    #[error("{kind} generation failed: {message}")]
    Rejected { kind: AssetKind, message: String },

    #[error("Credential is stale, select an API key and try again")]
    StaleCredential { kind: AssetKind },

    #[error("Video job finished without a result")]
    MissingResult,

    #[error("Video job still running after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Result discarded, a newer request for {0} was issued")]
    Superseded(String),

    #[error("Failed to store media: {0}")]
    Media(#[from] std::io::Error),

    #[error("Failed to save project: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat failed: {0}")]
    Remote(#[from] ClientError),
}

/// Durable history storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Project not found in history: {0}")]
    ProjectNotFound(String),
}

#[derive(Error, Debug)]
pub enum TubeMagicError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TubeMagicError>;
