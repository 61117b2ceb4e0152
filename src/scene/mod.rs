use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One narration unit of a project and the media generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// `scene-<index>`, assigned in narration order
    pub id: String,
    /// Script line narrated over this scene
    pub text: String,
    /// Prompt sent to image/video generation
    pub visual_prompt: String,
    #[serde(default)]
    pub output: SceneOutput,
    #[serde(default)]
    pub status: AssetStatus,
}

impl Scene {
    pub fn new(index: usize, text: String, visual_prompt: String) -> Self {
        Self {
            id: scene_id(index),
            text,
            visual_prompt,
            output: SceneOutput::None,
            status: AssetStatus::Idle,
        }
    }

    pub fn is_generating_image(&self) -> bool {
        self.status.pending_kind() == Some(AssetKind::Image)
    }

    pub fn is_generating_video(&self) -> bool {
        self.status.pending_kind() == Some(AssetKind::Video)
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.output {
            SceneOutput::Image(url) => Some(url),
            _ => None,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match &self.output {
            SceneOutput::Video(url) => Some(url),
            _ => None,
        }
    }

    /// Enter `Pending`. Starting one kind of output drops the other.
    pub(crate) fn begin(&mut self, kind: AssetKind, token: u64) {
        if self.output.kind().is_some_and(|current| current != kind) {
            self.output = SceneOutput::None;
        }
        self.status = AssetStatus::Pending { kind, token };
    }

    /// Whether `token` is the request this scene is currently waiting on.
    pub(crate) fn is_awaiting(&self, token: u64) -> bool {
        matches!(self.status, AssetStatus::Pending { token: t, .. } if t == token)
    }

    pub(crate) fn succeed(&mut self, output: SceneOutput) {
        if let Some(kind) = output.kind() {
            self.status = AssetStatus::Succeeded { kind };
        }
        self.output = output;
    }

    pub(crate) fn fail(&mut self, kind: AssetKind, message: String) {
        if self.output.kind() == Some(kind) {
            self.output = SceneOutput::None;
        }
        self.status = AssetStatus::Failed { kind, message };
    }
}

pub fn scene_id(index: usize) -> String {
    format!("scene-{}", index)
}

/// The single media slot of a scene. The latest successful generation wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "url", rename_all = "camelCase")]
pub enum SceneOutput {
    #[default]
    None,
    Image(String),
    Video(String),
}

impl SceneOutput {
    pub fn kind(&self) -> Option<AssetKind> {
        match self {
            SceneOutput::None => None,
            SceneOutput::Image(_) => Some(AssetKind::Image),
            SceneOutput::Video(_) => Some(AssetKind::Video),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Image,
    Video,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => f.write_str("Image"),
            AssetKind::Video => f.write_str("Video"),
        }
    }
}

/// Lifecycle of the most recent generation request for a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AssetStatus {
    #[default]
    Idle,
    Pending { kind: AssetKind, token: u64 },
    Succeeded { kind: AssetKind },
    Failed { kind: AssetKind, message: String },
}

impl AssetStatus {
    pub fn pending_kind(&self) -> Option<AssetKind> {
        match self {
            AssetStatus::Pending { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssetStatus::Pending { .. })
    }
}

/// Requested output resolution for image generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ImageSize {
    /// 1K standard
    #[default]
    #[serde(rename = "1K")]
    #[value(name = "1K", alias = "1k", alias = "standard")]
    Standard,
    /// 2K high
    #[serde(rename = "2K")]
    #[value(name = "2K", alias = "2k", alias = "high")]
    High,
    /// 4K ultra
    #[serde(rename = "4K")]
    #[value(name = "4K", alias = "4k", alias = "ultra")]
    Ultra,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Standard => "1K",
            ImageSize::High => "2K",
            ImageSize::Ultra => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
