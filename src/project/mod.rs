//! Generated automation package and its history.

mod storage;
mod store;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{ProjectStore, DEFAULT_HISTORY_LIMIT, HISTORY_KEY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::scene::{AssetStatus, Scene};

pub const SYSTEM_INSTRUCTION: &str = r#"You are an all-in-one AI YouTube automation system.
Your task is to create a COMPLETE, ORIGINAL, and YOUTUBE-SAFE video package from ONE user prompt.
Always return response in JSON format matching the requested schema.
Return scenes as an array of objects where each object has "text" (the sentence from the script) and "visualPrompt" (cinematic, vertical 9:16 description).
Follow the specific format for script (45-60s), VO instructions with tone tags, and punchy subtitles."#;

/// The full generated bundle for one user prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub script: String,
    pub voice_over: String,
    pub scenes: Vec<Scene>,
    pub subtitles: String,
    pub music_style: String,
    pub youtube_title: String,
    pub youtube_description: String,
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
    pub thumbnail_text: String,
}

impl Project {
    /// Assign identity to a parsed package. Scene ids follow array order.
    pub fn from_package(package: AutomationPackage) -> Self {
        let scenes = package
            .scenes
            .into_iter()
            .enumerate()
            .map(|(i, s)| Scene::new(i, s.text, s.visual_prompt))
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            script: package.script,
            voice_over: package.voice_over,
            scenes,
            subtitles: package.subtitles,
            music_style: package.music_style,
            youtube_title: package.youtube_title,
            youtube_description: package.youtube_description,
            tags: package.tags,
            hashtags: package.hashtags,
            thumbnail_text: package.thumbnail_text,
        }
    }

    pub fn scene(&self, scene_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == scene_id)
    }

    pub(crate) fn scene_mut(&mut self, scene_id: &str) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|s| s.id == scene_id)
    }

    /// Voice-over guidance split into its non-blank lines.
    pub fn voice_over_lines(&self) -> impl Iterator<Item = &str> {
        self.voice_over.lines().map(str::trim).filter(|l| !l.is_empty())
    }

    /// Requests that were in flight when this snapshot was written cannot
    /// complete anymore.
    pub(crate) fn reset_interrupted(&mut self) {
        for scene in &mut self.scenes {
            if scene.status.is_pending() {
                scene.status = AssetStatus::Idle;
            }
        }
    }
}

/// Package as returned by the model, before ids are assigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPackage {
    pub script: String,
    pub voice_over: String,
    pub scenes: Vec<SceneDraft>,
    pub subtitles: String,
    pub music_style: String,
    pub youtube_title: String,
    pub youtube_description: String,
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
    pub thumbnail_text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDraft {
    pub text: String,
    pub visual_prompt: String,
}

impl AutomationPackage {
    /// Parse and validate a structured response. All fields are required and
    /// a package must carry at least one scene.
    pub fn from_value(value: Value) -> Result<Self, GenerationError> {
        let package: AutomationPackage =
            serde_json::from_value(value).map_err(GenerationError::Parse)?;

        if package.scenes.is_empty() {
            return Err(GenerationError::Incomplete("no scenes".into()));
        }
        if package.script.trim().is_empty() {
            return Err(GenerationError::Incomplete("empty script".into()));
        }
        Ok(package)
    }
}

/// Response schema sent with the structured content request.
pub fn package_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "script": { "type": "STRING" },
            "voiceOver": { "type": "STRING" },
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "visualPrompt": { "type": "STRING" }
                    },
                    "required": ["text", "visualPrompt"]
                }
            },
            "subtitles": { "type": "STRING" },
            "musicStyle": { "type": "STRING" },
            "youtubeTitle": { "type": "STRING" },
            "youtubeDescription": { "type": "STRING" },
            "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } },
            "thumbnailText": { "type": "STRING" }
        },
        "required": [
            "script", "voiceOver", "scenes", "subtitles", "musicStyle",
            "youtubeTitle", "youtubeDescription", "tags", "hashtags", "thumbnailText"
        ]
    })
}
