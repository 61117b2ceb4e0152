use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::storage::KeyValueStorage;
use super::{package_schema, AutomationPackage, Project, SYSTEM_INSTRUCTION};
use crate::api::RemoteGenerationClient;
use crate::error::{AssetError, GenerationError, StoreError};
use crate::scene::{AssetKind, Scene, SceneOutput};

pub const HISTORY_KEY: &str = "tubemagic_projects";
pub const DEFAULT_HISTORY_LIMIT: usize = 15;

/// Current project plus the bounded, persisted history list.
///
/// All mutation happens under one lock that is never held across an await.
pub struct ProjectStore {
    client: Arc<dyn RemoteGenerationClient>,
    storage: Box<dyn KeyValueStorage>,
    limit: usize,
    state: Mutex<StoreState>,
}

struct StoreState {
    current: Option<Project>,
    /// Most recent first, unique by id
    history: Vec<Project>,
    /// Cancelled whenever the current project changes
    session: CancellationToken,
}

/// What a scene request needs once its scene is marked pending.
pub(crate) struct PendingScene {
    pub project_id: String,
    pub scene: Scene,
    pub cancel: CancellationToken,
}

impl ProjectStore {
    /// Build the store and load the persisted history.
    pub fn open(
        client: Arc<dyn RemoteGenerationClient>,
        storage: Box<dyn KeyValueStorage>,
        limit: usize,
    ) -> Self {
        let store = Self {
            client,
            storage,
            limit: limit.max(1),
            state: Mutex::new(StoreState {
                current: None,
                history: Vec::new(),
                session: CancellationToken::new(),
            }),
        };
        store.load_history();
        store
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Re-read the snapshot. Absent or malformed data yields an empty history.
    pub fn load_history(&self) -> Vec<Project> {
        let history = match self.read_snapshot() {
            Ok(history) => history,
            Err(e) => {
                warn!("Ignoring unreadable project history: {}", e);
                Vec::new()
            }
        };

        let mut state = self.state.lock();
        state.history = history;
        state.history.truncate(self.limit);
        info!("Loaded {} projects from history", state.history.len());
        state.history.clone()
    }

    fn read_snapshot(&self) -> Result<Vec<Project>, StoreError> {
        let Some(raw) = self.storage.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        let mut history: Vec<Project> = serde_json::from_str(&raw)?;
        for project in &mut history {
            project.reset_interrupted();
        }
        Ok(history)
    }

    /// Generate a new project from one prompt, make it current and save it.
    pub async fn create_project(&self, prompt: &str) -> Result<Project, GenerationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        info!("Generating automation package for prompt: {}", prompt);
        let value = self
            .client
            .generate_structured_content(SYSTEM_INSTRUCTION, prompt, &package_schema())
            .await?;
        let project = Project::from_package(AutomationPackage::from_value(value)?);
        info!(
            "Created project {} with {} scenes",
            project.id,
            project.scenes.len()
        );

        // nothing changes in memory unless the snapshot was written
        let mut state = self.state.lock();
        let history = self.history_with(&state.history, &project);
        self.commit_history(&mut state, history)?;
        Self::switch_session(&mut state);
        state.current = Some(project.clone());
        Ok(project)
    }

    /// Insert or replace by id at the front, cap the list, persist.
    pub fn save_to_history(&self, project: &Project) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let history = self.history_with(&state.history, project);
        self.commit_history(&mut state, history)
    }

    /// `history` with `project` at the front. Saved copies never carry an
    /// in-flight status.
    fn history_with(&self, history: &[Project], project: &Project) -> Vec<Project> {
        let mut saved = project.clone();
        saved.reset_interrupted();

        let mut next = Vec::with_capacity(history.len() + 1);
        next.push(saved);
        next.extend(history.iter().filter(|p| p.id != project.id).cloned());
        next.truncate(self.limit);
        next
    }

    /// Persist `history`, then make it the in-memory list.
    fn commit_history(&self, state: &mut StoreState, history: Vec<Project>) -> Result<(), StoreError> {
        let snapshot = serde_json::to_string(&history)?;
        self.storage.set(HISTORY_KEY, &snapshot)?;
        state.history = history;
        Ok(())
    }

    pub fn current(&self) -> Option<Project> {
        self.state.lock().current.clone()
    }

    pub fn history(&self) -> Vec<Project> {
        self.state.lock().history.clone()
    }

    /// Make a history entry the current project.
    pub fn select(&self, project_id: &str) -> Result<Project, StoreError> {
        let mut state = self.state.lock();
        if let Some(current) = state.current.as_ref().filter(|p| p.id == project_id) {
            return Ok(current.clone());
        }

        let mut project = state
            .history
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound(project_id.to_string()))?;
        project.reset_interrupted();

        Self::switch_session(&mut state);
        state.current = Some(project.clone());
        Ok(project)
    }

    /// Drop the current project; history is kept.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        Self::switch_session(&mut state);
        state.current = None;
    }

    pub fn clear_history(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.history.clear();
        self.storage.remove(HISTORY_KEY)
    }

    fn switch_session(state: &mut StoreState) {
        state.session.cancel();
        state.session = CancellationToken::new();
    }

    /// Fails unless the current project has `scene_id`.
    pub(crate) fn check_scene(&self, scene_id: &str) -> Result<(), AssetError> {
        let state = self.state.lock();
        let project = state.current.as_ref().ok_or(AssetError::NoProject)?;
        project
            .scene(scene_id)
            .map(|_| ())
            .ok_or_else(|| AssetError::SceneNotFound(scene_id.to_string()))
    }

    /// Mark a scene of the current project pending for `token`.
    pub(crate) fn begin_scene(
        &self,
        scene_id: &str,
        kind: AssetKind,
        token: u64,
    ) -> Result<PendingScene, AssetError> {
        let mut state = self.state.lock();
        let cancel = state.session.child_token();
        let project = state.current.as_mut().ok_or(AssetError::NoProject)?;
        let project_id = project.id.clone();
        let scene = project
            .scene_mut(scene_id)
            .ok_or_else(|| AssetError::SceneNotFound(scene_id.to_string()))?;

        scene.begin(kind, token);

        Ok(PendingScene {
            project_id,
            scene: scene.clone(),
            cancel,
        })
    }

    /// Merge the outcome of request `token` into its scene. Outcomes for a
    /// project that is no longer current, or for a scene that has since been
    /// re-requested, are discarded. A success is only applied once it is
    /// persisted; on a store error the scene stays pending for the caller
    /// to record the failure.
    pub(crate) fn complete_scene(
        &self,
        project_id: &str,
        scene_id: &str,
        token: u64,
        outcome: Result<SceneOutput, (AssetKind, String)>,
    ) -> Result<Scene, AssetError> {
        let mut state = self.state.lock();
        let Some(mut project) = state.current.clone().filter(|p| p.id == project_id) else {
            return Err(AssetError::Superseded(scene_id.to_string()));
        };
        let scene = project
            .scene_mut(scene_id)
            .filter(|s| s.is_awaiting(token))
            .ok_or_else(|| AssetError::Superseded(scene_id.to_string()))?;

        let succeeded = outcome.is_ok();
        match outcome {
            Ok(output) => scene.succeed(output),
            Err((kind, message)) => scene.fail(kind, message),
        }
        let scene = scene.clone();

        if succeeded {
            let history = self.history_with(&state.history, &project);
            self.commit_history(&mut state, history)?;
        }
        state.current = Some(project);
        Ok(scene)
    }
}
