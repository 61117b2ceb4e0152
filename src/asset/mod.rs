//! Per-scene image and video generation.
//!
//! Each request marks its scene `Pending` with a fresh token, awaits the
//! remote call without holding any lock, then merges the outcome back by
//! project and scene id. Only the most recently issued request for a scene
//! may change it; older completions are dropped as superseded.

mod media;
mod poller;

pub use media::MediaDir;
pub use poller::{wait_for_job, PollPolicy, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{KeySelector, RemoteGenerationClient};
use crate::error::{AssetError, ClientError};
use crate::project::ProjectStore;
use crate::scene::{AssetKind, ImageSize, Scene, SceneOutput};

pub struct AssetLifecycleController {
    client: Arc<dyn RemoteGenerationClient>,
    store: Arc<ProjectStore>,
    credentials: Arc<dyn KeySelector>,
    media: MediaDir,
    policy: PollPolicy,
    next_token: AtomicU64,
}

impl AssetLifecycleController {
    pub fn new(
        client: Arc<dyn RemoteGenerationClient>,
        store: Arc<ProjectStore>,
        credentials: Arc<dyn KeySelector>,
        media: MediaDir,
        policy: PollPolicy,
    ) -> Self {
        // seeded from the clock so media file names stay unique across runs
        let seed = Utc::now().timestamp_millis().max(1) as u64;
        Self {
            client,
            store,
            credentials,
            media,
            policy,
            next_token: AtomicU64::new(seed),
        }
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Generate an image for a scene of the current project.
    pub async fn request_image(&self, scene_id: &str, size: ImageSize) -> Result<Scene, AssetError> {
        self.store.check_scene(scene_id)?;
        self.ensure_credential().await;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let pending = self.store.begin_scene(scene_id, AssetKind::Image, token)?;
        info!("Generating {} image for {} (request {})", size, scene_id, token);

        let result = cancellable(&pending.cancel, async {
            self.client
                .generate_image(&pending.scene.visual_prompt, size)
                .await
                .map(SceneOutput::Image)
                .map_err(|e| remote_error(AssetKind::Image, e))
        })
        .await;

        self.finish(&pending.project_id, scene_id, token, AssetKind::Image, result)
            .await
    }

    /// Generate a video for a scene of the current project, waiting for the
    /// remote job under the configured poll policy.
    pub async fn request_video(&self, scene_id: &str) -> Result<Scene, AssetError> {
        self.store.check_scene(scene_id)?;
        self.ensure_credential().await;

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let pending = self.store.begin_scene(scene_id, AssetKind::Video, token)?;
        info!("Generating video for {} (request {})", scene_id, token);

        let result = self
            .run_video_job(&pending.project_id, &pending.scene, token, &pending.cancel)
            .await;

        self.finish(&pending.project_id, scene_id, token, AssetKind::Video, result)
            .await
    }

    async fn run_video_job(
        &self,
        project_id: &str,
        scene: &Scene,
        token: u64,
        cancel: &CancellationToken,
    ) -> Result<SceneOutput, AssetError> {
        let job = cancellable(cancel, async {
            self.client
                .generate_video(&scene.visual_prompt)
                .await
                .map_err(|e| remote_error(AssetKind::Video, e))
        })
        .await?;

        let uri = wait_for_job(self.client.as_ref(), &job, self.policy, cancel).await?;

        let data = cancellable(cancel, async {
            self.client
                .fetch_media(&uri)
                .await
                .map_err(|e| remote_error(AssetKind::Video, e))
        })
        .await?;

        let path = self
            .media
            .store_video(project_id, &scene.id, token, &data)
            .await?;
        Ok(SceneOutput::Video(path.display().to_string()))
    }

    async fn ensure_credential(&self) {
        if !self.credentials.has_selected_key().await {
            self.credentials.open_select_key().await;
        }
    }

    async fn finish(
        &self,
        project_id: &str,
        scene_id: &str,
        token: u64,
        kind: AssetKind,
        result: Result<SceneOutput, AssetError>,
    ) -> Result<Scene, AssetError> {
        let err = match result {
            Ok(output) => {
                let media = output.clone();
                match self.store.complete_scene(project_id, scene_id, token, Ok(output)) {
                    Ok(scene) => {
                        info!("{} ready for {}", kind, scene_id);
                        return Ok(scene);
                    }
                    Err(err) => {
                        // the result will never be referenced
                        if let SceneOutput::Video(path) = media {
                            self.media.discard(&path).await;
                        }
                        if let AssetError::Superseded(_) = err {
                            info!("Dropped {} result for {}: {}", kind, scene_id, err);
                            return Err(err);
                        }
                        err
                    }
                }
            }
            Err(err) => err,
        };

        warn!("{} generation for {} failed: {}", kind, scene_id, err);
        if matches!(err, AssetError::StaleCredential { .. }) {
            self.credentials.open_select_key().await;
        }

        match self
            .store
            .complete_scene(project_id, scene_id, token, Err((kind, err.to_string())))
        {
            Ok(_) | Err(AssetError::Superseded(_)) => {}
            Err(e) => warn!("Failed to record failure for {}: {}", scene_id, e),
        }
        Err(err)
    }
}

fn remote_error(kind: AssetKind, e: ClientError) -> AssetError {
    if e.is_entity_not_found() {
        AssetError::StaleCredential { kind }
    } else {
        AssetError::Remote { kind, source: e }
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, AssetError>>,
) -> Result<T, AssetError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(AssetError::Cancelled),
        result = fut => result,
    }
}
