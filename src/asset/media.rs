use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Local directory that turns downloaded media into addressable files.
#[derive(Debug, Clone)]
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<project>/<scene>-<token>.mp4`
    pub fn video_path(&self, project_id: &str, scene_id: &str, token: u64) -> PathBuf {
        self.root
            .join(project_id)
            .join(format!("{}-{}.mp4", scene_id, token))
    }

    pub async fn store_video(
        &self,
        project_id: &str,
        scene_id: &str,
        token: u64,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self.video_path(project_id, scene_id, token);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        info!("Video saved to: {}", path.display());
        Ok(path)
    }

    /// Delete a stored video that no scene refers to. Failures are logged.
    pub async fn discard(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => info!("Removed unused video: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
