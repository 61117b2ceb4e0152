use async_trait::async_trait;
use tracing::warn;

/// Host hook for the externally managed API credential.
///
/// The lifecycle only checks and prompts; it never stores or validates keys.
#[async_trait]
pub trait KeySelector: Send + Sync {
    async fn has_selected_key(&self) -> bool;

    /// Ask the host to let the user pick a credential.
    async fn open_select_key(&self);
}

/// Selector that is always satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopKeySelector;

#[async_trait]
impl KeySelector for NoopKeySelector {
    async fn has_selected_key(&self) -> bool {
        true
    }

    async fn open_select_key(&self) {}
}

/// Terminal host: a key is "selected" when one was configured, and the
/// prompt is a warning telling the user how to set one.
#[derive(Debug, Clone, Default)]
pub struct EnvKeySelector {
    configured: bool,
}

impl EnvKeySelector {
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            configured: api_key.is_some_and(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl KeySelector for EnvKeySelector {
    async fn has_selected_key(&self) -> bool {
        self.configured
    }

    async fn open_select_key(&self) {
        warn!("No usable API key selected. Set GEMINI_API_KEY or run `tubemagic config --set-api-key KEY`");
    }
}
