/// External publish boundary for accepted definitions
///
/// The execution platform that ultimately runs definitions is a separate
/// deployment: after registration the loader optionally pushes each
/// accepted definition's identity to it. Publish failures are logged and
/// surfaced but never unregister anything.

use crate::loader::LoadedDefinition;
use async_trait::async_trait;
use std::time::Duration;

/// A remote target that creates or updates a definition record from its
/// `(id, name, sourcePath)` tuple.
#[async_trait]
pub trait DeployTarget: Send + Sync {
    async fn deploy(&self, definition: &LoadedDefinition) -> anyhow::Result<()>;
}

/// HTTP publish target posting accepted definitions to a configured
/// endpoint. Every request carries an explicit timeout; a stuck endpoint is
/// bounded by it and by the loader's circuit breaker.
pub struct HttpDeployTarget {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpDeployTarget {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl DeployTarget for HttpDeployTarget {
    async fn deploy(&self, definition: &LoadedDefinition) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "id": definition.id,
            "name": definition.name,
            "sourcePath": definition.source_path.to_string_lossy(),
        });

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        anyhow::ensure!(
            response.status().is_success(),
            "publish endpoint returned {}",
            response.status()
        );

        tracing::debug!(
            "🚀 Deployed definition {} to {}",
            definition.id,
            self.endpoint
        );
        Ok(())
    }
}
