/// Flowdeck: hot-reloading workflow definition runtime
///
/// Main entry point. Initializes logging and configuration, runs the
/// startup discovery scan, and keeps the registry reconciled against
/// filesystem changes until shutdown.

use flowdeck::config::Config;
use flowdeck::definition::DefinitionRegistry;
use flowdeck::deploy::{DeployTarget, HttpDeployTarget};
use flowdeck::loader::watcher::ChangeWatcher;
use flowdeck::loader::DefinitionLoader;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    let config = Config::default();
    tracing::info!("Starting flowdeck loader...");

    // The registry is an explicit instance owned here and shared by handle;
    // it lives for the life of the process and is rebuilt by discovery.
    let registry = Arc::new(DefinitionRegistry::new());

    let publish: Option<Arc<dyn DeployTarget>> = match &config.publish.target_url {
        Some(url) if config.publish.auto_deploy => {
            tracing::info!("🚀 Publishing accepted definitions to {url}");
            Some(Arc::new(HttpDeployTarget::new(
                url.clone(),
                config.publish.api_key.clone(),
                config.publish.request_timeout(),
            )?))
        }
        _ => None,
    };

    let loader = DefinitionLoader::new(config.loader.clone(), Arc::clone(&registry), publish)?;

    let result = loader.load_all().await;
    tracing::info!(
        "📦 Startup scan: {} loaded, {} failed, {} skipped in {:?}",
        result.loaded.len(),
        result.errors.len(),
        result.skipped.len(),
        result.duration
    );

    if config.loader.watch {
        let watcher = ChangeWatcher::new(
            &config.loader.workflows_dir,
            config.loader.extensions.clone(),
            config.loader.quiescence(),
        )?;
        loader.run(watcher).await;
    }

    Ok(())
}
