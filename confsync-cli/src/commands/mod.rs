//! Command implementations and the shared load context.

pub mod apply;
pub mod get;
pub mod monitor;
pub mod objects;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use confsync_agent::Controller;
use confsync_backends::BackendFactory;
use confsync_core::{settings, Settings};
use confsync_hooks::HookGraph;

/// Settings, the hook graph, and the shared backend factory, loaded once
/// per invocation.
pub struct Context {
    pub settings: Settings,
    pub graph: Arc<HookGraph>,
    pub factory: BackendFactory,
}

impl Context {
    pub fn load(config: Option<PathBuf>) -> Result<Self> {
        let path = match config {
            Some(path) => path,
            None => settings::resolve_path()?,
        };
        let settings =
            Settings::load(&path).with_context(|| format!("loading {}", path.display()))?;
        let graph = Arc::new(HookGraph::from_settings(settings.hooks.as_ref()));
        let factory = BackendFactory::new(settings.provider.clone());
        Ok(Context {
            settings,
            graph,
            factory,
        })
    }

    /// Build the controller for one object key.
    pub async fn controller(&self, key: &str) -> Result<Controller> {
        let spec = self.settings.object_spec(key)?;
        let controller = Controller::from_spec(&spec, &self.factory, self.graph.clone())
            .await
            .with_context(|| format!("constructing controller for '{key}'"))?;
        Ok(controller)
    }

    /// Build controllers for every configured object.
    pub async fn all_controllers(&self) -> Result<Vec<Controller>> {
        let mut controllers = Vec::new();
        for spec in self.settings.object_specs()? {
            let key = spec.key.clone();
            let controller = Controller::from_spec(&spec, &self.factory, self.graph.clone())
                .await
                .with_context(|| format!("constructing controller for '{key}'"))?;
            controllers.push(controller);
        }
        Ok(controllers)
    }
}
