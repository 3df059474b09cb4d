//! The controller: one configuration source bound to one destination, plus
//! the hooks to run after each successful write.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use confsync_backends::{Backend, BackendFactory, Poller};
use confsync_core::{Format, HookName, ObjectKey, ObjectSpec};
use confsync_hooks::{Executor, HookError, HookGraph};
use confsync_render::Renderer;

use crate::error::{io_err, AgentError};
use crate::ready;

/// One addressable synchronization unit, keyed by object name.
///
/// Constructed once from an [`ObjectSpec`] plus the loaded hook graph;
/// friendly-name resolution, destination resolution, and hook-name
/// resolution all happen here, so misconfiguration fails before any
/// operation runs.
pub struct Controller {
    key: ObjectKey,
    backend: Box<dyn Backend>,
    format: Format,
    interval: Duration,
    renderer: Renderer,
    dest_path: PathBuf,
    hooks: Vec<HookName>,
    graph: Arc<HookGraph>,
    executor: Executor,
}

impl Controller {
    /// Build a controller from a validated object spec.
    pub async fn from_spec(
        spec: &ObjectSpec,
        factory: &BackendFactory,
        graph: Arc<HookGraph>,
    ) -> Result<Self, AgentError> {
        Controller::with_executor(spec, factory, graph, Executor::process()).await
    }

    /// As [`Controller::from_spec`], with a caller-supplied hook executor.
    pub async fn with_executor(
        spec: &ObjectSpec,
        factory: &BackendFactory,
        graph: Arc<HookGraph>,
        executor: Executor,
    ) -> Result<Self, AgentError> {
        if !spec.hooks.is_empty() && graph.is_disabled() {
            return Err(AgentError::HooksUnavailable {
                key: spec.key.clone(),
                hooks: spec.hooks.iter().map(|h| h.0.clone()).collect(),
            });
        }
        for hook in &spec.hooks {
            if !graph.contains(hook) {
                return Err(AgentError::Hook(HookError::Undefined {
                    name: hook.clone(),
                    known: graph.known_names(),
                }));
            }
        }

        let backend = factory.realize(&spec.source).await?;
        let renderer = Renderer::from_spec(&spec.dest.render)?;

        Ok(Controller {
            key: spec.key.clone(),
            backend,
            format: spec.source.format,
            interval: spec.source.interval,
            renderer,
            dest_path: spec.dest.path.clone(),
            hooks: spec.hooks.clone(),
            graph,
            executor,
        })
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// One-shot fetch -> decode -> render -> `sink`. Hooks are not invoked;
    /// this is the read-only path.
    pub async fn get(&self, sink: &mut dyn FnMut(&str)) -> Result<(), AgentError> {
        let text = self.fetch_rendered().await?;
        sink(&text);
        for hook in &self.hooks {
            tracing::debug!(key = %self.key, hook = %hook, "would execute hook");
        }
        Ok(())
    }

    /// One-shot fetch -> decode -> render -> write, then run each hook in
    /// declared order. The first hook failure fails the operation.
    pub async fn apply(&self) -> Result<(), AgentError> {
        let text = self.fetch_rendered().await?;
        self.write_destination(&text)?;
        self.run_hooks().await
    }

    /// Poll the source and `sink` every rendered update. Hooks are not
    /// invoked. Runs until the source's sequence ends or errors; dropping
    /// the future cancels cleanly.
    pub async fn watch(&self, sink: &mut dyn FnMut(&str)) -> Result<(), AgentError> {
        let mut poller = self.backend.watch(self.interval).await?;
        let mut ready_signaled = false;
        loop {
            let payload = poller.next().await?;
            let text = self.render_payload(&payload)?;
            sink(&text);
            if !ready_signaled {
                ready::notify_ready();
                ready_signaled = true;
            }
        }
    }

    /// Poll the source, writing the destination and running hooks after
    /// every successful write.
    pub async fn sync(&self) -> Result<(), AgentError> {
        let mut poller = self.backend.watch(self.interval).await?;
        let mut ready_signaled = false;
        loop {
            let payload = poller.next().await?;
            let text = self.render_payload(&payload)?;
            self.write_destination(&text)?;
            self.run_hooks().await?;
            if !ready_signaled {
                ready::notify_ready();
                ready_signaled = true;
            }
        }
    }

    async fn fetch_rendered(&self) -> Result<String, AgentError> {
        let payload = self.backend.get().await?;
        self.render_payload(&payload)
    }

    fn render_payload(&self, payload: &str) -> Result<String, AgentError> {
        let data = self.format.decode(payload)?;
        Ok(self.renderer.render(&data)?)
    }

    /// Overwrite the destination in full: write to a temp file next to the
    /// target, then rename into place. Parent directories are created on
    /// demand.
    fn write_destination(&self, content: &str) -> Result<(), AgentError> {
        let path = &self.dest_path;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }

        let tmp = PathBuf::from(format!("{}.confsync.tmp", path.display()));
        std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }

        tracing::info!(key = %self.key, "wrote: {}", path.display());
        Ok(())
    }

    async fn run_hooks(&self) -> Result<(), AgentError> {
        for hook in &self.hooks {
            tracing::debug!(key = %self.key, hook = %hook, "executing hook");
            self.executor.execute(&self.graph, hook).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("key", &self.key)
            .field("format", &self.format)
            .field("interval", &self.interval)
            .field("dest_path", &self.dest_path)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {} -> {}",
            self.backend,
            self.format,
            self.renderer.describe(),
            self.dest_path.display()
        )
    }
}
