//! Local-file configuration source.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{io_err, BackendError};
use crate::{Backend, Poller};

/// Reads configuration from a file on the local filesystem.
pub struct LocalBackend {
    path: PathBuf,
}

impl LocalBackend {
    /// If `path` does not exist yet, a warning is logged and construction
    /// proceeds; the first read will fail naturally.
    pub fn new(path: PathBuf) -> Self {
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "could not read file");
        }
        LocalBackend { path }
    }

    async fn read(&self) -> Result<String, BackendError> {
        tracing::debug!(path = %self.path.display(), "read file");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_err(&self.path, e))
    }
}

impl fmt::Display for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn get(&self) -> Result<String, BackendError> {
        self.read().await
    }

    /// The interval is ignored: changes are driven by filesystem
    /// notifications on the file's parent directory. The current contents
    /// are yielded immediately as the first item.
    async fn watch(&self, _interval: Duration) -> Result<Box<dyn Poller>, BackendError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %parent.display(), "watching directory");

        Ok(Box::new(LocalPoller {
            path: self.path.clone(),
            _watcher: watcher,
            events: event_rx,
            pending_first: true,
        }))
    }
}

/// Poller over filesystem-change notifications. Dropping it drops the watch
/// handle.
struct LocalPoller {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    pending_first: bool,
}

impl LocalPoller {
    async fn read(&self) -> Result<String, BackendError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| io_err(&self.path, e))
    }

    fn touches_file(&self, event: &Event) -> bool {
        let file_name = self.path.file_name();
        event
            .paths
            .iter()
            .any(|p| p == &self.path || (file_name.is_some() && p.file_name() == file_name))
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

#[async_trait]
impl Poller for LocalPoller {
    async fn next(&mut self) -> Result<String, BackendError> {
        if self.pending_first {
            self.pending_first = false;
            return self.read().await;
        }

        loop {
            let event = self
                .events
                .recv()
                .await
                .ok_or(BackendError::ChannelClosed("file watch events"))?;
            let event = match event {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(error = %err, "watcher event error");
                    continue;
                }
            };
            if !is_relevant_event_kind(&event.kind) || !self.touches_file(&event) {
                continue;
            }
            tracing::info!(path = %self.path.display(), "detected change");
            return self.read().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn get_reads_file_contents() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("source.yaml");
        fs::write(&path, "k: 1\n").expect("write");

        let backend = LocalBackend::new(path);
        assert_eq!(backend.get().await.expect("get"), "k: 1\n");
    }

    #[tokio::test]
    async fn get_on_missing_file_fails_naturally() {
        let dir = TempDir::new().expect("tempdir");
        // Construction succeeds with a warning.
        let backend = LocalBackend::new(dir.path().join("absent.yaml"));
        let err = backend.get().await.unwrap_err();
        assert!(matches!(err, BackendError::Io { .. }));
    }

    #[tokio::test]
    async fn watch_yields_current_contents_first() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("source.yaml");
        fs::write(&path, "initial").expect("write");

        let backend = LocalBackend::new(path);
        let mut poller = backend.watch(Duration::from_secs(0)).await.expect("watch");
        assert_eq!(poller.next().await.expect("first"), "initial");
    }

    #[tokio::test]
    async fn watch_yields_on_change() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("source.yaml");
        fs::write(&path, "v1").expect("write");

        let backend = LocalBackend::new(path.clone());
        let mut poller = backend.watch(Duration::from_secs(0)).await.expect("watch");
        assert_eq!(poller.next().await.expect("first"), "v1");

        fs::write(&path, "v2").expect("rewrite");
        let second = timeout(Duration::from_secs(5), poller.next())
            .await
            .expect("change notification within 5s")
            .expect("read");
        assert_eq!(second, "v2");
    }
}
