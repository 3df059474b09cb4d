//! Fan-out of controllers for "apply all" / "poll all" operations.
//!
//! Each object's operation is an independent, cancellable task; objects
//! share no mutable state, and one object's failure never crashes its
//! siblings.

use tokio::sync::broadcast;

use confsync_core::ObjectKey;

use crate::controller::Controller;
use crate::error::AgentError;

/// Per-object outcome of an `apply_all` run.
pub struct ApplyOutcome {
    pub key: ObjectKey,
    pub result: Result<(), AgentError>,
}

/// Apply every controller once, concurrently. Returns one outcome per
/// object in completion-independent input order; errors are collected, not
/// short-circuited.
pub async fn apply_all(controllers: Vec<Controller>) -> Vec<ApplyOutcome> {
    let mut handles = Vec::with_capacity(controllers.len());
    for controller in controllers {
        handles.push(tokio::spawn(async move {
            let key = controller.key().clone();
            let result = controller.apply().await;
            if let Err(err) = &result {
                tracing::error!(key = %key, error = %err, "apply failed");
            }
            ApplyOutcome { key, result }
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => outcomes.push(ApplyOutcome {
                key: ObjectKey::from("<unknown>"),
                result: Err(AgentError::Join {
                    key: ObjectKey::from("<unknown>"),
                    detail: err.to_string(),
                }),
            }),
        }
    }
    outcomes
}

/// Run every controller's `sync` loop until ctrl-c.
pub async fn monitor_all(controllers: Vec<Controller>) -> Result<(), AgentError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c, shutting down");
                let _ = shutdown.send(());
            }
        });
    }

    monitor_all_with_shutdown(controllers, shutdown_tx).await
}

/// Run every controller's `sync` loop until the shutdown channel fires.
///
/// A loop error terminates that object's task only; cancellation is a clean
/// shutdown, not an error.
pub async fn monitor_all_with_shutdown(
    controllers: Vec<Controller>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), AgentError> {
    let keys: Vec<String> = controllers.iter().map(|c| c.key().to_string()).collect();
    tracing::info!(objects = ?keys, "begin monitoring");

    let mut handles = Vec::with_capacity(controllers.len());
    for controller in controllers {
        let mut shutdown_rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            let key = controller.key().clone();
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(key = %key, "monitor loop cancelled");
                }
                result = controller.sync() => {
                    if let Err(err) = result {
                        tracing::error!(key = %key, error = %err, "monitor loop failed");
                    }
                }
            }
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "monitor task join failure");
        }
    }
    Ok(())
}

/// Initialise the tracing subscriber once for a long-running entry path.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::broadcast;

    use confsync_backends::BackendFactory;
    use confsync_core::Settings;
    use confsync_hooks::HookGraph;

    use super::*;

    async fn local_controller(dir: &TempDir, key: &str, contents: &str) -> Controller {
        let src = dir.path().join(format!("{key}.yaml"));
        let out = dir.path().join(format!("{key}.json"));
        fs::write(&src, contents).expect("write source");

        let settings_path = dir.path().join(format!("{key}-settings.yaml"));
        fs::write(
            &settings_path,
            format!(
                r#"
objects:
  {key}:
    source:
      backend: local
      format: yaml
      path: {src}
    dest:
      path: {out}
      format: json
"#,
                src = src.display(),
                out = out.display(),
            ),
        )
        .expect("write settings");

        let settings = Settings::load(&settings_path).expect("load settings");
        let spec = settings.object_spec(key).expect("spec");
        Controller::from_spec(&spec, &BackendFactory::new(None), Arc::new(HookGraph::disabled()))
            .await
            .expect("controller")
    }

    #[tokio::test]
    async fn apply_all_runs_every_object_and_collects_failures() {
        let dir = TempDir::new().expect("tempdir");
        let good = local_controller(&dir, "good", "k: 1\n").await;
        // Invalid YAML mapping makes this object's decode fail.
        let bad = local_controller(&dir, "bad", "just a scalar").await;

        let outcomes = apply_all(vec![good, bad]).await;
        assert_eq!(outcomes.len(), 2);

        let good_outcome = outcomes.iter().find(|o| o.key.0 == "good").expect("good");
        assert!(good_outcome.result.is_ok());
        assert!(dir.path().join("good.json").is_file());

        let bad_outcome = outcomes.iter().find(|o| o.key.0 == "bad").expect("bad");
        assert!(bad_outcome.result.is_err(), "sibling failure is isolated");
    }

    #[tokio::test]
    async fn monitor_stops_cleanly_on_shutdown() {
        let dir = TempDir::new().expect("tempdir");
        let controller = local_controller(&dir, "watched", "k: 1\n").await;
        let out = dir.path().join("watched.json");

        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let sender = shutdown_tx.clone();
        let monitor = tokio::spawn(monitor_all_with_shutdown(vec![controller], shutdown_tx));

        // Give the loop time to perform its first write, then shut down.
        for _ in 0..50 {
            if out.is_file() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(out.is_file(), "first sync write should have happened");

        sender.send(()).expect("send shutdown");
        tokio::time::timeout(Duration::from_secs(5), monitor)
            .await
            .expect("monitor exits after shutdown")
            .expect("join")
            .expect("monitor result");
    }
}
