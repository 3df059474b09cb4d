//! Error types for confsync-hooks.

use thiserror::Error;

use confsync_core::HookName;

/// All errors that can arise from loading or executing the hook graph.
#[derive(Debug, Error)]
pub enum HookError {
    /// The named hook does not exist in the graph. Enumerates known names so
    /// the settings file can be fixed without reading source code.
    #[error("undefined hook '{name}' (known hooks: {})", format_known(.known))]
    Undefined { name: HookName, known: Vec<String> },

    /// A hook was referenced but no hook graph could be loaded.
    #[error("hook '{name}' is configured but no hook table was loaded")]
    Disabled { name: HookName },

    /// The task table contains a dependency cycle.
    #[error("hook dependency cycle involving task '{task}'")]
    Cycle { task: HookName },

    /// A task names a dependency that is not defined in the table.
    #[error("task '{task}' depends on undefined task '{dep}'")]
    UnknownDependency { task: HookName, dep: HookName },

    /// A dependency failed; the graph execution was aborted before later
    /// batches started.
    #[error("task graph aborted after failed task '{task}'")]
    Aborted { task: HookName },

    /// The requested task itself failed.
    #[error("task '{task}' failed{}", format_code(.code))]
    ExecutionFailed { task: HookName, code: Option<i32> },

    /// The task's command could not be spawned at all.
    #[error("failed to spawn task '{task}': {source}")]
    Spawn {
        task: HookName,
        #[source]
        source: std::io::Error,
    },

    /// A task was defined with an empty command.
    #[error("task '{task}' has an empty command")]
    EmptyCommand { task: HookName },
}

fn format_known(known: &[String]) -> String {
    if known.is_empty() {
        "none".to_string()
    } else {
        known.join(", ")
    }
}

fn format_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}
