//! Hook execution: a stateless graph walk plus the [`TaskRunner`] seam that
//! keeps command spawning opaque to the engine.

use std::sync::Mutex;

use async_trait::async_trait;

use confsync_core::HookName;

use crate::{HookError, HookGraph, TaskDef};

// ---------------------------------------------------------------------------
// Task runner
// ---------------------------------------------------------------------------

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    Failed { code: Option<i32> },
}

/// Runs a single task. The engine treats the invocation as opaque: command
/// spec in, success or failure out.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &TaskDef) -> Result<TaskStatus, HookError>;
}

/// Default runner: spawns the task's argv as a child process and waits for
/// its exit status. stdout/stderr are inherited so task output streams
/// through.
#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl TaskRunner for ProcessRunner {
    async fn run(&self, task: &TaskDef) -> Result<TaskStatus, HookError> {
        let (program, args) = task.cmd.split_first().ok_or_else(|| HookError::EmptyCommand {
            task: task.name.clone(),
        })?;

        tracing::info!(task = %task.name, "running hook task");
        let status = tokio::process::Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                task: task.name.clone(),
                source,
            })?;

        if status.success() {
            Ok(TaskStatus::Success)
        } else {
            Ok(TaskStatus::Failed {
                code: status.code(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Executor state, observable between invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookState {
    Idle,
    Running(HookName),
    Failed { task: HookName, reason: String },
}

/// Drives hook invocations against a loaded [`HookGraph`].
///
/// One invocation is in flight per [`Executor::execute`] call; concurrent
/// calls on different names are not coordinated here — callers serialize
/// when that matters.
pub struct Executor {
    runner: Box<dyn TaskRunner>,
    state: Mutex<HookState>,
}

impl Executor {
    pub fn new(runner: Box<dyn TaskRunner>) -> Self {
        Executor {
            runner,
            state: Mutex::new(HookState::Idle),
        }
    }

    /// Executor backed by the default [`ProcessRunner`].
    pub fn process() -> Self {
        Executor::new(Box::new(ProcessRunner))
    }

    /// Current state snapshot.
    pub fn state(&self) -> HookState {
        self.state.lock().expect("executor state poisoned").clone()
    }

    /// Execute the named task, running its full dependency chain first when
    /// it has one. Any intermediate failure aborts the graph execution
    /// immediately; later batches are never started.
    pub async fn execute(&self, graph: &HookGraph, name: &HookName) -> Result<(), HookError> {
        self.set_state(HookState::Running(name.clone()));
        let result = run_graph(graph, name, self.runner.as_ref()).await;
        match &result {
            Ok(()) => self.set_state(HookState::Idle),
            Err(err) => self.set_state(HookState::Failed {
                task: name.clone(),
                reason: err.to_string(),
            }),
        }
        result
    }

    fn set_state(&self, state: HookState) {
        *self.state.lock().expect("executor state poisoned") = state;
    }
}

async fn run_graph(
    graph: &HookGraph,
    name: &HookName,
    runner: &dyn TaskRunner,
) -> Result<(), HookError> {
    if graph.is_disabled() {
        return Err(HookError::Disabled { name: name.clone() });
    }
    let task = graph.get(name).ok_or_else(|| HookError::Undefined {
        name: name.clone(),
        known: graph.known_names(),
    })?;

    if task.deps.is_empty() {
        return run_direct(task, runner).await;
    }

    let plan = graph.execution_plan(name)?;
    execute_plan(&plan, name, runner).await
}

/// Run an execution plan. The sink task is run through the direct path so
/// its output behavior matches non-dependent tasks; an empty plan is a
/// no-op success.
async fn execute_plan(
    plan: &[Vec<&TaskDef>],
    sink: &HookName,
    runner: &dyn TaskRunner,
) -> Result<(), HookError> {
    for batch in plan {
        for task in batch {
            if &task.name == sink {
                return run_direct(task, runner).await;
            }
            match runner.run(task).await? {
                TaskStatus::Success => {}
                TaskStatus::Failed { code } => {
                    tracing::error!(task = %task.name, ?code, "hook dependency failed");
                    return Err(HookError::Aborted {
                        task: task.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

async fn run_direct(task: &TaskDef, runner: &dyn TaskRunner) -> Result<(), HookError> {
    match runner.run(task).await? {
        TaskStatus::Success => Ok(()),
        TaskStatus::Failed { code } => Err(HookError::ExecutionFailed {
            task: task.name.clone(),
            code,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::{CmdSpec, RawTask};

    /// Records invocation order; fails the tasks named in `fail`.
    #[derive(Default)]
    struct RecordingRunner {
        invoked: Mutex<Vec<String>>,
        fail: HashSet<String>,
    }

    impl RecordingRunner {
        fn failing(names: &[&str]) -> Self {
            RecordingRunner {
                invoked: Mutex::new(Vec::new()),
                fail: names.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn invoked(&self) -> Vec<String> {
            self.invoked.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl TaskRunner for RecordingRunner {
        async fn run(&self, task: &TaskDef) -> Result<TaskStatus, HookError> {
            self.invoked.lock().expect("lock").push(task.name.0.clone());
            if self.fail.contains(&task.name.0) {
                Ok(TaskStatus::Failed { code: Some(1) })
            } else {
                Ok(TaskStatus::Success)
            }
        }
    }

    fn graph(entries: &[(&str, &[&str])]) -> HookGraph {
        let table: BTreeMap<String, RawTask> = entries
            .iter()
            .map(|(name, deps)| {
                (
                    name.to_string(),
                    RawTask {
                        cmd: CmdSpec::Argv(vec!["true".to_string()]),
                        deps: deps.iter().map(|s| s.to_string()).collect(),
                    },
                )
            })
            .collect();
        HookGraph::from_table(table).expect("valid graph")
    }

    #[tokio::test]
    async fn task_without_deps_runs_alone() {
        let graph = graph(&[("solo", &[]), ("other", &[])]);
        let runner = RecordingRunner::default();
        run_graph(&graph, &HookName::from("solo"), &runner)
            .await
            .expect("execute");
        assert_eq!(runner.invoked(), vec!["solo"]);
    }

    #[tokio::test]
    async fn dependencies_run_before_the_sink() {
        let graph = graph(&[("h1", &[]), ("h2", &["h1"])]);
        let runner = RecordingRunner::default();
        run_graph(&graph, &HookName::from("h2"), &runner)
            .await
            .expect("execute");
        assert_eq!(runner.invoked(), vec!["h1", "h2"]);
    }

    #[tokio::test]
    async fn failed_dependency_aborts_before_the_sink() {
        let graph = graph(&[("h1", &[]), ("h2", &["h1"])]);
        let runner = RecordingRunner::failing(&["h1"]);
        let err = run_graph(&graph, &HookName::from("h2"), &runner)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, HookError::Aborted { task } if task.0 == "h1"),
            "{err}"
        );
        assert_eq!(runner.invoked(), vec!["h1"], "h2 must never be invoked");
    }

    #[tokio::test]
    async fn failed_sink_reports_execution_failure() {
        let graph = graph(&[("solo", &[])]);
        let runner = RecordingRunner::failing(&["solo"]);
        let err = run_graph(&graph, &HookName::from("solo"), &runner)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::ExecutionFailed { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn empty_plan_is_a_no_op_success() {
        let runner = RecordingRunner::default();
        execute_plan(&[], &HookName::from("anything"), &runner)
            .await
            .expect("empty plan succeeds");
        assert!(runner.invoked().is_empty());
    }

    #[tokio::test]
    async fn disabled_graph_rejects_execution() {
        let runner = RecordingRunner::default();
        let err = run_graph(&HookGraph::disabled(), &HookName::from("x"), &runner)
            .await
            .unwrap_err();
        assert!(matches!(err, HookError::Disabled { .. }));
    }

    #[tokio::test]
    async fn executor_tracks_state_transitions() {
        let graph = graph(&[("ok", &[]), ("bad", &[])]);
        let executor = Executor::new(Box::new(RecordingRunner::failing(&["bad"])));
        assert_eq!(executor.state(), HookState::Idle);

        executor
            .execute(&graph, &HookName::from("ok"))
            .await
            .expect("ok task");
        assert_eq!(executor.state(), HookState::Idle);

        executor
            .execute(&graph, &HookName::from("bad"))
            .await
            .unwrap_err();
        assert!(matches!(
            executor.state(),
            HookState::Failed { task, .. } if task.0 == "bad"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_runner_reports_exit_status() {
        let ok = TaskDef {
            name: HookName::from("ok"),
            cmd: vec!["true".to_string()],
            deps: vec![],
        };
        let bad = TaskDef {
            name: HookName::from("bad"),
            cmd: vec!["false".to_string()],
            deps: vec![],
        };

        let runner = ProcessRunner;
        assert_eq!(runner.run(&ok).await.expect("run"), TaskStatus::Success);
        assert!(matches!(
            runner.run(&bad).await.expect("run"),
            TaskStatus::Failed { .. }
        ));
    }
}
