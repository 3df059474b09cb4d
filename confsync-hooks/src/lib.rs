//! Hook task graph: named external tasks, their dependency edges, and the
//! executor that runs a task or its full dependency chain.
//!
//! Tasks are plain data ([`TaskDef`]); execution state lives in the
//! [`Executor`], which takes the graph and a [`TaskRunner`] as explicit
//! parameters. The graph is read-only after load and may be shared across
//! controllers.

mod error;
pub mod executor;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use confsync_core::HookName;

pub use error::HookError;
pub use executor::{Executor, HookState, ProcessRunner, TaskRunner, TaskStatus};

// ---------------------------------------------------------------------------
// Task definitions
// ---------------------------------------------------------------------------

/// One named external task: a command invocation plus the names of the tasks
/// that must complete successfully before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDef {
    pub name: HookName,
    /// Command argv; the first element is the program.
    pub cmd: Vec<String>,
    pub deps: Vec<HookName>,
}

/// Raw task entry as it appears in the settings file's `hooks:` table.
///
/// `cmd` accepts either an argv list or a single line split on whitespace;
/// the argv form is authoritative for arguments containing spaces.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub cmd: CmdSpec,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CmdSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CmdSpec {
    fn into_argv(self) -> Vec<String> {
        match self {
            CmdSpec::Line(line) => line.split_whitespace().map(str::to_owned).collect(),
            CmdSpec::Argv(argv) => argv,
        }
    }
}

// ---------------------------------------------------------------------------
// Hook graph
// ---------------------------------------------------------------------------

/// The DAG of hook tasks, loaded once per process and immutable thereafter.
///
/// A missing or invalid task table yields a *disabled* graph: loading never
/// fails, but any object that references a hook while the graph is disabled
/// is a fatal configuration error at controller construction.
#[derive(Debug, Default)]
pub struct HookGraph {
    tasks: BTreeMap<HookName, TaskDef>,
    disabled: bool,
}

impl HookGraph {
    /// The empty, disabled graph used when no task table could be loaded.
    pub fn disabled() -> Self {
        HookGraph {
            tasks: BTreeMap::new(),
            disabled: true,
        }
    }

    /// Build a graph from the settings file's `hooks:` value.
    ///
    /// `None` (no `hooks:` section) and any malformed table both degrade to
    /// the disabled graph with a warning; they never fail the load.
    pub fn from_settings(value: Option<&serde_yaml::Value>) -> Self {
        let Some(value) = value else {
            return HookGraph::disabled();
        };

        let table: BTreeMap<String, RawTask> = match serde_yaml::from_value(value.clone()) {
            Ok(table) => table,
            Err(err) => {
                tracing::warn!(error = %err, "invalid hook table; hooks are disabled");
                return HookGraph::disabled();
            }
        };

        match HookGraph::from_table(table) {
            Ok(graph) => graph,
            Err(err) => {
                tracing::warn!(error = %err, "invalid hook graph; hooks are disabled");
                HookGraph::disabled()
            }
        }
    }

    /// Build and validate a graph from raw task entries.
    ///
    /// Every dependency must name a defined task, commands must be
    /// non-empty, and the graph must be acyclic.
    pub fn from_table(table: BTreeMap<String, RawTask>) -> Result<Self, HookError> {
        let mut tasks = BTreeMap::new();
        for (name, raw) in table {
            let name = HookName::from(name);
            let cmd = raw.cmd.into_argv();
            if cmd.is_empty() {
                return Err(HookError::EmptyCommand { task: name });
            }
            let deps = raw.deps.iter().map(|d| HookName::from(d.as_str())).collect();
            tasks.insert(name.clone(), TaskDef { name, cmd, deps });
        }

        let graph = HookGraph {
            tasks,
            disabled: false,
        };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), HookError> {
        for task in self.tasks.values() {
            for dep in &task.deps {
                if !self.tasks.contains_key(dep) {
                    return Err(HookError::UnknownDependency {
                        task: task.name.clone(),
                        dep: dep.clone(),
                    });
                }
            }
        }

        // Iterative DFS with three colors; a back edge is a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<&HookName, Mark> = HashMap::new();
        for start in self.tasks.keys() {
            if marks.contains_key(start) {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            marks.insert(start, Mark::Visiting);
            while let Some((name, dep_idx)) = stack.pop() {
                let task = &self.tasks[name];
                if dep_idx < task.deps.len() {
                    stack.push((name, dep_idx + 1));
                    let dep = &task.deps[dep_idx];
                    match marks.get(dep) {
                        Some(Mark::Visiting) => {
                            return Err(HookError::Cycle { task: dep.clone() })
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(dep, Mark::Visiting);
                            stack.push((dep, 0));
                        }
                    }
                } else {
                    marks.insert(name, Mark::Done);
                }
            }
        }
        Ok(())
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn contains(&self, name: &HookName) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &HookName) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    /// All defined task names, sorted.
    pub fn known_names(&self) -> Vec<String> {
        self.tasks.keys().map(|n| n.0.clone()).collect()
    }

    /// Compute the execution plan for `name`: ordered batches of tasks
    /// respecting the dependency edges, restricted to the task's transitive
    /// dependency closure, with the requested (sink) task in the final batch.
    pub fn execution_plan(&self, name: &HookName) -> Result<Vec<Vec<&TaskDef>>, HookError> {
        let sink = self.tasks.get(name).ok_or_else(|| HookError::Undefined {
            name: name.clone(),
            known: self.known_names(),
        })?;

        // Transitive dependency closure of the sink.
        let mut closure: HashSet<&HookName> = HashSet::new();
        let mut pending = vec![&sink.name];
        while let Some(current) = pending.pop() {
            if !closure.insert(current) {
                continue;
            }
            for dep in &self.tasks[current].deps {
                pending.push(dep);
            }
        }

        // Layered topological order: a task joins the first batch in which
        // all of its dependencies are already satisfied.
        let mut plan: Vec<Vec<&TaskDef>> = Vec::new();
        let mut satisfied: HashSet<&HookName> = HashSet::new();
        let mut remaining: Vec<&HookName> = closure.iter().copied().collect();
        remaining.sort();

        while !remaining.is_empty() {
            let (ready, rest): (Vec<&HookName>, Vec<&HookName>) =
                remaining.iter().copied().partition(|name| {
                    self.tasks[*name].deps.iter().all(|d| satisfied.contains(d))
                });
            if ready.is_empty() {
                // Unreachable after validate(), but a cycle would spin here.
                return Err(HookError::Cycle {
                    task: rest[0].clone(),
                });
            }
            for name in &ready {
                satisfied.insert(*name);
            }
            plan.push(ready.iter().map(|name| &self.tasks[*name]).collect());
            remaining = rest;
        }

        Ok(plan)
    }
}
