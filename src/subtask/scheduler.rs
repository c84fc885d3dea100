//! SubTask scheduler
//!
//! Orders a plugin's subtasks by their declared dependencies and runs them
//! one after another.

use super::types::{PlannedSubTask, RunReport, SubTaskContext, SubTaskMeta, SubTaskOutcome, SubTaskState};
use crate::error::{Error, Result};
use crate::store::Store;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Dependency-ordered runner for one plugin's subtasks
pub struct SubTaskScheduler<D> {
    plugin: String,
    metas: Vec<SubTaskMeta<D>>,
    /// Indexes into `metas`, dependencies first
    order: Vec<usize>,
    /// Dependency indexes per subtask
    deps: Vec<BTreeSet<usize>>,
}

impl<D> SubTaskScheduler<D> {
    /// Validate the subtask table and compute the execution order
    ///
    /// Duplicate names, unknown dependencies and cycles are configuration
    /// errors.
    pub fn new(plugin: impl Into<String>, metas: Vec<SubTaskMeta<D>>) -> Result<Self> {
        let plugin = plugin.into();

        let mut index = BTreeMap::new();
        for (i, meta) in metas.iter().enumerate() {
            if index.insert(meta.name, i).is_some() {
                return Err(Error::DuplicateSubTask {
                    name: meta.name.to_string(),
                });
            }
        }

        let mut deps = Vec::with_capacity(metas.len());
        for meta in &metas {
            let mut set = BTreeSet::new();
            for dep in meta.dependencies {
                let Some(&d) = index.get(dep) else {
                    return Err(Error::UnknownSubTask {
                        plugin: plugin.clone(),
                        name: format!("{dep} (dependency of {})", meta.name),
                    });
                };
                set.insert(d);
            }
            deps.push(set);
        }

        let order = topo_sort(&metas, &deps)?;
        tracing::debug!(
            plugin = %plugin,
            order = ?order.iter().map(|&i| metas[i].name).collect::<Vec<_>>(),
            "subtask order resolved"
        );

        Ok(Self {
            plugin,
            metas,
            order,
            deps,
        })
    }

    /// Plugin name
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Registered subtasks in declaration order
    pub fn metas(&self) -> &[SubTaskMeta<D>] {
        &self.metas
    }

    /// Subtask names in execution order
    pub fn order(&self) -> Vec<&'static str> {
        self.order.iter().map(|&i| self.metas[i].name).collect()
    }

    /// Resolve enable flags into an execution plan
    ///
    /// Flags override `enabled_by_default`; naming a subtask the plugin does
    /// not have is a configuration error.
    pub fn plan(&self, flags: &BTreeMap<String, bool>) -> Result<Vec<PlannedSubTask>> {
        let enabled = self.resolve_flags(flags)?;
        Ok(self
            .order
            .iter()
            .map(|&i| {
                let meta = &self.metas[i];
                PlannedSubTask {
                    name: meta.name.to_string(),
                    enabled: enabled[i],
                    dependencies: meta.dependencies.iter().map(ToString::to_string).collect(),
                    domain_types: meta.domain_types.to_vec(),
                }
            })
            .collect())
    }

    /// Run every subtask in order
    ///
    /// Configuration errors are returned before anything runs. Subtask
    /// failures are recorded in the report; the dependents of a failed or
    /// skipped subtask are marked failed without running.
    pub fn run(
        &self,
        flags: &BTreeMap<String, bool>,
        store: &dyn Store,
        data: &D,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let enabled = self.resolve_flags(flags)?;
        let mut states = vec![SubTaskState::Pending; self.metas.len()];
        let mut outcomes = Vec::with_capacity(self.metas.len());

        tracing::info!(plugin = %self.plugin, subtasks = self.order.len(), "plugin run started");

        for &i in &self.order {
            let meta = &self.metas[i];

            if cancel.is_cancelled() {
                tracing::warn!(plugin = %self.plugin, subtask = meta.name, "run cancelled, subtask not started");
                states[i] = SubTaskState::Failed;
                outcomes.push(not_executed(meta.name, SubTaskState::Failed, Some("cancelled".to_string())));
                continue;
            }

            if !enabled[i] {
                tracing::info!(plugin = %self.plugin, subtask = meta.name, "subtask skipped");
                states[i] = SubTaskState::Skipped;
                outcomes.push(not_executed(meta.name, SubTaskState::Skipped, None));
                continue;
            }

            if let Some(&blocker) = self.deps[i]
                .iter()
                .find(|&&d| states[d] != SubTaskState::Succeeded)
            {
                let reason = format!(
                    "dependency {} {}",
                    self.metas[blocker].name, states[blocker]
                );
                tracing::warn!(plugin = %self.plugin, subtask = meta.name, reason = %reason, "subtask blocked");
                states[i] = SubTaskState::Failed;
                outcomes.push(not_executed(meta.name, SubTaskState::Failed, Some(reason)));
                continue;
            }

            states[i] = SubTaskState::Running;
            tracing::info!(plugin = %self.plugin, subtask = meta.name, "subtask running");

            let ctx = SubTaskContext {
                plugin: &self.plugin,
                subtask: meta.name,
                store,
                data,
                cancel,
            };
            let started = Instant::now();
            let result = (meta.entry_point)(&ctx);
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (state, error) = match result {
                Ok(()) => {
                    tracing::info!(plugin = %self.plugin, subtask = meta.name, duration_ms, "subtask succeeded");
                    (SubTaskState::Succeeded, None)
                }
                Err(e) => {
                    tracing::warn!(plugin = %self.plugin, subtask = meta.name, error = %e, "subtask failed");
                    (SubTaskState::Failed, Some(e.to_string()))
                }
            };
            states[i] = state;
            outcomes.push(SubTaskOutcome {
                name: meta.name.to_string(),
                state,
                executed: true,
                error,
                duration_ms,
            });
        }

        let report = RunReport {
            plugin: self.plugin.clone(),
            outcomes,
        };
        tracing::info!(plugin = %self.plugin, success = report.is_success(), "plugin run finished");
        Ok(report)
    }

    fn resolve_flags(&self, flags: &BTreeMap<String, bool>) -> Result<Vec<bool>> {
        if let Some(unknown) = flags
            .keys()
            .find(|name| !self.metas.iter().any(|m| m.name == name.as_str()))
        {
            return Err(Error::UnknownSubTask {
                plugin: self.plugin.clone(),
                name: unknown.clone(),
            });
        }
        Ok(self
            .metas
            .iter()
            .map(|m| flags.get(m.name).copied().unwrap_or(m.enabled_by_default))
            .collect())
    }
}

fn not_executed(name: &str, state: SubTaskState, error: Option<String>) -> SubTaskOutcome {
    SubTaskOutcome {
        name: name.to_string(),
        state,
        executed: false,
        error,
        duration_ms: 0,
    }
}

/// Kahn's algorithm; ties go to the subtask declared first
fn topo_sort<D>(metas: &[SubTaskMeta<D>], deps: &[BTreeSet<usize>]) -> Result<Vec<usize>> {
    let mut indegree: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); metas.len()];
    for (i, set) in deps.iter().enumerate() {
        for &d in set {
            dependents[d].push(i);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(metas.len());

    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &c in &dependents[i] {
            indegree[c] -= 1;
            if indegree[c] == 0 {
                ready.push(Reverse(c));
            }
        }
    }

    if order.len() != metas.len() {
        let remaining: Vec<bool> = indegree.iter().map(|&n| n > 0).collect();
        return Err(Error::DependencyCycle {
            path: cycle_path(metas, deps, &remaining),
        });
    }
    Ok(order)
}

/// Walk unresolved dependencies until a subtask repeats
///
/// `A -> B` in the result reads "A depends on B".
fn cycle_path<D>(metas: &[SubTaskMeta<D>], deps: &[BTreeSet<usize>], remaining: &[bool]) -> String {
    let Some(start) = remaining.iter().position(|&r| r) else {
        return String::new();
    };

    let mut path = vec![start];
    let mut seen = BTreeMap::from([(start, 0)]);
    let mut current = start;
    while let Some(&next) = deps[current].iter().find(|&&d| remaining[d]) {
        if let Some(&pos) = seen.get(&next) {
            let mut names: Vec<&str> = path[pos..].iter().map(|&i| metas[i].name).collect();
            names.push(metas[next].name);
            return names.join(" -> ");
        }
        seen.insert(next, path.len());
        path.push(next);
        current = next;
    }

    remaining
        .iter()
        .enumerate()
        .filter(|&(_, &r)| r)
        .map(|(i, _)| metas[i].name)
        .collect::<Vec<_>>()
        .join(", ")
}
