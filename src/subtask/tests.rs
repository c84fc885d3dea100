//! Tests for subtask scheduling

use super::*;
use crate::error::{Error, Result};
use crate::store::MemoryStore;
use crate::types::DomainType;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct Probe {
    ran: RefCell<Vec<&'static str>>,
    fail: BTreeSet<&'static str>,
    cancel_in: Option<&'static str>,
}

impl Probe {
    fn failing(names: &[&'static str]) -> Self {
        Self {
            fail: names.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn ran(&self) -> Vec<&'static str> {
        self.ran.borrow().clone()
    }
}

fn record(ctx: &SubTaskContext<'_, Probe>) -> Result<()> {
    ctx.check_cancelled()?;
    ctx.data.ran.borrow_mut().push(ctx.subtask);
    if ctx.data.cancel_in == Some(ctx.subtask) {
        ctx.cancel.cancel();
    }
    if ctx.data.fail.contains(ctx.subtask) {
        return Err(Error::not_found("project", "42"));
    }
    Ok(())
}

fn meta(name: &'static str, dependencies: &'static [&'static str]) -> SubTaskMeta<Probe> {
    SubTaskMeta {
        name,
        entry_point: record,
        enabled_by_default: true,
        description: "",
        domain_types: &[DomainType::Cicd],
        dependencies,
    }
}

fn no_flags() -> BTreeMap<String, bool> {
    BTreeMap::new()
}

fn flags(entries: &[(&str, bool)]) -> BTreeMap<String, bool> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn run(scheduler: &SubTaskScheduler<Probe>, flags: &BTreeMap<String, bool>, probe: &Probe) -> RunReport {
    let store = MemoryStore::new();
    scheduler
        .run(flags, &store, probe, &CancellationToken::new())
        .unwrap()
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn test_dependencies_run_first() {
    let scheduler = SubTaskScheduler::new(
        "demo",
        vec![meta("C", &["B"]), meta("A", &[]), meta("B", &["A"])],
    )
    .unwrap();
    assert_eq!(scheduler.order(), vec!["A", "B", "C"]);

    let probe = Probe::default();
    let report = run(&scheduler, &no_flags(), &probe);
    assert_eq!(probe.ran(), vec!["A", "B", "C"]);
    assert!(report.is_success());
}

#[test]
fn test_independent_subtasks_keep_declaration_order() {
    let scheduler = SubTaskScheduler::new(
        "demo",
        vec![
            meta("ExtractProject", &[]),
            meta("ConvertProject", &["ExtractProject"]),
            meta("ExtractDeployment", &[]),
            meta("ConvertDeployment", &["ExtractDeployment", "ExtractProject"]),
        ],
    )
    .unwrap();
    assert_eq!(
        scheduler.order(),
        vec![
            "ExtractProject",
            "ConvertProject",
            "ExtractDeployment",
            "ConvertDeployment"
        ]
    );
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_cycle_is_config_error() {
    let err = SubTaskScheduler::new("demo", vec![meta("A", &["B"]), meta("B", &["A"])])
        .err()
        .unwrap();
    assert!(err.is_config_error());
    match err {
        Error::DependencyCycle { path } => assert_eq!(path, "A -> B -> A"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_self_dependency_is_cycle() {
    let result = SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("B", &["B"])]);
    assert!(matches!(result, Err(Error::DependencyCycle { path }) if path == "B -> B"));
}

#[test]
fn test_duplicate_name_rejected() {
    let result = SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("A", &[])]);
    assert!(matches!(result, Err(Error::DuplicateSubTask { name }) if name == "A"));
}

#[test]
fn test_unknown_dependency_rejected() {
    let result = SubTaskScheduler::new("demo", vec![meta("A", &["Missing"])]);
    assert!(matches!(result, Err(Error::UnknownSubTask { .. })));
}

#[test]
fn test_unknown_flag_fails_before_running() {
    let scheduler = SubTaskScheduler::new("demo", vec![meta("A", &[])]).unwrap();
    let probe = Probe::default();
    let store = MemoryStore::new();

    let err = scheduler
        .run(
            &flags(&[("Typo", true)]),
            &store,
            &probe,
            &CancellationToken::new(),
        )
        .unwrap_err();
    assert!(err.is_config_error());
    assert!(probe.ran().is_empty());
    assert!(scheduler.plan(&flags(&[("Typo", false)])).is_err());
}

// ============================================================================
// Execution Tests
// ============================================================================

#[test]
fn test_failed_dependency_blocks_dependents() {
    let scheduler =
        SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("B", &["A"]), meta("C", &[])])
            .unwrap();
    let probe = Probe::failing(&["A"]);
    let report = run(&scheduler, &no_flags(), &probe);

    assert_eq!(probe.ran(), vec!["A", "C"]);
    let a = report.get("A").unwrap();
    assert_eq!(a.state, SubTaskState::Failed);
    assert!(a.executed);
    assert_eq!(a.error.as_deref(), Some("project not found: 42"));

    let b = report.get("B").unwrap();
    assert_eq!(b.state, SubTaskState::Failed);
    assert!(!b.executed);
    assert_eq!(b.error.as_deref(), Some("dependency A failed"));

    assert_eq!(report.get("C").unwrap().state, SubTaskState::Succeeded);
    assert!(!report.is_success());
}

#[test]
fn test_skipped_dependency_blocks_dependents() {
    let scheduler = SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("B", &["A"])]).unwrap();
    let probe = Probe::default();
    let report = run(&scheduler, &flags(&[("A", false)]), &probe);

    assert!(probe.ran().is_empty());
    assert_eq!(report.get("A").unwrap().state, SubTaskState::Skipped);
    let b = report.get("B").unwrap();
    assert_eq!(b.state, SubTaskState::Failed);
    assert!(!b.executed);
}

#[test]
fn test_flag_enables_subtask_disabled_by_default() {
    let mut optional = meta("Enrich", &[]);
    optional.enabled_by_default = false;
    let scheduler = SubTaskScheduler::new("demo", vec![meta("A", &[]), optional]).unwrap();

    let probe = Probe::default();
    let report = run(&scheduler, &no_flags(), &probe);
    assert_eq!(report.get("Enrich").unwrap().state, SubTaskState::Skipped);
    assert!(report.is_success());

    let probe = Probe::default();
    run(&scheduler, &flags(&[("Enrich", true)]), &probe);
    assert_eq!(probe.ran(), vec!["A", "Enrich"]);
}

#[test]
fn test_cancellation_stops_remaining_subtasks() {
    let scheduler =
        SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("B", &[]), meta("C", &[])])
            .unwrap();
    let probe = Probe {
        cancel_in: Some("A"),
        ..Probe::default()
    };
    let report = run(&scheduler, &no_flags(), &probe);

    assert_eq!(probe.ran(), vec!["A"]);
    assert_eq!(report.get("A").unwrap().state, SubTaskState::Succeeded);
    for name in ["B", "C"] {
        let outcome = report.get(name).unwrap();
        assert_eq!(outcome.state, SubTaskState::Failed);
        assert!(!outcome.executed);
        assert_eq!(outcome.error.as_deref(), Some("cancelled"));
    }
}

#[test]
fn test_report_into_result_names_failed_subtask() {
    let scheduler = SubTaskScheduler::new("demo", vec![meta("A", &[]), meta("B", &[])]).unwrap();
    let report = run(&scheduler, &no_flags(), &Probe::failing(&["B"]));

    match report.into_result() {
        Err(Error::SubTaskFailed { name, message }) => {
            assert_eq!(name, "B");
            assert_eq!(message, "project not found: 42");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_plan_lists_order_and_flags() {
    let scheduler = SubTaskScheduler::new("demo", vec![meta("B", &["A"]), meta("A", &[])]).unwrap();
    let plan = scheduler.plan(&flags(&[("B", false)])).unwrap();

    assert_eq!(
        plan,
        vec![
            PlannedSubTask {
                name: "A".to_string(),
                enabled: true,
                dependencies: vec![],
                domain_types: vec![DomainType::Cicd],
            },
            PlannedSubTask {
                name: "B".to_string(),
                enabled: false,
                dependencies: vec!["A".to_string()],
                domain_types: vec![DomainType::Cicd],
            },
        ]
    );
}

#[test]
fn test_state_terminality() {
    assert!(!SubTaskState::Pending.is_terminal());
    assert!(!SubTaskState::Running.is_terminal());
    assert!(SubTaskState::Skipped.is_terminal());
    assert_eq!(SubTaskState::Succeeded.to_string(), "succeeded");
}
