//! Pipeline tests against DuckDB
//!
//! Each test works on a database file inside a fresh temporary directory.

use serde_json::{json, Value};
use solidafy_convert::config::{load_task_config_from_str, TaskConfig};
use solidafy_convert::plugins::gitlab::{RAW_DEPLOYMENT_TABLE, RAW_PROJECT_TABLE};
use solidafy_convert::plugins::{find_plugin, import_raw};
use solidafy_convert::store::{DuckDbStore, RowFilter, Store, StoredRow};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn task() -> TaskConfig {
    load_task_config_from_str(
        r#"
plugin: gitlab
connection_id: 3
project_id: 77
batch_size: 3
"#,
    )
    .unwrap()
}

fn database() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lake.duckdb");
    (dir, path)
}

fn deployment(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "iid": id,
        "ref": "release",
        "sha": format!("{id:x}"),
        "status": status,
        "created_at": "2024-05-01T12:00:00Z",
        "environment": {"name": "production"},
        "deployable": {
            "id": id + 100,
            "name": "ship",
            "status": status,
            "started_at": "2024-05-01T12:00:10Z",
            "finished_at": "2024-05-01T12:02:10Z",
            "duration": 0.0
        }
    })
}

fn seed(store: &dyn Store, config: &TaskConfig, deployments: u64) {
    let plugin = find_plugin("gitlab").unwrap();
    import_raw(
        store,
        plugin.as_ref(),
        config,
        RAW_PROJECT_TABLE,
        vec![json!({
            "id": 77,
            "name": "infra",
            "path_with_namespace": "ops/infra",
            "web_url": "https://gitlab.example.com/ops/infra",
            "created_at": "2023-01-01T00:00:00Z"
        })],
    )
    .unwrap();
    let payloads = (1..=deployments)
        .map(|id| deployment(id, if id % 3 == 0 { "failed" } else { "success" }))
        .collect::<Vec<_>>();
    import_raw(store, plugin.as_ref(), config, RAW_DEPLOYMENT_TABLE, payloads).unwrap();
}

fn rows(store: &dyn Store, table: &str) -> Vec<StoredRow> {
    store
        .cursor(table, &RowFilter::new())
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn test_pipeline_on_duckdb() {
    let (_dir, path) = database();
    let store = DuckDbStore::open(&path).unwrap().with_page_size(4);
    let config = task();
    seed(&store, &config, 10);

    let report = find_plugin("gitlab")
        .unwrap()
        .run(&store, &config, &CancellationToken::new())
        .unwrap();
    assert!(report.is_success(), "{report:?}");

    let commits = rows(&store, "cicd_deployment_commits");
    assert_eq!(commits.len(), 10);
    assert_eq!(rows(&store, "cicd_deployments").len(), 10);
    assert!(store.table_exists("cicd_scopes").unwrap());

    let failed = commits
        .iter()
        .filter(|r| r.data["result"] == "FAILURE")
        .count();
    assert_eq!(failed, 3);
    assert!(commits.iter().all(|r| r.data["duration_sec"] == 120));
    assert!(commits
        .iter()
        .all(|r| r.data["repo_url"] == "https://gitlab.example.com/ops/infra"));
}

#[test]
fn test_output_survives_reopen_and_rerun() {
    let (_dir, path) = database();
    let config = task();

    let snapshot = {
        let store = DuckDbStore::open(&path).unwrap();
        seed(&store, &config, 5);
        find_plugin("gitlab")
            .unwrap()
            .run(&store, &config, &CancellationToken::new())
            .unwrap();
        rows(&store, "cicd_deployment_commits")
    };
    assert_eq!(snapshot.len(), 5);

    let store = DuckDbStore::open(&path).unwrap();
    assert_eq!(rows(&store, "cicd_deployment_commits"), snapshot);

    find_plugin("gitlab")
        .unwrap()
        .run(&store, &config, &CancellationToken::new())
        .unwrap();
    assert_eq!(rows(&store, "cicd_deployment_commits"), snapshot);
}

#[test]
fn test_shrunk_source_on_duckdb() {
    let (_dir, path) = database();
    let store = DuckDbStore::open(&path).unwrap();
    let config = task();
    let plugin = find_plugin("gitlab").unwrap();

    seed(&store, &config, 6);
    plugin.run(&store, &config, &CancellationToken::new()).unwrap();
    seed(&store, &config, 2);
    plugin.run(&store, &config, &CancellationToken::new()).unwrap();

    let ids: Vec<String> = rows(&store, "cicd_deployments")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(
        ids,
        vec!["gitlab:GitlabDeployment:3:1", "gitlab:GitlabDeployment:3:2"]
    );
}

#[test]
fn test_connections_share_tables_on_duckdb() {
    let (_dir, path) = database();
    let store = DuckDbStore::open(&path).unwrap().with_page_size(2);
    let first = task();
    let mut second = first.clone();
    second.connection_id = 4;
    let plugin = find_plugin("gitlab").unwrap();

    seed(&store, &first, 3);
    seed(&store, &second, 1);
    assert_eq!(
        store
            .count(RAW_DEPLOYMENT_TABLE, &RowFilter::new().connection(3))
            .unwrap(),
        3
    );
    assert_eq!(
        store
            .count(RAW_DEPLOYMENT_TABLE, &RowFilter::new().connection(4))
            .unwrap(),
        1
    );

    for config in [&first, &second, &first] {
        let report = plugin.run(&store, config, &CancellationToken::new()).unwrap();
        assert!(report.is_success(), "{report:?}");
    }

    let ids: Vec<String> = rows(&store, "cicd_deployment_commits")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(
        ids,
        vec![
            "gitlab:GitlabDeployment:3:1",
            "gitlab:GitlabDeployment:3:2",
            "gitlab:GitlabDeployment:3:3",
            "gitlab:GitlabDeployment:4:1",
        ]
    );
}

#[test]
fn test_blocking_run_from_async_context() {
    let (_dir, path) = database();
    let store: Arc<dyn Store> = Arc::new(DuckDbStore::open(&path).unwrap());
    let config = task();
    seed(store.as_ref(), &config, 4);

    let report = tokio_test::block_on(async {
        let store = Arc::clone(&store);
        let plugin = find_plugin(&config.plugin).unwrap();
        let config = config.clone();
        tokio::task::spawn_blocking(move || {
            plugin.run(store.as_ref(), &config, &CancellationToken::new())
        })
        .await
        .unwrap()
    })
    .unwrap();

    assert!(report.is_success());
    assert_eq!(rows(store.as_ref(), "cicd_deployment_commits").len(), 4);
}
