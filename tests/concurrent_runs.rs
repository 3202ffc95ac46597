//! Independent runs compiling concurrently into disjoint directories

use saltforge::compiler::{Action, Context, Manifest, NodeInfo, spawn_compile};
use saltforge::{CompilerConfig, Pipeline};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn manifest_for(service: &str) -> Manifest {
    Manifest::from_value(&json!({
        service: {"type": "service", "enable": true, "reload": true},
        "ops": {"type": "group", "gid": 3000}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_concurrent_runs_use_own_state() {
    let pipeline = Arc::new(Pipeline::new(CompilerConfig::default()));
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    let run_a = spawn_compile(
        pipeline.clone(),
        manifest_for("nginx"),
        Action::new("configuration/generate").with_param("tag", "a"),
        Context::new(NodeInfo {
            id: "web-01".into(),
            ..NodeInfo::default()
        }),
        first.path().to_path_buf(),
    );
    let run_b = spawn_compile(
        pipeline.clone(),
        manifest_for("haproxy"),
        Action::new("configuration/generate").with_param("tag", "b"),
        Context::new(NodeInfo {
            id: "lb-01".into(),
            ..NodeInfo::default()
        }),
        second.path().to_path_buf(),
    );

    let (a, b) = tokio::join!(run_a, run_b);
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    // Group gids are claimed per run, so both runs may use 3000.
    assert_eq!(a.artifacts.len(), 2);
    assert_eq!(b.artifacts.len(), 2);
    assert_ne!(a.run_id, b.run_id);
    assert!(first.path().join("nginx.sls").exists());
    assert!(second.path().join("haproxy.sls").exists());
    assert!(!first.path().join("haproxy.sls").exists());
}

#[tokio::test]
async fn test_spawned_run_reports_failure() {
    let pipeline = Arc::new(Pipeline::new(CompilerConfig::default()));
    let dir = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({"x": {"type": "bogus"}})).unwrap();

    let err = spawn_compile(
        pipeline,
        manifest,
        Action::default(),
        Context::default(),
        dir.path().to_path_buf(),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.status(), 415);
}
