//! Integration tests for manifest compilation
//!
//! Drives whole manifests through the pipeline and checks the artifacts on
//! disk, abort-on-first-error behaviour and action payload restoration.

use saltforge::compiler::artifact::StateDocument;
use saltforge::compiler::error::{CompileError, CompileResult};
use saltforge::compiler::{
    Action, Context, Manifest, ProcessorCatalog, ProcessorRegistry, Resource, ResourceProcessor,
};
use saltforge::{CompilerConfig, Pipeline};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn pipeline() -> Pipeline {
    Pipeline::with_registry(ProcessorRegistry::builtin(), CompilerConfig::default())
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

/// Counts invocations; used to observe whether a resource was processed.
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl ResourceProcessor for Counting {
    fn resource_type(&self) -> &'static str {
        "counting"
    }

    fn build(
        &self,
        _action: &mut Action,
        name: &str,
        _resource: &Resource,
        _context: &mut Context,
    ) -> CompileResult<StateDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(StateDocument::new(name, "test"))
    }
}

/// Scribbles over the action payload, then fails.
struct Scribbler;

impl ResourceProcessor for Scribbler {
    fn resource_type(&self) -> &'static str {
        "scribbler"
    }

    fn build(
        &self,
        action: &mut Action,
        _name: &str,
        _resource: &Resource,
        _context: &mut Context,
    ) -> CompileResult<StateDocument> {
        action.data.clear();
        action.data.insert("leaked".into(), json!(true));
        Err(saltforge::compiler::HttpError::operation_conflict("scribbled").into())
    }
}

#[test]
fn test_nginx_service_scenario() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({
        "nginx": {
            "type": "service",
            "enable": true,
            "reload": true,
            "watch": {"packages": ["nginx-pkg"]}
        }
    }))
    .unwrap();

    let paths = pipeline()
        .compile(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap();

    let expected_path = temp.path().join("nginx.sls");
    assert_eq!(paths, vec![expected_path.clone()]);
    assert_eq!(
        read_json(&expected_path),
        json!({"nginx": {"service": [
            "running",
            {"enable": true},
            {"reload": true},
            {"watch": [{"pkg": "nginx-pkg"}]}
        ]}})
    );

    let text = std::fs::read_to_string(&expected_path).unwrap();
    assert!(text.contains("\n    \"nginx\": {\n        \"service\": ["));
}

#[test]
fn test_full_manifest_in_declaration_order() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_json_str(
        r#"{
            "ops": {"type": "group", "gid": 2000, "members": ["alice"]},
            "nginx-pkg": {"type": "package", "package": "nginx"},
            "nginx-conf": {
                "type": "template",
                "path": "/etc/nginx/nginx.conf",
                "source": "salt://nginx/nginx.conf.j2"
            },
            "motd": {"type": "file", "path": "/etc/motd", "contents": "hello"},
            "nginx": {"type": "service", "enable": true, "watch": {"packages": ["nginx-pkg"]}}
        }"#,
    )
    .unwrap();

    let mut context = Context::default().with_packages(["nginx"]);
    let report = pipeline()
        .compile_report(&manifest, &mut Action::default(), &mut context, temp.path())
        .unwrap();

    let names: Vec<&str> = report.artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["ops", "nginx-pkg", "nginx-conf", "motd", "nginx"]);
    for artifact in &report.artifacts {
        assert!(artifact.path.exists());
        assert_eq!(artifact.digest.len(), 64);
    }
    assert_eq!(
        read_json(&temp.path().join("nginx-pkg.sls")),
        json!({"nginx-pkg": {"pkg": ["installed", {"name": "nginx"}]}})
    );
    assert!(report.top_file.is_none());
}

#[test]
fn test_recompilation_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({
        "nginx": {"type": "service", "enable": true, "reload": false,
                  "watch": {"packages": ["b", "a", "c"]}},
        "app": {"type": "template", "path": "/etc/app.conf", "source": "salt://app",
                "defaults": {"z": 1, "a": 2}}
    }))
    .unwrap();

    let first = pipeline()
        .compile_report(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap();
    let bytes: Vec<Vec<u8>> = first
        .paths()
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

    let second = pipeline()
        .compile_report(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap();
    let again: Vec<Vec<u8>> = second
        .paths()
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

    assert_eq!(bytes, again);
    let digests = |r: &saltforge::compiler::CompileReport| {
        r.artifacts.iter().map(|a| a.digest.clone()).collect::<Vec<_>>()
    };
    assert_eq!(digests(&first), digests(&second));
}

#[test]
fn test_unregistered_type_fails_without_writes() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({
        "nginx": {"type": "service", "enable": true},
        "thing": {"type": "bogus"}
    }))
    .unwrap();

    let err = pipeline()
        .compile(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap_err();

    let http = err.as_http().unwrap();
    assert_eq!(http.status(), 415);
    assert_eq!(http.name(), "UnsupportedTypeError");
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_abort_on_first_write_failure() {
    let temp = TempDir::new().unwrap();
    // A directory where the artifact should go makes the write fail.
    std::fs::create_dir(temp.path().join("nginx.sls")).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let catalog = ProcessorCatalog::with_builtins();
    catalog.register(Counting {
        calls: calls.clone(),
    });
    let pipeline = Pipeline::with_registry(catalog.snapshot(), CompilerConfig::default());

    let mut manifest = Manifest::new();
    manifest
        .insert("nginx", Resource::new("service").with("enable", true))
        .unwrap();
    manifest.insert("second", Resource::new("counting")).unwrap();

    let mut action = Action::new("configuration/generate").with_param("tag", "release-7");
    let before = action.clone();
    let mut context = Context::default();
    let err = pipeline
        .compile(&manifest, &mut action, &mut context, temp.path())
        .unwrap_err();

    assert_eq!(action, before);
    match err {
        CompileError::Write { path, .. } => assert_eq!(path, temp.path().join("nginx.sls")),
        other => panic!("expected write failure, got {other}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!temp.path().join("second.sls").exists());
    assert!(temp.path().join("nginx.sls").exists());
    assert!(context.compiled().is_empty());
}

#[test]
fn test_business_rule_failure_keeps_earlier_artifacts() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({
        "motd": {"type": "file", "path": "/etc/motd", "contents": "a"},
        "motd-again": {"type": "file", "path": "/etc/motd", "contents": "b"},
        "nginx": {"type": "service"}
    }))
    .unwrap();

    let err = pipeline()
        .compile(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap_err();

    assert_eq!(err.as_http().unwrap().code(), 40903);
    assert!(temp.path().join("motd.sls").exists());
    assert!(!temp.path().join("motd-again.sls").exists());
    assert!(!temp.path().join("nginx.sls").exists());
}

#[test]
fn test_action_data_restored_after_failure() {
    let temp = TempDir::new().unwrap();
    let catalog = ProcessorCatalog::with_builtins();
    catalog.register(Scribbler);
    let pipeline = Pipeline::with_registry(catalog.snapshot(), CompilerConfig::default());

    let mut manifest = Manifest::new();
    manifest.insert("nginx", Resource::new("service")).unwrap();
    manifest.insert("scribble", Resource::new("scribbler")).unwrap();

    let mut action = Action::new("configuration/generate")
        .with_param("tag", "release-42")
        .with_param("node", "web-01");
    let before = action.clone();

    let err = pipeline
        .compile(&manifest, &mut action, &mut Context::default(), temp.path())
        .unwrap_err();

    assert_eq!(err.as_http().unwrap().code(), 40901);
    assert_eq!(action, before);
}

#[test]
fn test_processor_restores_action_when_called_directly() {
    let temp = TempDir::new().unwrap();
    let registry = ProcessorRegistry::builtin();
    let writer = CompilerConfig::default().writer();
    let mut action = Action::new("x").with_param("resource", "outer");
    let before = action.data.clone();

    for (name, resource) in [
        ("svc", Resource::new("service")),
        ("pkg", Resource::new("package")),
        ("grp", Resource::new("group")),
        ("bad-file", Resource::new("file")),
        (
            "tpl",
            Resource::new("template")
                .with("path", "/etc/app.conf")
                .with("source", "salt://app.conf"),
        ),
        ("bad-tpl", Resource::new("template").with("path", "/etc/other.conf")),
    ] {
        let processor = registry.dispatch(&resource.resource_type).unwrap();
        let _ = processor.process(
            &mut action,
            name,
            &resource,
            &mut Context::default(),
            temp.path(),
            &writer,
        );
        assert_eq!(action.data, before, "payload changed by {name}");
    }
}

#[test]
fn test_watch_does_not_reorder() {
    let temp = TempDir::new().unwrap();
    let manifest = Manifest::from_value(&json!({
        "nginx": {"type": "service", "watch": {"packages": ["nginx-pkg"]}},
        "nginx-pkg": {"type": "package"}
    }))
    .unwrap();

    let mut context = Context::default();
    pipeline()
        .compile(&manifest, &mut Action::default(), &mut context, temp.path())
        .unwrap();

    let order: Vec<&str> = context.compiled().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(order, vec!["nginx", "nginx-pkg"]);
}

#[test]
fn test_template_write_failure_restores_action() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("app.sls")).unwrap();

    let registry = ProcessorRegistry::builtin();
    let writer = CompilerConfig::default().writer();
    let resource = Resource::new("template")
        .with("path", "/etc/app.conf")
        .with("source", "salt://app.conf");
    let mut action = Action::new("configuration/generate").with_param("tag", "v2");
    let before = action.clone();

    let err = registry
        .dispatch("template")
        .unwrap()
        .process(
            &mut action,
            "app",
            &resource,
            &mut Context::default(),
            temp.path(),
            &writer,
        )
        .unwrap_err();

    assert!(matches!(err, CompileError::Write { .. }));
    assert_eq!(action, before);
}

#[test]
fn test_nul_in_name_is_invalid_argument() {
    let temp = TempDir::new().unwrap();
    let mut manifest = Manifest::new();
    manifest.insert("a\0b", Resource::new("service")).unwrap();

    let err = pipeline()
        .compile(&manifest, &mut Action::default(), &mut Context::default(), temp.path())
        .unwrap_err();

    assert_eq!(err.as_http().unwrap().code(), 40001);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}
