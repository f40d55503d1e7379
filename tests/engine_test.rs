mod common;

use common::{Harness, SINGLE_YAML, WEB_YAML};
use stackhub::docker::{ContainerState, ExecRequest};
use stackhub::{Error, ErrorKind, StatusKind};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_create_then_get_returns_definition_and_status() {
    let h = Harness::new().await;
    let record = h
        .engine
        .create_from_definition("web", WEB_YAML)
        .await
        .unwrap();

    assert_eq!(record.name, "web");
    assert!(!record.enabled, "new services start disabled");
    assert_eq!(record.path, h.root.join("web"));
    assert!(h.root.join("web/docker-compose.yml").is_file());

    let view = h.engine.get("web").await.unwrap();
    assert_eq!(view.yaml_content.as_deref(), Some(WEB_YAML));
    // Two declared services, no containers yet.
    assert_eq!(view.real_status.status, StatusKind::Stopped);
    assert_eq!(view.real_status.running_count, 0);
    assert_eq!(view.real_status.total_count, 2);
}

#[tokio::test]
async fn test_create_honours_enable_new_services() {
    let h = Harness::with_options(true).await;
    let record = h
        .engine
        .create_from_definition("web", SINGLE_YAML)
        .await
        .unwrap();
    assert!(record.enabled);
}

#[tokio::test]
async fn test_create_duplicate_name_conflicts() {
    let h = Harness::new().await;
    h.create("web").await;

    let err = h
        .engine
        .create_from_definition("web", SINGLE_YAML)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NameConflict(_)));
    assert_eq!(err.http_status(), 409);

    // The existing definition is untouched.
    let text = fs::read_to_string(h.root.join("web/docker-compose.yml")).unwrap();
    assert_eq!(text, WEB_YAML);
}

#[tokio::test]
async fn test_create_invalid_definition_leaves_nothing_behind() {
    let h = Harness::new().await;

    for bad in ["", "services: {}", "services:\n  app:\n    ports: [80]\n", "- a\n- b\n"] {
        let err = h
            .engine
            .create_from_definition("web", bad)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDefinition(_)), "{:?}: {}", bad, err);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    assert!(!h.root.join("web").exists());
    assert!(h.engine.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_bad_names() {
    let h = Harness::new().await;
    for name in ["", "../escape", "web app", "-web", ".hidden", "Web", "API-v2"] {
        let err = h
            .engine
            .create_from_definition(name, SINGLE_YAML)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }), "{:?}", name);
    }
}

#[tokio::test]
async fn test_create_accepts_numeric_compose_version() {
    let h = Harness::new().await;
    let yaml = "version: 3.8\nservices:\n  app:\n    image: nginx\n";

    let record = h.engine.create_from_definition("legacy", yaml).await.unwrap();
    assert_eq!(record.name, "legacy");

    let view = h.engine.get("legacy").await.unwrap();
    assert_eq!(view.real_status.status, StatusKind::Stopped);
    assert_eq!(view.real_status.total_count, 1);
    assert!(h.engine.validate_data().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_create_over_unregistered_folder_conflicts() {
    let h = Harness::new().await;
    h.write_orphan("legacy", SINGLE_YAML);

    let err = h
        .engine
        .create_from_definition("legacy", WEB_YAML)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FolderConflict { .. }));

    let text = fs::read_to_string(h.root.join("legacy/docker-compose.yml")).unwrap();
    assert_eq!(text, SINGLE_YAML, "existing folder must not be overwritten");
    assert!(h.engine.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lifecycle_changes_observed_status() {
    let h = Harness::new().await;
    h.create("web").await;

    h.engine.start("web").await.unwrap();
    let status = h.engine.status("web").await.unwrap();
    assert_eq!(status.status, StatusKind::Running);
    assert_eq!(status.running_count, 2);
    assert_eq!(status.total_count, 2);

    h.engine.stop("web").await.unwrap();
    assert_eq!(
        h.engine.status("web").await.unwrap().status,
        StatusKind::Stopped
    );

    h.engine.restart("web").await.unwrap();
    assert_eq!(
        h.engine.status("web").await.unwrap().status,
        StatusKind::Running
    );

    assert_eq!(
        h.runtime.mutating_calls(),
        vec!["up web", "stop web", "restart web"]
    );
}

#[tokio::test]
async fn test_partial_containers_reported() {
    let h = Harness::new().await;
    h.create("web").await;
    h.runtime.set_containers(
        "web",
        &[("app", ContainerState::Running), ("cache", ContainerState::Exited)],
    );

    let status = h.engine.status("web").await.unwrap();
    assert_eq!(status.status, StatusKind::PartiallyRunning);
    assert_eq!((status.running_count, status.total_count), (1, 2));
}

#[tokio::test]
async fn test_lifecycle_errors_map_to_kinds() {
    let h = Harness::new().await;

    let err = h.engine.start("ghost").await.unwrap_err();
    assert_eq!(err.http_status(), 404);

    h.create("web").await;
    h.runtime.reject("web", "up");
    let err = h.engine.start("web").await.unwrap_err();
    assert!(matches!(err, Error::RuntimeRejected { .. }));
    assert_eq!(err.http_status(), 409);

    h.runtime.set_unreachable(true);
    let err = h.engine.stop("web").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuntimeUnavailable);
    assert_eq!(err.http_status(), 503);
}

#[tokio::test]
async fn test_start_with_missing_directory_is_unmanageable() {
    let h = Harness::new().await;
    h.create("web").await;
    fs::remove_dir_all(h.root.join("web")).unwrap();

    let err = h.engine.start("web").await.unwrap_err();
    assert!(matches!(err, Error::Unmanageable { .. }));
    assert!(h.runtime.mutating_calls().is_empty());
}

#[tokio::test]
async fn test_enable_disable_do_not_touch_runtime() {
    let h = Harness::new().await;
    h.create("web").await;

    let record = h.engine.set_enabled("web", true).await.unwrap();
    assert!(record.enabled);
    assert!(record.updated_at >= record.created_at);
    let record = h.engine.set_enabled("web", false).await.unwrap();
    assert!(!record.enabled);

    assert!(h.runtime.mutating_calls().is_empty());

    let err = h.engine.set_enabled("ghost", true).await.unwrap_err();
    assert!(matches!(err, Error::ServiceNotFound(_)));
}

#[tokio::test]
async fn test_delete_running_requires_force() {
    let h = Harness::new().await;
    h.create("web").await;
    h.engine.start("web").await.unwrap();

    let err = h.engine.delete("web", false).await.unwrap_err();
    match err {
        Error::ServiceRunning { running, total, .. } => assert_eq!((running, total), (2, 2)),
        other => panic!("expected ServiceRunning, got {:?}", other),
    }
    // Nothing was removed.
    assert!(h.root.join("web").is_dir());
    assert!(h.engine.get("web").await.is_ok());

    h.engine.delete("web", true).await.unwrap();
    assert!(!h.root.join("web").exists());
    assert!(matches!(
        h.engine.get("web").await.unwrap_err(),
        Error::ServiceNotFound(_)
    ));
    assert!(h.runtime.mutating_calls().contains(&"down web".to_string()));
}

#[tokio::test]
async fn test_delete_stopped_service() {
    let h = Harness::new().await;
    h.create("web").await;

    h.engine.delete("web", false).await.unwrap();
    assert!(!h.root.join("web").exists());
    assert!(h.engine.list().await.unwrap().is_empty());
    assert!(
        !h.runtime.mutating_calls().contains(&"down web".to_string()),
        "non-forced delete never tears down"
    );
}

#[tokio::test]
async fn test_delete_with_unreachable_runtime() {
    let h = Harness::new().await;
    h.create("web").await;
    h.runtime.set_unreachable(true);

    let err = h.engine.delete("web", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RuntimeUnavailable);
    assert!(h.root.join("web").is_dir());

    // Forced delete proceeds even though teardown fails.
    h.engine.delete("web", true).await.unwrap();
    assert!(!h.root.join("web").exists());
}

#[tokio::test]
async fn test_delete_record_whose_directory_is_gone() {
    let h = Harness::new().await;
    h.create("web").await;
    fs::remove_dir_all(h.root.join("web")).unwrap();

    h.engine.delete("web", false).await.unwrap();
    assert!(h.engine.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconcile_reports_not_found_error_and_unknown() {
    let h = Harness::new().await;
    h.create("gone").await;
    h.create("broken").await;
    h.create("slow").await;
    h.create("fine").await;

    fs::remove_dir_all(h.root.join("gone")).unwrap();
    fs::write(h.root.join("broken/docker-compose.yml"), "services: [unclosed").unwrap();
    h.runtime.hang("slow");

    let views = h.engine.list().await.unwrap();
    let status_of = |name: &str| {
        views
            .iter()
            .find(|v| v.record.name == name)
            .map(|v| v.real_status.clone())
            .unwrap()
    };

    let gone = status_of("gone");
    assert_eq!(gone.status, StatusKind::NotFound);
    assert!(gone.error.is_some());

    let broken = status_of("broken");
    assert_eq!(broken.status, StatusKind::Error);
    assert!(broken.error.is_some());

    assert_eq!(status_of("slow").status, StatusKind::Unknown);
    assert_eq!(status_of("fine").status, StatusKind::Stopped);

    // Listing is ordered by name.
    let names: Vec<&str> = views.iter().map(|v| v.record.name.as_str()).collect();
    assert_eq!(names, vec!["broken", "fine", "gone", "slow"]);
}

#[tokio::test]
async fn test_unreachable_runtime_yields_error_status_not_failure() {
    let h = Harness::new().await;
    h.create("web").await;
    h.runtime.set_unreachable(true);

    let views = h.engine.list().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].real_status.status, StatusKind::Error);
    assert_eq!(views[0].real_status.running_count, 0);
}

#[tokio::test]
async fn test_logs_fall_back_to_placeholder() {
    let h = Harness::new().await;
    h.create("web").await;

    let logs = h.engine.logs("web", Some(2)).await.unwrap();
    assert!(logs.available);
    assert_eq!(logs.logs.lines().count(), 2);

    h.runtime.set_unreachable(true);
    let logs = h.engine.logs("web", None).await.unwrap();
    assert!(!logs.available);
    assert!(logs.logs.starts_with("Logs unavailable"));

    let err = h.engine.logs("ghost", None).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_exec_checks_declared_container() {
    let h = Harness::new().await;
    h.create("web").await;

    let output = h
        .engine
        .exec(
            "web",
            &ExecRequest {
                container: "app".into(),
                command: "echo hi".into(),
                user: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(output.exit_code, 0);
    assert_eq!(output.stdout, "app: echo hi\n");

    let err = h
        .engine
        .exec(
            "web",
            &ExecRequest {
                container: "db".into(),
                command: "ls".into(),
                user: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = h
        .engine
        .exec(
            "web",
            &ExecRequest {
                container: "app".into(),
                command: "   ".into(),
                user: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn test_health_reflects_runtime() {
    let h = Harness::new().await;
    h.create("web").await;

    let report = h.engine.health().await.unwrap();
    assert!(report.runtime_available);
    assert_eq!(report.services, 1);

    h.runtime.set_unreachable(true);
    let report = h.engine.health().await.unwrap();
    assert!(!report.runtime_available);
}

#[tokio::test]
async fn test_mutations_of_one_service_are_serialized() {
    let h = Harness::new().await;
    h.create("web").await;
    h.create("api").await;
    h.runtime.slow_up(Duration::from_millis(30));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move { engine.start("web").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(h.runtime.max_concurrent_ups(), 1);
}

#[tokio::test]
async fn test_different_services_start_concurrently() {
    let h = Harness::new().await;
    h.create("web").await;
    h.create("api").await;
    h.runtime.slow_up(Duration::from_millis(100));

    let (a, b) = tokio::join!(h.engine.start("web"), h.engine.start("api"));
    a.unwrap();
    b.unwrap();
    assert_eq!(h.runtime.max_concurrent_ups(), 2);
}

#[tokio::test]
async fn test_registry_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("stackhub.db");
    let root = tmp.path().join("services");

    {
        let store = stackhub::RecordStore::new(db.clone()).await.unwrap();
        store.initialize().await.unwrap();
        let engine = stackhub::Engine::builder()
            .store(store)
            .services_root(root.clone())
            .runtime(Arc::new(common::FakeRuntime::new()))
            .build()
            .unwrap();
        engine.create_from_definition("web", WEB_YAML).await.unwrap();
        engine.set_enabled("web", true).await.unwrap();
    }

    let store = stackhub::RecordStore::new(db).await.unwrap();
    store.initialize().await.unwrap();
    let record = store.get("web").await.unwrap().unwrap();
    assert!(record.enabled);
    assert_eq!(record.path, root.join("web"));
}
