use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tide_core::{
    ErrorKind, InMemoryControlPlane, InventoryItem, Labels, MonitorSettings, ReplicaCounts,
    ReservedLabel, ServiceSnapshot, Settings, StackSpec, UpdateStatus, VariableEnvironment,
    VariableKind,
};
use tide_deploy::{DeployStatus, Deployer};
use tide_rollout::MonitorOutcome;
use tide_vars::content_hash;

fn settings(dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::new("demo", "v2");
    settings.work_dir = dir.path().to_path_buf();
    settings.monitor = MonitorSettings {
        enabled: true,
        timeout: Duration::from_secs(3),
        interval: Duration::from_secs(1),
        log_tail: 20,
    };
    settings
}

fn spec() -> StackSpec {
    serde_json::from_value(json!({
        "services": {"web": {"image": "nginx:${TAG:-latest}", "secrets": ["db_user"]}},
        "secrets": {"db_user": {"content": "root"}}
    }))
    .unwrap()
}

fn item(id: &str, hash: &str) -> InventoryItem {
    let mut labels = Labels::new();
    labels.insert(ReservedLabel::Stack.key().into(), "demo".into());
    labels.insert(ReservedLabel::Name.key().into(), "db_user".into());
    labels.insert(ReservedLabel::Hash.key().into(), hash.into());
    labels.insert(ReservedLabel::Version.key().into(), "v1".into());
    InventoryItem {
        id: id.into(),
        name: format!("demo-db_user-{}", &hash[..7]),
        created_at: Utc::now(),
        labels,
    }
}

fn web(state: &str) -> ServiceSnapshot {
    ServiceSnapshot {
        id: "web".into(),
        name: "demo_web".into(),
        replicas: Some(ReplicaCounts { running: 1, desired: 1 }),
        update_status: Some(UpdateStatus {
            state: state.into(),
            message: None,
        }),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn entries(dir: &tempfile::TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test(start_paused = true)]
async fn full_rollout_prunes_only_stale_versions() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    let env = VariableEnvironment::new();

    let cp = InMemoryControlPlane::new();
    cp.add_item(VariableKind::Secret, item("current", &content_hash(b"root")));
    cp.add_item(VariableKind::Secret, item("stale", &content_hash(b"toor")));
    cp.push_poll(vec![web("updating")]);
    cp.push_poll(vec![web("completed")]);

    let mut deployer = Deployer::new(&cp, &settings, &env);
    deployer.deploy(&spec()).await.unwrap();

    let deployed = cp.deployed();
    assert_eq!(deployed.len(), 1);
    let secret = &deployed[0].spec.secrets["db_user"];
    assert_eq!(secret.name.as_deref(), Some("demo-db_user-4813494"));
    assert_eq!(deployed[0].spec.services.as_ref().unwrap()["web"]["image"], "nginx:latest");

    assert_eq!(cp.removed(), vec![(VariableKind::Secret, "stale".to_string())]);
    // Generated files are gone once the control plane has the spec.
    assert_eq!(entries(&dir), 0);

    let summary = deployer.summary();
    assert_eq!(summary.status, DeployStatus::Succeeded);
    assert_eq!(summary.removed_count(), 1);
    assert_eq!(summary.monitor.as_ref().unwrap().outcome, MonitorOutcome::Converged);

    let json = summary.to_json().unwrap();
    assert!(json.contains("demo-db_user-4813494"), "{json}");
    assert!(json.contains("\"superseded\""), "{json}");

    assert_eq!(
        cp.calls(),
        vec![
            "deploy_stack",
            "list_secrets",
            "remove_secret",
            "list_configs",
            "list_services",
            "list_services",
        ]
    );
}

#[tokio::test]
async fn configuration_errors_abort_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    let env = VariableEnvironment::new();
    let cp = InMemoryControlPlane::new();

    let mut spec = spec();
    spec.services = None;

    let mut deployer = Deployer::new(&cp, &settings, &env);
    let err = deployer.deploy(&spec).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(cp.calls().is_empty());
    assert_eq!(deployer.summary().status, DeployStatus::Failed);
}

#[tokio::test]
async fn failed_deploy_skips_prune_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    let env = VariableEnvironment::new();
    let cp = InMemoryControlPlane::new();
    cp.add_item(VariableKind::Secret, item("stale", &content_hash(b"toor")));
    cp.fail("deploy_stack", "service web: image not found");

    let mut deployer = Deployer::new(&cp, &settings, &env);
    let err = deployer.deploy(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ControlPlane);
    assert!(err.to_string().contains("deploy_stack"), "{err}");
    assert!(cp.removed().is_empty());
    assert_eq!(entries(&dir), 0);
    assert!(deployer.summary().error.as_deref().unwrap().contains("image not found"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_rollout_reports_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(&dir);
    let env = VariableEnvironment::new();
    let cp = InMemoryControlPlane::new();
    cp.push_poll(vec![web("updating")]);

    let mut deployer = Deployer::new(&cp, &settings, &env);
    let err = deployer.deploy(&spec()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Convergence);
    assert!(err.to_string().contains("Deployment timed out"), "{err}");
    assert_eq!(cp.polls_served(), 3);

    let report = deployer.summary().monitor.clone().unwrap();
    assert_eq!(
        report.outcome,
        MonitorOutcome::TimedOut {
            pending: vec!["demo_web".to_string()]
        }
    );
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].service, "demo_web");
}

#[tokio::test]
async fn disabled_monitor_skips_polling() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(&dir);
    settings.monitor.enabled = false;
    let env = VariableEnvironment::new();
    let cp = InMemoryControlPlane::new();

    let summary = tide_deploy::deploy(&cp, &settings, &env, &spec()).await.unwrap();
    assert_eq!(summary.status, DeployStatus::Succeeded);
    assert_eq!(cp.polls_served(), 0);
}
