mod common;

use std::env;
use std::path::PathBuf;

use kubesel::kubeconfig::find_context;
use kubesel::session::{Kubesel, OwnerIdentity, MANAGED_CONTEXT_NAME};
use tempfile::TempDir;

use common::{write_file, FakeProbe};

const SHARED_KUBECONFIG: &str = "
apiVersion: v1
kind: Config
current-context: prod-admin
clusters:
- name: prod
  cluster:
    server: https://prod.example.com
- name: staging
  cluster:
    server: https://staging.example.com
users:
- name: admin
  user:
    token: secret
contexts:
- name: prod-admin
  context:
    cluster: prod
    user: admin
    namespace: default
";

#[tokio::test]
async fn switch_cluster_in_a_new_overlay() {
    let dir = TempDir::new().unwrap();
    let shared = write_file(dir.path(), "config", SHARED_KUBECONFIG);
    let data_dir = dir.path().join("data").join("kubesel");

    let kubesel = Kubesel::load(
        vec![shared.clone()],
        &data_dir,
        Box::new(FakeProbe::new(99, &[1234])),
    )
    .await;

    let owner = OwnerIdentity::for_process(1234, kubesel.probe()).unwrap();
    assert_eq!(owner, OwnerIdentity::new(1234, 99));

    let mut overlay = kubesel.create_overlay(owner).unwrap();
    assert_eq!(kubesel.list_cluster_names(), ["prod", "staging"]);
    assert_eq!(kubesel.list_context_names(), ["prod-admin"]);

    overlay.set_cluster_name("staging");
    overlay.save().unwrap();

    let value = kubesel.kubeconfig_env_value(&overlay).unwrap();
    let search_path: Vec<PathBuf> = env::split_paths(&value).collect();
    assert_eq!(search_path, vec![overlay.path().to_path_buf(), shared.clone()]);

    let reloaded = Kubesel::load(search_path, &data_dir, Box::new(FakeProbe::new(99, &[1234]))).await;
    let found = reloaded.find_overlay().unwrap();
    assert_eq!(found.path(), overlay.path());
    assert_eq!(found.owner(), owner);
    assert_eq!(found.cluster_name(), "staging");

    let merged = reloaded.merged();
    assert_eq!(merged.current_context.as_deref(), Some(MANAGED_CONTEXT_NAME));
    let active = find_context(MANAGED_CONTEXT_NAME, merged).unwrap();
    assert_eq!(active.cluster.as_deref(), Some("staging"));
    assert_eq!(reloaded.list_context_names(), ["prod-admin"]);
}

#[tokio::test]
async fn init_starts_from_the_current_context() {
    let dir = TempDir::new().unwrap();
    let shared = write_file(dir.path(), "config", SHARED_KUBECONFIG);
    let data_dir = dir.path().join("kubesel");

    let kubesel = Kubesel::load(vec![shared], &data_dir, Box::new(FakeProbe::new(7, &[42]))).await;
    let overlay = kubesel.init_overlay(42).unwrap();

    assert_eq!(overlay.cluster_name(), "prod");
    assert_eq!(overlay.auth_info_name(), "admin");
    assert_eq!(overlay.namespace(), "default");
    assert!(overlay.path().starts_with(kubesel.sessions_dir()));
}

#[tokio::test]
async fn corrupt_overlay_is_reported() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("kubesel");
    let sessions_dir = data_dir.join("sessions");
    std::fs::create_dir_all(&sessions_dir).unwrap();
    let broken = write_file(&sessions_dir, "kubesel-7-2a-kubeconfig.yaml", "current-context: prod\n");

    let kubesel = Kubesel::load(vec![broken], &data_dir, Box::new(FakeProbe::new(7, &[42]))).await;
    let err = kubesel.find_overlay().unwrap_err();
    assert!(err.is_corrupt());
}
