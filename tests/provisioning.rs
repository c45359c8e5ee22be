mod support;

use catalog_indexer::client::{AdminClient, IndexAdmin};
use catalog_indexer::error::ClientError;
use catalog_indexer::provision::{CollectionState, ProvisionError, ProvisionStep, Provisioning};
use support::FakeBackend;

const SCHEMA: &str = r#"{"add-field":{"name":"contents","type":"text_ja","multiValued":true}}"#;

fn schema_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("schema.json");
    std::fs::write(&path, SCHEMA).unwrap();
    path
}

#[tokio::test]
async fn full_sequence_reaches_ready() {
    let backend = FakeBackend::start().await;
    let admin = backend.admin();
    let tmp = tempfile::tempdir().unwrap();
    let schema = schema_file(&tmp);

    let mut p = Provisioning::begin(&admin, "catalog").await.unwrap();
    p.run(&schema).await.unwrap();

    assert_eq!(p.state(), CollectionState::Ready);
    assert!(backend.home().join("catalog/conf/solrconfig.xml").is_file());
    assert!(backend.core("catalog").is_some());
    assert_eq!(backend.schema_of("catalog").as_deref(), Some(SCHEMA));

    let actions: Vec<String> = backend
        .requests_to("/admin/cores")
        .into_iter()
        .filter_map(|r| r.query)
        .collect();
    assert!(actions[0].contains("action=STATUS"));
    assert!(actions[1].contains("name=catalog") && actions[1].contains("action=CREATE"));
    assert!(actions[2].contains("core=catalog") && actions[2].contains("action=RELOAD"));
}

#[tokio::test]
async fn system_info_reports_version_and_home() {
    let backend = FakeBackend::start().await;
    let info = backend.admin().ping().await.unwrap();
    assert_eq!(info.spec_version, "9.4.0");
    assert_eq!(info.home, backend.home().display().to_string());
}

#[tokio::test]
async fn raw_schema_update_before_create_fails_at_backend() {
    let backend = FakeBackend::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let schema = schema_file(&tmp);

    let err = backend
        .admin()
        .update_schema("catalog", &schema)
        .await
        .unwrap_err();
    match err {
        ClientError::Backend { status, details, .. } => {
            assert_eq!(status, 404);
            assert!(details[0].contains("Not Found"));
        }
        other => panic!("expected backend error, got {other}"),
    }
}

#[tokio::test]
async fn raw_create_without_configset_fails_at_backend() {
    let backend = FakeBackend::start().await;
    let err = backend.admin().create("catalog").await.unwrap_err();
    assert!(err.is_backend());
    assert!(backend.core("catalog").is_none());
}

#[tokio::test]
async fn begin_refuses_existing_collection() {
    let backend = FakeBackend::with_core("catalog").await;
    let admin = backend.admin();
    let err = Provisioning::begin(&admin, "catalog").await.err().unwrap();
    assert!(matches!(err, ProvisionError::AlreadyExists(ref n) if n == "catalog"));
}

#[tokio::test]
async fn failed_step_keeps_state_and_stops() {
    let backend = FakeBackend::start().await;
    let admin = backend.admin();
    let mut p = Provisioning::new(&admin, "catalog");
    p.copy_configset().await.unwrap();
    p.create().await.unwrap();

    let missing = backend.home().join("no-such-schema.json");
    let err = p.run(&missing).await.unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::Step {
            step: ProvisionStep::UpdateSchema,
            source: ClientError::Io { .. },
            ..
        }
    ));
    assert_eq!(p.state(), CollectionState::Created);
    // no reload after the failed step
    assert!(backend
        .requests_to("/admin/cores")
        .iter()
        .all(|r| !r.query.as_deref().unwrap_or("").contains("RELOAD")));
}

#[tokio::test]
async fn status_and_unload() {
    let backend = FakeBackend::with_core("catalog").await;
    let admin = backend.admin();

    let found = admin.find_by_name("catalog").await.unwrap().unwrap();
    assert_eq!(found.name, "catalog");
    assert!(found.index.is_some());
    assert!(admin.find_by_name("other").await.unwrap().is_none());

    admin.force_unload("catalog").await.unwrap();
    assert!(backend.core("catalog").is_none());
    let req = backend.requests_to("/admin/cores").pop().unwrap();
    let q = req.query.unwrap();
    assert!(q.contains("deleteIndex=true"));
    assert!(q.contains("deleteInstanceDir=true"));
}

#[tokio::test]
async fn unknown_verb_never_reaches_backend() {
    let backend = FakeBackend::start().await;
    let admin = AdminClient::new(&backend.uri, std::time::Duration::from_secs(5)).unwrap();
    let err = admin.action("MERGEINDEXES", &[]).await.unwrap_err();
    assert!(matches!(err, ClientError::UnsupportedAction(_)));
    assert!(backend.requests().is_empty());
}
