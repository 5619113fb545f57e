use std::path::Path;
use std::sync::Arc;

use adi_bucket::{BucketStore, MemoryBucketStore};
use adi_core::config::{
    CredentialRefs, DatabaseTarget, DatePolicy, ImportOptions, ImportRequest, SourceLocation,
};
use adi_core::error::{ImportError, RecordError};
use adi_core::importer::Importer;
use adi_core::secrets::{SecretError, StaticSecretStore};
use adi_repository::{AssessmentId, MemoryRepository, RepositoryError};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

const BUCKET: &str = "assessment-exports";
const KEY: &str = "assessment_data.json";

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn secrets() -> StaticSecretStore {
    StaticSecretStore::new()
        .with("/adi/db_name", "assessments")
        .with("/adi/db_user", "importer")
        .with("/adi/db_password", "s3cret")
}

fn request() -> ImportRequest {
    ImportRequest {
        source: SourceLocation {
            bucket: BUCKET.into(),
            key: KEY.into(),
        },
        database: DatabaseTarget {
            host: "db.example.test".into(),
            port: 27017,
            secrets: CredentialRefs {
                db_name: "/adi/db_name".into(),
                username: "/adi/db_user".into(),
                password: "/adi/db_password".into(),
            },
        },
    }
}

struct Harness {
    bucket: MemoryBucketStore,
    repository: MemoryRepository,
    staging: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            bucket: MemoryBucketStore::new(),
            repository: MemoryRepository::new(),
            staging: tempfile::tempdir().expect("staging dir"),
        }
    }

    async fn seed(&self, contents: impl Into<Bytes>) {
        self.bucket
            .put_object(BUCKET, KEY, contents.into(), "application/json")
            .await
            .expect("seed source");
    }

    async fn seed_json(&self, value: Value) {
        self.seed(serde_json::to_vec(&value).unwrap()).await;
    }

    fn importer(&self, date_policy: DatePolicy) -> Importer {
        self.importer_with_secrets(date_policy, secrets())
    }

    fn importer_with_secrets(&self, date_policy: DatePolicy, secrets: StaticSecretStore) -> Importer {
        Importer::new(
            Arc::new(self.bucket.clone()),
            Arc::new(secrets),
            Arc::new(self.repository.clone()),
            ImportOptions {
                staging_dir: Some(self.staging.path().to_path_buf()),
                date_policy,
            },
        )
    }

    fn source_exists(&self) -> bool {
        self.bucket.contains(BUCKET, KEY)
    }

    fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

fn record(id: &str) -> Value {
    json!({
        "id": id,
        "Asmt Name": format!("{id} - Example"),
        "Assessment Type": "Risk and Vulnerability Assessment",
        "created": "Mon, 02 Jan 2006 15:04:05 -0700",
        "Stakeholder Name": "Example Utility",
        "status": "Open"
    })
}

#[tokio::test]
async fn imports_complete_records_and_deletes_the_source() {
    let h = Harness::new();
    h.seed(fixture("assessments.json")).await;

    let report = h.importer(DatePolicy::default()).run(&request()).await.expect("import");

    assert!(report.succeeded());
    assert_eq!(report.total, 2);
    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].id.as_deref(), Some("RVA-1002"));
    assert!(report.skipped[0].reason.contains("'created'"));

    assert_eq!(h.repository.ids(), vec!["RVA-1001".to_string()]);
    let stored = h.repository.get("RVA-1001").unwrap();
    assert_eq!(
        stored.created,
        Some(Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap())
    );
    assert_eq!(
        stored.roe_signed_date,
        Some(Utc.with_ymd_and_hms(2020, 3, 4, 17, 30, 0).unwrap())
    );
    assert_eq!(stored.operators, vec![json!("Casey Jones"), json!("Riley Brown")]);
    assert_eq!(stored.fed_count, Some(json!(2)));
    assert_eq!(stored.assessment_summary, None);
    assert_eq!(stored.ci_type, None);

    assert!(!h.source_exists());
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn credentials_are_resolved_before_connecting() {
    let h = Harness::new();
    h.seed_json(json!([record("RVA-1")])).await;

    h.importer(DatePolicy::default()).run(&request()).await.expect("import");

    let connections = h.repository.connections();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].host, "db.example.test");
    assert_eq!(connections[0].database, "assessments");
    assert_eq!(connections[0].username, "importer");
    assert_eq!(connections[0].password, "s3cret");
}

#[tokio::test]
async fn importing_the_same_document_twice_is_idempotent() {
    let h = Harness::new();
    let importer = h.importer(DatePolicy::default());

    h.seed(fixture("assessments.json")).await;
    importer.run(&request()).await.expect("first import");
    let first = h.repository.get("RVA-1001").unwrap();

    h.seed(fixture("assessments.json")).await;
    importer.run(&request()).await.expect("second import");

    assert_eq!(h.repository.len(), 1);
    assert_eq!(h.repository.upsert_count(), 2);
    assert_eq!(h.repository.get("RVA-1001").unwrap(), first);
}

#[tokio::test]
async fn reimport_replaces_instead_of_merging() {
    let h = Harness::new();
    let importer = h.importer(DatePolicy::default());

    let mut with_lead = record("RVA-1");
    with_lead["Fed Lead"] = json!("Jordan Smith");
    h.seed_json(json!([with_lead])).await;
    importer.run(&request()).await.expect("first import");
    assert_eq!(h.repository.get("RVA-1").unwrap().fed_lead, Some(json!("Jordan Smith")));

    h.seed_json(json!([record("RVA-1")])).await;
    importer.run(&request()).await.expect("second import");

    assert_eq!(h.repository.get("RVA-1").unwrap().fed_lead, None);
}

#[tokio::test]
async fn empty_created_and_numeric_ids_are_imported() {
    let h = Harness::new();
    let mut undated = record("RVA-7");
    undated["created"] = json!("");
    let mut numbered = record("ignored");
    numbered["id"] = json!(123);

    h.seed_json(json!([undated, numbered])).await;

    let report = h.importer(DatePolicy::default()).run(&request()).await.expect("import");

    assert_eq!(report.imported, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(h.repository.get("RVA-7").unwrap().created, None);
    assert!(h.repository.get(AssessmentId::Integer(123)).is_some());
    assert!(h.repository.get("123").is_none());
}

#[tokio::test]
async fn invalid_records_are_skipped_and_counted() {
    let h = Harness::new();
    let mut no_id = record("ignored");
    no_id.as_object_mut().unwrap().remove("id");
    let mut no_stakeholder = record("RVA-3");
    no_stakeholder.as_object_mut().unwrap().remove("Stakeholder Name");

    h.seed_json(json!([record("RVA-1"), no_id, "not an object", no_stakeholder, record("RVA-5")]))
        .await;

    let report = h.importer(DatePolicy::default()).run(&request()).await.expect("import");

    assert_eq!(report.total, 5);
    assert_eq!(report.imported, report.total - report.skipped.len());
    assert_eq!(report.imported, 2);
    assert_eq!(h.repository.ids(), vec!["RVA-1".to_string(), "RVA-5".to_string()]);

    let reasons: Vec<&str> = report.skipped.iter().map(|s| s.reason.as_str()).collect();
    assert_eq!(
        reasons,
        vec![
            "Assessment at index 1 missing 'id'",
            "Assessment at index 2 is a string, not an object",
            "'RVA-3' is missing the following required field(s): 'Stakeholder Name'",
        ]
    );
    assert!(!h.source_exists());
}

#[tokio::test]
async fn malformed_dates_skip_the_record_by_default() {
    let h = Harness::new();
    let mut bad = record("RVA-2");
    bad["Testing Begin Date"] = json!("16/03/2020");
    h.seed_json(json!([record("RVA-1"), bad, record("RVA-3")])).await;

    let report = h.importer(DatePolicy::SkipRecord).run(&request()).await.expect("import");

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id.as_deref(), Some("RVA-2"));
    assert!(report.skipped[0].reason.contains("'Testing Begin Date'"));
    assert_eq!(h.repository.ids(), vec!["RVA-1".to_string(), "RVA-3".to_string()]);
    assert!(!h.source_exists());
}

#[tokio::test]
async fn malformed_dates_abort_the_run_when_requested() {
    let h = Harness::new();
    let mut bad = record("RVA-2");
    bad["updated"] = json!(20200316);
    h.seed_json(json!([record("RVA-1"), bad, record("RVA-3")])).await;

    let err = h
        .importer(DatePolicy::AbortRun)
        .run(&request())
        .await
        .unwrap_err();

    match err {
        ImportError::MalformedDate(RecordError::MalformedDate { id, field, .. }) => {
            assert_eq!(id, "RVA-2");
            assert_eq!(field, "updated");
        }
        other => panic!("unexpected error {other:?}"),
    }
    // Records before the bad one were already written; the source stays put.
    assert_eq!(h.repository.ids(), vec!["RVA-1".to_string()]);
    assert!(h.source_exists());
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn staged_copy_is_removed_when_an_upsert_fails() {
    let h = Harness::new();
    h.repository.reject_upserts_for("RVA-2");
    h.seed_json(json!([record("RVA-1"), record("RVA-2"), record("RVA-3")])).await;

    let err = h
        .importer(DatePolicy::default())
        .run(&request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Repository(RepositoryError::Rejected(ref id)) if id == "RVA-2"
    ));
    assert_eq!(h.staged_files(), 0);
    assert!(h.source_exists());
    assert_eq!(h.repository.ids(), vec!["RVA-1".to_string()]);
}

#[tokio::test]
async fn non_array_documents_are_fatal() {
    let h = Harness::new();
    h.seed_json(record("RVA-1")).await;

    let err = h
        .importer(DatePolicy::default())
        .run(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::NotAnArray { found: "an object" }));
    assert!(h.repository.connections().is_empty());
    assert!(h.source_exists());
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn invalid_json_is_fatal() {
    let h = Harness::new();
    h.seed(Bytes::from_static(b"[{\"id\": ")).await;

    let err = h
        .importer(DatePolicy::default())
        .run(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Json(_)));
    assert!(h.source_exists());
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn missing_secret_fails_before_connecting() {
    let h = Harness::new();
    h.seed_json(json!([record("RVA-1")])).await;
    let partial = StaticSecretStore::new()
        .with("/adi/db_name", "assessments")
        .with("/adi/db_user", "importer");

    let err = h
        .importer_with_secrets(DatePolicy::default(), partial)
        .run(&request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Secrets(SecretError::NotFound(ref name)) if name == "/adi/db_password"
    ));
    assert!(h.repository.connections().is_empty());
    assert!(h.source_exists());
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn missing_source_object_is_fatal() {
    let h = Harness::new();

    let err = h
        .importer(DatePolicy::default())
        .run(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::Bucket(_)));
    assert_eq!(h.staged_files(), 0);
    assert!(h.repository.is_empty());
}

#[tokio::test]
async fn empty_array_still_deletes_the_source() {
    let h = Harness::new();
    h.seed_json(json!([])).await;

    let report = h.importer(DatePolicy::default()).run(&request()).await.expect("import");

    assert_eq!(report.total, 0);
    assert_eq!(report.imported, 0);
    assert!(!h.source_exists());
}
