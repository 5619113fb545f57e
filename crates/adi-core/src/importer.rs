//! The fetch → parse → upsert → delete pipeline for one assessment export.

use std::io::Read;
use std::sync::Arc;

use adi_bucket::BucketStore;
use adi_repository::{Assessment, RepositoryConnector};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{DatePolicy, ImportOptions, ImportRequest};
use crate::error::{ImportError, RecordError, Result};
use crate::record::{json_kind, map_record, RawRecord};
use crate::secrets::{resolve_credentials, SecretStore};
use crate::staging::StagedDocument;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Outcome of a completed run. Skipped records do not make a run fail.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub total: usize,
    pub imported: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl ImportReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            imported: 0,
            skipped: Vec::new(),
        }
    }

    /// Always true: a report only exists once the source has been deleted.
    pub fn succeeded(&self) -> bool {
        true
    }
}

/// Reads the staged document and requires a top-level array.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<Value>> {
    match serde_json::from_reader(reader)? {
        Value::Array(items) => Ok(items),
        other => Err(ImportError::NotAnArray {
            found: json_kind(&other),
        }),
    }
}

/// Validates and maps one array element.
pub fn prepare_record(index: usize, value: Value) -> std::result::Result<Assessment, RecordError> {
    let raw = RawRecord::from_value(index, value)?;
    map_record(&raw)
}

pub struct Importer {
    bucket: Arc<dyn BucketStore>,
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn RepositoryConnector>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(
        bucket: Arc<dyn BucketStore>,
        secrets: Arc<dyn SecretStore>,
        connector: Arc<dyn RepositoryConnector>,
        options: ImportOptions,
    ) -> Self {
        Self {
            bucket,
            secrets,
            connector,
            options,
        }
    }

    pub async fn run(&self, request: &ImportRequest) -> Result<ImportReport> {
        let source = &request.source;

        let contents = self.bucket.get_object(&source.bucket, &source.key).await?;
        info!(
            bucket = %source.bucket,
            key = %source.key,
            bytes = contents.len(),
            "Retrieved {} from S3 bucket {}",
            source.key,
            source.bucket
        );

        // Dropping the guard removes the local copy on every path out of here.
        let staged = StagedDocument::write(
            &source.key,
            &contents,
            self.options.staging_dir.as_deref(),
        )?;
        drop(contents);

        let records = parse_records(staged.open()?)?;
        info!(count = records.len(), "JSON data loaded from {}", source.key);

        let credentials =
            resolve_credentials(self.secrets.as_ref(), &request.database.secrets).await?;
        let settings = request.database.connection_settings(credentials);
        let repository = self.connector.connect(&settings).await?;
        info!("DB connection set up to {}", settings.display_target());

        let mut report = ImportReport::new(records.len());

        for (index, value) in records.into_iter().enumerate() {
            let assessment = match prepare_record(index, value) {
                Ok(assessment) => assessment,
                Err(err) => {
                    if err.is_malformed_date() && self.options.date_policy == DatePolicy::AbortRun {
                        return Err(ImportError::MalformedDate(err));
                    }
                    warn!(index, id = err.id(), "{err}! Skipping...");
                    report.skipped.push(SkippedRecord {
                        index,
                        id: err.id().map(str::to_string),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            repository.upsert(&assessment).await?;
            debug!(index, id = %assessment.id, "assessment upserted");
            report.imported += 1;
        }

        info!(
            imported = report.imported,
            skipped = report.skipped.len(),
            "{} assessment documents successfully inserted/updated in database",
            report.imported
        );

        self.bucket
            .delete_object(&source.bucket, &source.key)
            .await?;
        info!("Deleted {} from S3 bucket {}", source.key, source.bucket);

        drop(staged);
        Ok(report)
    }
}
