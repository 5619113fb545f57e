//! Filtering of S3 event notifications before an event-driven import.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::SourceLocation;

pub const EXPECTED_EVENT: &str = "ObjectCreated:Put";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct S3Notification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Import,
    UnexpectedEvent(String),
    UnexpectedObject { bucket: String, key: String },
    NoRecords,
}

impl TriggerDecision {
    pub fn should_import(&self) -> bool {
        matches!(self, TriggerDecision::Import)
    }

    /// Short reason for an ignored event.
    pub fn reason(&self) -> Option<String> {
        match self {
            TriggerDecision::Import => None,
            TriggerDecision::UnexpectedEvent(name) => {
                Some(format!("unexpected eventName {name}"))
            }
            TriggerDecision::UnexpectedObject { bucket, key } => {
                Some(format!("unexpected object {bucket}/{key}"))
            }
            TriggerDecision::NoRecords => Some("notification carried no records".to_string()),
        }
    }
}

/// Only the first record of a notification is considered.
pub fn evaluate(notification: &S3Notification, expected: &SourceLocation) -> TriggerDecision {
    let Some(record) = notification.records.first() else {
        return TriggerDecision::NoRecords;
    };

    if record.event_name != EXPECTED_EVENT {
        return TriggerDecision::UnexpectedEvent(record.event_name.clone());
    }

    let bucket = &record.s3.bucket.name;
    let key = &record.s3.object.key;
    if *bucket != expected.bucket || *key != expected.key {
        return TriggerDecision::UnexpectedObject {
            bucket: bucket.clone(),
            key: key.clone(),
        };
    }

    TriggerDecision::Import
}

/// Logs why an event is being ignored, along with the full payload.
pub fn log_ignored(decision: &TriggerDecision, expected: &SourceLocation, event: &Value) {
    match decision {
        TriggerDecision::Import => return,
        TriggerDecision::UnexpectedEvent(name) => {
            warn!("Unexpected eventName received: {name}");
        }
        TriggerDecision::UnexpectedObject { bucket, key } => {
            warn!(
                "Expected ObjectCreated event from S3 bucket {} with key {}, but received event from S3 bucket {} with key {}",
                expected.bucket, expected.key, bucket, key
            );
        }
        TriggerDecision::NoRecords => {
            warn!("S3 event notification contained no records");
        }
    }
    warn!("Full AWS event: {event}");
}
