//! Mapping of raw exported assessment objects onto [`Assessment`] documents.

use adi_repository::{Assessment, AssessmentId};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::dates;
use crate::error::RecordError;

pub const ID_FIELD: &str = "id";

/// Fields every record must carry besides `id`, in the order they are reported.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "Asmt Name",
    "Assessment Type",
    "created",
    "Stakeholder Name",
    "status",
];

/// Source fields holding `%a, %d %b %Y %H:%M:%S %z` timestamps.
pub const DATE_FIELDS: [&str; 13] = [
    "Appendix A Date",
    "created",
    "Draft Complete Date",
    "External Testing Begin Date",
    "External Testing End Date",
    "resolved",
    "Internal Testing Begin Date",
    "Internal Testing End Date",
    "Report Final Date",
    "ROE Date",
    "Testing Begin Date",
    "Testing Complete Date",
    "updated",
];

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One element of the exported array, keyed by source field names.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    index: usize,
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(index: usize, fields: Map<String, Value>) -> Self {
        Self { index, fields }
    }

    pub fn from_value(index: usize, value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(fields) => Ok(Self::new(index, fields)),
            other => Err(RecordError::NotAnObject {
                index,
                found: json_kind(&other),
            }),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// The identifier used as the upsert key, keeping its JSON type. Numbers
    /// must be integers.
    pub fn id(&self) -> Result<AssessmentId, RecordError> {
        match self.fields.get(ID_FIELD) {
            None => Err(RecordError::MissingId { index: self.index }),
            Some(Value::String(id)) => Ok(AssessmentId::Text(id.clone())),
            Some(Value::Number(id)) => id.as_i64().map(AssessmentId::Integer).ok_or(
                RecordError::InvalidId {
                    index: self.index,
                    found: "a non-integer number",
                },
            ),
            Some(other) => Err(RecordError::InvalidId {
                index: self.index,
                found: json_kind(other),
            }),
        }
    }

    /// Required fields absent from the record. A field present with `null`
    /// counts as present.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !self.contains(field))
            .collect()
    }
}

struct Fields<'a> {
    raw: &'a RawRecord,
    id: &'a str,
}

impl Fields<'_> {
    fn required(&self, field: &str) -> Value {
        self.raw.get(field).cloned().unwrap_or(Value::Null)
    }

    fn value(&self, field: &str) -> Option<Value> {
        match self.raw.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.clone()),
        }
    }

    fn list(&self, field: &str) -> Vec<Value> {
        match self.raw.get(field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    }

    fn date(&self, field: &'static str) -> Result<Option<DateTime<Utc>>, RecordError> {
        dates::normalize(self.raw.get(field)).map_err(|source| RecordError::MalformedDate {
            id: self.id.to_string(),
            field,
            source,
        })
    }
}

/// Validates a raw record and maps it onto the canonical document.
///
/// Checks run in order: identifier, then required fields, then every date
/// field in [`DATE_FIELDS`] order. The first failure is returned.
pub fn map_record(raw: &RawRecord) -> Result<Assessment, RecordError> {
    let id = raw.id()?;
    let label = id.to_string();

    let missing = raw.missing_required_fields();
    if !missing.is_empty() {
        return Err(RecordError::MissingFields {
            id: label,
            fields: missing,
        });
    }

    let f = Fields { raw, id: &label };

    let appendix_a_signed_date = f.date("Appendix A Date")?;
    let created = f.date("created")?;
    let draft_completed = f.date("Draft Complete Date")?;
    let external_testing_begin = f.date("External Testing Begin Date")?;
    let external_testing_end = f.date("External Testing End Date")?;
    let assessment_completed = f.date("resolved")?;
    let internal_testing_begin = f.date("Internal Testing Begin Date")?;
    let internal_testing_end = f.date("Internal Testing End Date")?;
    let report_final_date = f.date("Report Final Date")?;
    let roe_signed_date = f.date("ROE Date")?;
    let testing_begin = f.date("Testing Begin Date")?;
    let testing_complete = f.date("Testing Complete Date")?;
    let last_change = f.date("updated")?;

    Ok(Assessment {
        assessment_name: f.required("Asmt Name"),
        assessment_status: f.required("status"),
        assessment_type: f.required("Assessment Type"),
        created,
        stakeholder_name: f.required("Stakeholder Name"),

        appendix_a_signed: f.value("Appendix A Signed"),
        appendix_a_signed_date,
        appendix_b_signed: f.value("Appendix B Signed"),
        assessment_completed,
        assessment_summary: f.value("summary"),
        ci_systems: f.value("CI Systems"),
        ci_type: f.value("CI Type"),
        contractor_count: f.value("Contractor Operator Count"),
        draft_completed,
        election: f.value("Election"),
        external_testing_begin,
        external_testing_end,
        fed_count: f.value("Fed Operator Count"),
        fed_lead: f.value("Fed Lead"),
        group_project: f.value("Group/Project"),
        internal_testing_begin,
        internal_testing_city: f.value("Internal Testing City"),
        internal_testing_end,
        last_change,
        management_request: f.value("Mgmt Req"),
        mandated_category: f.value("Mandated Category"),
        operators: f.list("Operators"),
        report_final_date,
        requested_services: f.list("Requested Services"),
        roe_number: f.value("ROE Number"),
        roe_signed: f.value("ROE Signed"),
        roe_signed_date,
        sector: f.value("Testing Sector"),
        stakeholder_state: f.value("State"),
        testing_begin,
        testing_complete,
        testing_phase: f.list("Testing Phase"),

        id,
    })
}
