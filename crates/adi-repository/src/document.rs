use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Assessment, AssessmentId, RepositoryError};

fn value(value: &Value) -> Result<Bson, RepositoryError> {
    Ok(bson::to_bson(value)?)
}

fn optional_value(value: &Option<Value>) -> Result<Bson, RepositoryError> {
    match value {
        Some(inner) => self::value(inner),
        None => Ok(Bson::Null),
    }
}

fn date(value: &DateTime<Utc>) -> Bson {
    Bson::DateTime(bson::DateTime::from_chrono(*value))
}

fn optional_date(value: &Option<DateTime<Utc>>) -> Bson {
    value.as_ref().map(date).unwrap_or(Bson::Null)
}

fn list(values: &[Value]) -> Result<Bson, RepositoryError> {
    let items = values.iter().map(value).collect::<Result<Vec<_>, _>>()?;
    Ok(Bson::Array(items))
}

/// Encodes an assessment as the full replacement document. Absent optional
/// fields are written as explicit nulls so a re-import clears stale values.
pub fn to_document(a: &Assessment) -> Result<Document, RepositoryError> {
    Ok(doc! {
        "_id": a.id.to_bson(),
        "assessment_name": value(&a.assessment_name)?,
        "assessment_status": value(&a.assessment_status)?,
        "assessment_type": value(&a.assessment_type)?,
        "created": optional_date(&a.created),
        "stakeholder_name": value(&a.stakeholder_name)?,
        "appendix_a_signed": optional_value(&a.appendix_a_signed)?,
        "appendix_a_signed_date": optional_date(&a.appendix_a_signed_date),
        "appendix_b_signed": optional_value(&a.appendix_b_signed)?,
        "assessment_completed": optional_date(&a.assessment_completed),
        "assessment_summary": optional_value(&a.assessment_summary)?,
        "ci_systems": optional_value(&a.ci_systems)?,
        "ci_type": optional_value(&a.ci_type)?,
        "contractor_count": optional_value(&a.contractor_count)?,
        "draft_completed": optional_date(&a.draft_completed),
        "election": optional_value(&a.election)?,
        "external_testing_begin": optional_date(&a.external_testing_begin),
        "external_testing_end": optional_date(&a.external_testing_end),
        "fed_count": optional_value(&a.fed_count)?,
        "fed_lead": optional_value(&a.fed_lead)?,
        "group_project": optional_value(&a.group_project)?,
        "internal_testing_begin": optional_date(&a.internal_testing_begin),
        "internal_testing_city": optional_value(&a.internal_testing_city)?,
        "internal_testing_end": optional_date(&a.internal_testing_end),
        "last_change": optional_date(&a.last_change),
        "management_request": optional_value(&a.management_request)?,
        "mandated_category": optional_value(&a.mandated_category)?,
        "operators": list(&a.operators)?,
        "report_final_date": optional_date(&a.report_final_date),
        "requested_services": list(&a.requested_services)?,
        "roe_number": optional_value(&a.roe_number)?,
        "roe_signed": optional_value(&a.roe_signed)?,
        "roe_signed_date": optional_date(&a.roe_signed_date),
        "sector": optional_value(&a.sector)?,
        "stakeholder_state": optional_value(&a.stakeholder_state)?,
        "testing_begin": optional_date(&a.testing_begin),
        "testing_complete": optional_date(&a.testing_complete),
        "testing_phase": list(&a.testing_phase)?,
    })
}

struct Reader<'a> {
    doc: &'a Document,
}

impl Reader<'_> {
    fn get(&self, key: &str) -> Option<&Bson> {
        match self.doc.get(key) {
            None | Some(Bson::Null) => None,
            Some(other) => Some(other),
        }
    }

    fn required(&self, key: &str) -> Result<&Bson, RepositoryError> {
        self.get(key)
            .ok_or_else(|| RepositoryError::MalformedDocument(format!("missing '{key}'")))
    }

    // Required business fields may legitimately hold null.
    fn value(&self, key: &str) -> Result<Value, RepositoryError> {
        self.doc
            .get(key)
            .map(|bson| bson.clone().into_relaxed_extjson())
            .ok_or_else(|| RepositoryError::MalformedDocument(format!("missing '{key}'")))
    }

    fn optional_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(|bson| bson.clone().into_relaxed_extjson())
    }

    fn date(&self, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
        match self.required(key)? {
            Bson::DateTime(dt) => Ok(dt.to_chrono()),
            other => Err(RepositoryError::MalformedDocument(format!(
                "'{key}' is {:?}, expected a datetime",
                other.element_type()
            ))),
        }
    }

    fn optional_date(&self, key: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.date(key).map(Some),
        }
    }

    fn list(&self, key: &str) -> Result<Vec<Value>, RepositoryError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Bson::Array(items)) => Ok(items
                .iter()
                .map(|item| item.clone().into_relaxed_extjson())
                .collect()),
            Some(other) => Err(RepositoryError::MalformedDocument(format!(
                "'{key}' is {:?}, expected an array",
                other.element_type()
            ))),
        }
    }
}

/// Decodes a stored document back into an [`Assessment`].
pub fn from_document(doc: &Document) -> Result<Assessment, RepositoryError> {
    let r = Reader { doc };
    let raw_id = r.required("_id")?;
    let id = AssessmentId::from_bson(raw_id).ok_or_else(|| {
        RepositoryError::MalformedDocument(format!(
            "'_id' is {:?}, expected a string or integer",
            raw_id.element_type()
        ))
    })?;

    Ok(Assessment {
        id,
        assessment_name: r.value("assessment_name")?,
        assessment_status: r.value("assessment_status")?,
        assessment_type: r.value("assessment_type")?,
        created: r.optional_date("created")?,
        stakeholder_name: r.value("stakeholder_name")?,
        appendix_a_signed: r.optional_value("appendix_a_signed"),
        appendix_a_signed_date: r.optional_date("appendix_a_signed_date")?,
        appendix_b_signed: r.optional_value("appendix_b_signed"),
        assessment_completed: r.optional_date("assessment_completed")?,
        assessment_summary: r.optional_value("assessment_summary"),
        ci_systems: r.optional_value("ci_systems"),
        ci_type: r.optional_value("ci_type"),
        contractor_count: r.optional_value("contractor_count"),
        draft_completed: r.optional_date("draft_completed")?,
        election: r.optional_value("election"),
        external_testing_begin: r.optional_date("external_testing_begin")?,
        external_testing_end: r.optional_date("external_testing_end")?,
        fed_count: r.optional_value("fed_count"),
        fed_lead: r.optional_value("fed_lead"),
        group_project: r.optional_value("group_project"),
        internal_testing_begin: r.optional_date("internal_testing_begin")?,
        internal_testing_city: r.optional_value("internal_testing_city"),
        internal_testing_end: r.optional_date("internal_testing_end")?,
        last_change: r.optional_date("last_change")?,
        management_request: r.optional_value("management_request"),
        mandated_category: r.optional_value("mandated_category"),
        operators: r.list("operators")?,
        report_final_date: r.optional_date("report_final_date")?,
        requested_services: r.list("requested_services")?,
        roe_number: r.optional_value("roe_number"),
        roe_signed: r.optional_value("roe_signed"),
        roe_signed_date: r.optional_date("roe_signed_date")?,
        sector: r.optional_value("sector"),
        stakeholder_state: r.optional_value("stakeholder_state"),
        testing_begin: r.optional_date("testing_begin")?,
        testing_complete: r.optional_date("testing_complete")?,
        testing_phase: r.list("testing_phase")?,
    })
}
