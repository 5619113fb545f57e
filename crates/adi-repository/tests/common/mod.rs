#![allow(dead_code)]

use adi_repository::{Assessment, AssessmentId};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

pub fn sample(id: impl Into<AssessmentId>) -> Assessment {
    Assessment {
        id: id.into(),
        assessment_name: json!("RV0001 - Example Utility"),
        assessment_status: json!("Open"),
        assessment_type: json!("Risk and Vulnerability Assessment"),
        created: Some(Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap()),
        stakeholder_name: json!("Example Utility"),
        appendix_a_signed: None,
        appendix_a_signed_date: None,
        appendix_b_signed: None,
        assessment_completed: None,
        assessment_summary: None,
        ci_systems: None,
        ci_type: None,
        contractor_count: None,
        draft_completed: None,
        election: None,
        external_testing_begin: None,
        external_testing_end: None,
        fed_count: None,
        fed_lead: None,
        group_project: None,
        internal_testing_begin: None,
        internal_testing_city: None,
        internal_testing_end: None,
        last_change: None,
        management_request: None,
        mandated_category: None,
        operators: Vec::new(),
        report_final_date: None,
        requested_services: Vec::new(),
        roe_number: None,
        roe_signed: None,
        roe_signed_date: None,
        sector: None,
        stakeholder_state: None,
        testing_begin: None,
        testing_complete: None,
        testing_phase: Vec::<Value>::new(),
    }
}
