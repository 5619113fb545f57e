use adi_core::config::ImportRequest;
use adi_core::importer::Importer;
use adi_core::trigger::{evaluate, log_ignored, S3Notification};
use lambda_runtime::{Error, LambdaEvent};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub struct HandlerState {
    importer: Importer,
    request: ImportRequest,
}

impl HandlerState {
    pub fn new(importer: Importer, request: ImportRequest) -> Self {
        Self { importer, request }
    }
}

/// Runs an import when the event is a put of the configured object.
/// Anything else is logged and acknowledged without error.
pub async fn function_handler(
    event: LambdaEvent<Value>,
    state: &HandlerState,
) -> Result<Value, Error> {
    let (payload, _context) = event.into_parts();
    debug!("AWS Event was: {payload}");

    let notification: S3Notification = match serde_json::from_value(payload.clone()) {
        Ok(notification) => notification,
        Err(err) => {
            warn!(error = %err, "Event is not an S3 notification");
            warn!("Full AWS event: {payload}");
            return Ok(json!({ "status": "ignored", "reason": "not an S3 notification" }));
        }
    };

    let expected = &state.request.source;
    let decision = evaluate(&notification, expected);
    if !decision.should_import() {
        log_ignored(&decision, expected, &payload);
        return Ok(json!({ "status": "ignored", "reason": decision.reason() }));
    }

    let report = state.importer.run(&state.request).await?;
    info!(
        imported = report.imported,
        skipped = report.skipped.len(),
        "Imported {} from S3 bucket {}",
        expected.key,
        expected.bucket
    );

    Ok(json!({
        "status": "imported",
        "imported": report.imported,
        "skipped": report.skipped.len(),
    }))
}
