//! Logs payload summarization.

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;

use super::ContextSummary;
use crate::domain::traces::attributes::attributes_to_json;

/// Summary of one logs-export call.
#[derive(Debug, Default)]
pub struct LogsSummary {
    pub item_count: i64,
    pub service_name: Option<String>,
    pub session_key: Option<String>,
    /// Severity of the highest-severity record in the call. Ties keep the
    /// first non-empty severity text.
    pub severity_text: Option<String>,
    pub severity_number: Option<i32>,
}

/// Summarize a decoded logs-export request.
pub fn summarize(request: &ExportLogsServiceRequest) -> LogsSummary {
    let mut summary = LogsSummary::default();
    let mut ctx = ContextSummary::default();

    for resource_logs in &request.resource_logs {
        if let Some(resource) = &resource_logs.resource {
            ctx.observe(&attributes_to_json(&resource.attributes));
        }

        for scope_logs in &resource_logs.scope_logs {
            for record in &scope_logs.log_records {
                summary.item_count += 1;
                if !ctx.is_complete() {
                    ctx.observe(&attributes_to_json(&record.attributes));
                }

                let text = (!record.severity_text.is_empty()).then(|| record.severity_text.clone());
                match summary.severity_number {
                    None => {
                        summary.severity_number = Some(record.severity_number);
                        summary.severity_text = text;
                    }
                    Some(best) if record.severity_number > best => {
                        summary.severity_number = Some(record.severity_number);
                        summary.severity_text = text;
                    }
                    Some(best) if record.severity_number == best => {
                        if summary.severity_text.is_none() {
                            summary.severity_text = text;
                        }
                    }
                    Some(_) => {}
                }
            }
        }
    }

    summary.service_name = ctx.service_name;
    summary.session_key = ctx.session_key;
    summary
}
