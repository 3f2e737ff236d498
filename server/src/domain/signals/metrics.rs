//! Metrics payload summarization.

use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::metrics::v1::{Metric, metric::Data};

use super::ContextSummary;
use crate::domain::traces::attributes::attributes_to_json;

/// Summary of one metrics-export call.
#[derive(Debug, Default)]
pub struct MetricsSummary {
    pub item_count: i64,
    pub service_name: Option<String>,
    pub session_key: Option<String>,
    pub metric_names: Vec<String>,
}

/// Summarize a decoded metrics-export request: total data points across all
/// metric types (a metric with no populated data-point list counts as one
/// item), distinct metric names in first-seen order, and the first service
/// name / session key found across resource and data-point attributes.
pub fn summarize(request: &ExportMetricsServiceRequest) -> MetricsSummary {
    let mut summary = MetricsSummary::default();
    let mut ctx = ContextSummary::default();
    let mut seen_names = std::collections::HashSet::new();

    for resource_metrics in &request.resource_metrics {
        if let Some(resource) = &resource_metrics.resource {
            ctx.observe(&attributes_to_json(&resource.attributes));
        }

        for scope_metrics in &resource_metrics.scope_metrics {
            for metric in &scope_metrics.metrics {
                if !metric.name.is_empty() && seen_names.insert(metric.name.clone()) {
                    summary.metric_names.push(metric.name.clone());
                }
                summary.item_count += count_data_points(metric, &mut ctx);
            }
        }
    }

    summary.service_name = ctx.service_name;
    summary.session_key = ctx.session_key;
    summary
}

fn count_data_points(metric: &Metric, ctx: &mut ContextSummary) -> i64 {
    let mut observe = |attrs: &[opentelemetry_proto::tonic::common::v1::KeyValue]| {
        if !ctx.is_complete() {
            ctx.observe(&attributes_to_json(attrs));
        }
    };

    let count = match &metric.data {
        Some(Data::Gauge(g)) => {
            for dp in &g.data_points {
                observe(&dp.attributes);
            }
            g.data_points.len()
        }
        Some(Data::Sum(s)) => {
            for dp in &s.data_points {
                observe(&dp.attributes);
            }
            s.data_points.len()
        }
        Some(Data::Histogram(h)) => {
            for dp in &h.data_points {
                observe(&dp.attributes);
            }
            h.data_points.len()
        }
        Some(Data::ExponentialHistogram(h)) => {
            for dp in &h.data_points {
                observe(&dp.attributes);
            }
            h.data_points.len()
        }
        Some(Data::Summary(s)) => {
            for dp in &s.data_points {
                observe(&dp.attributes);
            }
            s.data_points.len()
        }
        None => 0,
    };

    // A metric without any populated data-point list still counts as one item.
    if count == 0 { 1 } else { count as i64 }
}
