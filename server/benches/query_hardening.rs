// Query hardening benchmark - measure aggregation latency with and without
// the hardening indexes.
//
// Seeds a fixed synthetic dataset (half the rows backfilled with literal
// derived columns, half resolving through the raw-JSON expression) and
// compares session-overview and session-timeline query latency across the
// two index configurations.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use clawdeck_server::data::models::SpanRecord;
use clawdeck_server::data::repositories::session::{self, OverviewFilters};
use clawdeck_server::data::repositories::span;
use clawdeck_server::data::{Store, schema};
use clawdeck_server::domain::traces::session::derive_fields;

const SESSIONS: usize = 50;
const SPANS_PER_SESSION: usize = 40;

fn seed_store() -> Store {
    let store = Store::open_in_memory().expect("in-memory store");
    let conn = store.conn();

    let mut records = Vec::with_capacity(SESSIONS * SPANS_PER_SESSION);
    for session_idx in 0..SESSIONS {
        let session_key = format!("sess-{session_idx:03}");
        for span_idx in 0..SPANS_PER_SESSION {
            let start = 1_700_000_000_000_000_000_i64
                + (session_idx * SPANS_PER_SESSION + span_idx) as i64 * 1_000_000;
            let attributes = json!({
                "openclaw.sessionKey": session_key,
                "openclaw.channel": if session_idx % 2 == 0 { "slack" } else { "discord" },
                "gen_ai.usage.input_tokens": 120,
                "gen_ai.usage.output_tokens": 40,
            });
            let resource_attributes = json!({"service.name": "agent-host"});
            let name = format!("event-{}", span_idx % 5);

            // Half the dataset is backfilled, half still resolves through
            // the raw-JSON expression path.
            let derived = if span_idx % 2 == 0 {
                derive_fields(Some(&name), &attributes, &resource_attributes)
            } else {
                Default::default()
            };

            records.push(SpanRecord {
                trace_id: Some(format!("trace-{session_idx:03}-{}", span_idx / 4)),
                span_id: Some(format!("span-{session_idx:03}-{span_idx:03}")),
                name: Some(name),
                kind: Some(1),
                start_time_unix_nano: Some(start.to_string()),
                end_time_unix_nano: Some((start + 500_000).to_string()),
                duration_ns: Some(500_000),
                attributes,
                resource_attributes,
                events: json!([]),
                derived,
                ..Default::default()
            });
        }
    }

    span::insert_batch(&conn, &records, b"bench-payload").expect("seed");
    drop(conn);
    store
}

fn drop_hardening_indexes(store: &Store) {
    let conn = store.conn();
    for name in schema::HARDENING_INDEX_NAMES {
        conn.execute_batch(&format!("DROP INDEX IF EXISTS {name};"))
            .expect("drop index");
    }
}

fn bench_session_overview(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_overview");

    for (label, with_indexes) in [("with_indexes", true), ("without_indexes", false)] {
        let store = seed_store();
        if !with_indexes {
            drop_hardening_indexes(&store);
        }

        group.bench_with_input(BenchmarkId::from_parameter(label), &store, |b, store| {
            b.iter(|| {
                let conn = store.conn();
                let page = session::overview(&conn, &OverviewFilters::default(), 50, 0)
                    .expect("overview");
                black_box(page.rows.len());
            });
        });
    }

    group.finish();
}

fn bench_session_timeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_timeline");

    for (label, with_indexes) in [("with_indexes", true), ("without_indexes", false)] {
        let store = seed_store();
        if !with_indexes {
            drop_hardening_indexes(&store);
        }

        group.bench_with_input(BenchmarkId::from_parameter(label), &store, |b, store| {
            b.iter(|| {
                let conn = store.conn();
                let (rows, total) =
                    session::timeline(&conn, "sess-025", None, 200, 0).expect("timeline");
                black_box((rows.len(), total));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_session_overview, bench_session_timeline);
criterion_main!(benches);
