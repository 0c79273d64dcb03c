//! Seed data for UI development
//!
//! Generates traces with various shapes (deep nesting, fan-out, errors,
//! broken parent links) so the viewer can be exercised without a real
//! collector.

use spanscope::*;

use crate::storage::TraceStore;

/// Load seed traces into the store
pub fn load_seed_data(store: &TraceStore) {
    let traces = seed_traces(Timestamp::now());
    let count = traces.len();
    for trace in traces {
        store.insert_payload(trace);
    }
    tracing::info!(count, "loaded seed traces");
}

/// One span of a seed trace, offsets relative to the trace start
struct Seed<'a> {
    trace_id: &'a str,
    start: Timestamp,
}

impl<'a> Seed<'a> {
    fn new(trace_id: &'a str, now: Timestamp, ago_ms: f64) -> Self {
        Self {
            trace_id,
            start: now.add_millis(-ago_ms),
        }
    }

    fn span(&self, id: &str, name: &str, service: &str, at_ms: f64, duration_ms: f64) -> SpanBuilder {
        SpanBuilder::new(self.trace_id, id, name)
            .service(service)
            .lasting(duration_ms)
            .starting_at(self.start.add_millis(at_ms))
    }
}

/// Generate a variety of realistic traces ending before `now`
pub fn seed_traces(now: Timestamp) -> Vec<TracePayload> {
    let mut traces = Vec::new();

    // 1. Fast successful HTTP request
    {
        let seed = Seed::new("a1b2c3d4", now, 50.0);
        traces.push(
            TracePayload::new(
                seed.trace_id,
                vec![
                    seed.span("s1", "GET /api/users", "api-gateway", 0.0, 12.0)
                        .http("GET", "/api/users", 200)
                        .with_attribute("next.route", "/api/users")
                        .with_attribute("next.span_type", "BaseServer.handleRequest")
                        .with_resource("host.name", "web-1")
                        .build(),
                    seed.span("s2", "db.query users", "postgres", 2.0, 8.0)
                        .child_of("s1")
                        .with_attribute("db.system", "postgresql")
                        .with_attribute("db.statement", "SELECT * FROM users LIMIT 10")
                        .build(),
                ],
            )
            .with_root("s1"),
        );
    }

    // 2. Slow checkout across services
    {
        let seed = Seed::new("deadbeef", now, 2_500.0);
        traces.push(
            TracePayload::new(
                seed.trace_id,
                vec![
                    seed.span("c1", "POST /checkout", "storefront", 0.0, 2_345.0)
                        .http("POST", "/checkout", 200)
                        .with_attribute("cart.items", 3)
                        .with_attribute("user.tier", "gold")
                        .build(),
                    seed.span("c2", "reserve inventory", "inventory", 20.0, 180.0)
                        .child_of("c1")
                        .build(),
                    seed.span("c3", "charge card", "payments", 210.0, 1_900.0)
                        .child_of("c1")
                        .http("POST", "/v1/charges", 200)
                        .with_attribute("payment.provider", "stripe")
                        .build(),
                    seed.span("c4", "fraud check", "payments", 230.0, 1_200.0)
                        .child_of("c3")
                        .with_attribute("fraud.score", 0.12)
                        .build(),
                    seed.span("c5", "db.transaction", "postgres", 2_120.0, 210.0)
                        .child_of("c1")
                        .with_attribute("db.operation", "INSERT")
                        .build(),
                ],
            )
            .with_root("c1"),
        );
    }

    // 3. Failed request
    {
        let seed = Seed::new("e440e404", now, 15.0);
        traces.push(
            TracePayload::new(
                seed.trace_id,
                vec![
                    seed.span("e1", "GET /api/user/999", "api-gateway", 0.0, 8.0)
                        .http("GET", "/api/user/999", 404)
                        .with_attribute("error", true)
                        .build(),
                    seed.span("e2", "lookup user", "users", 1.0, 6.0)
                        .child_of("e1")
                        .http("GET", "/internal/users/999", 500)
                        .build(),
                ],
            )
            .with_root("e1"),
        );
    }

    // 4. Deep nesting with the error at the bottom
    {
        let seed = Seed::new("0d0d0d0d", now, 900.0);
        let mut spans = vec![seed
            .span("d0", "POST /reports", "reports", 0.0, 800.0)
            .http("POST", "/reports", 500)
            .build()];
        for level in 1..8 {
            let at = f64::from(level) * 10.0;
            let mut builder = seed
                .span(
                    &format!("d{level}"),
                    &format!("render section {level}"),
                    "reports",
                    at,
                    800.0 - at * 2.0,
                )
                .child_of(format!("d{}", level - 1));
            if level == 7 {
                builder = builder.http("GET", "/fonts/missing.woff", 503);
            }
            spans.push(builder.build());
        }
        traces.push(TracePayload::new(seed.trace_id, spans).with_root("d0"));
    }

    // 5. Fan-out
    {
        let seed = Seed::new("fa11fa11", now, 400.0);
        let mut spans = vec![seed
            .span("f0", "GET /dashboard", "bff", 0.0, 140.0)
            .http("GET", "/dashboard", 200)
            .build()];
        for (i, service) in ["profile", "billing", "notifications", "search"].iter().enumerate() {
            spans.push(
                seed.span(&format!("f{}", i + 1), &format!("fetch {service}"), service, 5.0, 40.0 + 25.0 * i as f64)
                    .child_of("f0")
                    .build(),
            );
        }
        traces.push(TracePayload::new(seed.trace_id, spans).with_root("f0"));
    }

    // 6. Sub-millisecond cache hit
    {
        let seed = Seed::new("cac4e001", now, 5.0);
        traces.push(TracePayload::new(
            seed.trace_id,
            vec![seed
                .span("k1", "cache.get session", "redis", 0.0, 0.3)
                .with_attribute("cache.hit", true)
                .build()],
        ));
    }

    // 7. Orphans: the parent was never reported
    {
        let seed = Seed::new("0a0a0a0a", now, 3_000.0);
        traces.push(TracePayload::new(
            seed.trace_id,
            vec![
                seed.span("o1", "consume order.created", "worker", 0.0, 60.0).build(),
                seed.span("o2", "send email", "mailer", 10.0, 45.0)
                    .child_of("lost-parent")
                    .build(),
                seed.span("o3", "render template", "mailer", 12.0, 20.0)
                    .child_of("o2")
                    .build(),
            ],
        ));
    }

    // 8. Broken parent links: a self-parented span and a two-span cycle
    {
        let seed = Seed::new("c1c1e000", now, 6_000.0);
        traces.push(TracePayload::new(
            seed.trace_id,
            vec![
                seed.span("x1", "scheduler tick", "cron", 0.0, 30.0)
                    .child_of("x1")
                    .build(),
                seed.span("x2", "retry a", "cron", 5.0, 10.0)
                    .child_of("x3")
                    .build(),
                seed.span("x3", "retry b", "cron", 6.0, 8.0)
                    .child_of("x2")
                    .build(),
            ],
        ));
    }

    // 9. Known trace without any spans
    traces.push(TracePayload::new("e0e0e0e0", Vec::new()));

    traces
}
