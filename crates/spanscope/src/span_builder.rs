use spanscope_protocol::*;

/// Fluent builder for complete spans, used for fixtures and seed data
#[derive(Clone, Debug)]
pub struct SpanBuilder {
    span: Span,
}

impl SpanBuilder {
    pub fn new(
        trace_id: impl Into<TraceId>,
        span_id: impl Into<SpanId>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            span: Span {
                trace_id: trace_id.into(),
                span_id: span_id.into(),
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn service(mut self, service_name: impl Into<String>) -> Self {
        self.span.service_name = service_name.into();
        self
    }

    /// Set the parent span (for nesting)
    pub fn child_of(mut self, parent: impl Into<SpanId>) -> Self {
        self.span.parent_span_id = Some(parent.into());
        self
    }

    /// Start time; the end time follows from the duration
    pub fn starting_at(mut self, start: Timestamp) -> Self {
        self.span.start_time = start;
        self.span.end_time = start.add_millis(self.span.duration);
        self
    }

    pub fn lasting(mut self, duration_ms: f64) -> Self {
        self.span.duration = duration_ms;
        self.span.end_time = self.span.start_time.add_millis(duration_ms);
        self
    }

    pub fn http(mut self, method: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        self.span.http_method = Some(method.into());
        self.span.http_url = Some(url.into());
        self.span.http_status = (status != 0).then_some(status);
        self
    }

    /// Add an attribute; insertion order is kept
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.span.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_resource(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.span.resources.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_timed_http_span() {
        let start = Timestamp::from_unix_millis(1_000);
        let span = SpanBuilder::new("t1", "s2", "GET /cart")
            .service("storefront")
            .child_of("s1")
            .lasting(25.0)
            .starting_at(start)
            .http("GET", "/cart", 404)
            .with_attribute("cart.items", 2)
            .with_resource("host.name", "web-1")
            .build();

        assert_eq!(span.parent_span_id, Some(SpanId::from("s1")));
        assert_eq!(span.end_time, Timestamp::from_unix_millis(1_025));
        assert!(span.is_error());
        assert_eq!(span.http_request().as_deref(), Some("GET /cart"));
        assert_eq!(span.attributes.get("cart.items"), Some(&ScalarValue::Int(2)));
    }

    #[test]
    fn zero_status_means_unreported() {
        let span = SpanBuilder::new("t1", "s1", "job").http("POST", "/jobs", 0).build();
        assert_eq!(span.http_status, None);
    }
}
