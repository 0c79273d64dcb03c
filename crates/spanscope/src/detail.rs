//! Span detail panel.
//!
//! Projects one span into labelled sections. Like the renderers, this never
//! touches the tree or navigation state.

use spanscope_protocol::Span;

use crate::format;

/// Attribute carrying the framework route of a request span
pub const ROUTE_ATTRIBUTE: &str = "next.route";
/// Attribute carrying the framework's own span classification
pub const SPAN_TYPE_ATTRIBUTE: &str = "next.span_type";
/// Attributes under this prefix are framework-internal, not custom
pub const FRAMEWORK_ATTRIBUTE_PREFIX: &str = "next.";

const PLACEHOLDER: &str = "-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailField {
    pub label: String,
    pub value: String,
}

impl DetailField {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetailSection {
    pub title: &'static str,
    pub fields: Vec<DetailField>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanDetail {
    pub title: String,
    pub timing: DetailSection,
    pub basic: DetailSection,
    pub http: DetailSection,
    /// `None` when the span has no custom attributes
    pub custom_attributes: Option<DetailSection>,
    pub resources: DetailSection,
}

impl SpanDetail {
    pub fn from_span(span: &Span) -> Self {
        let timing = DetailSection {
            title: "Timing",
            fields: vec![
                DetailField::new("Duration", format::millis(span.duration_ms())),
                DetailField::new("Start", format::timestamp(span.start_time)),
                DetailField::new("End", format::timestamp(span.end_time)),
            ],
        };

        let basic = DetailSection {
            title: "Basic Information",
            fields: vec![
                DetailField::new("Span ID", span.span_id.as_str()),
                DetailField::new("Trace ID", span.trace_id.as_str()),
                DetailField::new("Service", non_empty(&span.service_name)),
            ],
        };

        let attribute = |key: &str| {
            span.attributes
                .get(key)
                .map(|value| value.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        };

        let http = DetailSection {
            title: "HTTP Information",
            fields: vec![
                DetailField::new("Status", status_label(span)),
                DetailField::new(
                    "Request",
                    span.http_request().unwrap_or_else(|| PLACEHOLDER.to_string()),
                ),
                DetailField::new("Route", attribute(ROUTE_ATTRIBUTE)),
                DetailField::new("Span Type", attribute(SPAN_TYPE_ATTRIBUTE)),
            ],
        };

        let custom: Vec<DetailField> = span
            .attributes
            .iter()
            .filter(|(key, _)| !key.starts_with(FRAMEWORK_ATTRIBUTE_PREFIX))
            .map(|(key, value)| DetailField::new(key.as_str(), value.to_string()))
            .collect();
        let custom_attributes = (!custom.is_empty()).then_some(DetailSection {
            title: "Custom Attributes",
            fields: custom,
        });

        let resources = DetailSection {
            title: "Resources",
            fields: span
                .resources
                .iter()
                .map(|(key, value)| DetailField::new(key.as_str(), value.to_string()))
                .collect(),
        };

        Self {
            title: non_empty(&span.name),
            timing,
            basic,
            http,
            custom_attributes,
            resources,
        }
    }

    /// All present sections in display order
    pub fn sections(&self) -> impl Iterator<Item = &DetailSection> {
        [&self.timing, &self.basic, &self.http]
            .into_iter()
            .chain(self.custom_attributes.as_ref())
            .chain(std::iter::once(&self.resources))
    }
}

/// HTTP status code, or `OK` when the span did not report one
pub fn status_label(span: &Span) -> String {
    span.http_status
        .map(|status| status.to_string())
        .unwrap_or_else(|| "OK".to_string())
}

fn non_empty(value: &str) -> String {
    if value.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}
