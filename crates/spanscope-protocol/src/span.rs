use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::ids::{empty_span_id_as_none, SpanId, TraceId};

/// Wall-clock timestamp, encoded as RFC 3339 on the wire
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] pub OffsetDateTime);

impl Timestamp {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Build a timestamp from milliseconds since the UNIX epoch
    pub fn from_unix_millis(millis: i64) -> Self {
        let nanos = i128::from(millis) * 1_000_000;
        Self(OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH))
    }

    pub fn unix_nanos(&self) -> i128 {
        self.0.unix_timestamp_nanos()
    }

    /// Shift by a (possibly fractional) number of milliseconds
    pub fn add_millis(self, millis: f64) -> Self {
        let offset = time::Duration::seconds_f64(millis / 1000.0);
        Self(self.0.checked_add(offset).unwrap_or(self.0))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self(OffsetDateTime::UNIX_EPOCH)
    }
}

/// Scalar value of a span attribute or resource
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(i) => write!(f, "{i}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::String(s) if s.is_empty() => f.write_str("-"),
            ScalarValue::String(s) => f.write_str(s),
            ScalarValue::Null => f.write_str("-"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int(i64::from(value))
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

/// Span represents a single timed unit of work in a trace.
///
/// Fields other than the ids fall back to their defaults when missing, `null`
/// or mistyped, so one malformed span never rejects a whole payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(default)]
    pub span_id: SpanId,
    #[serde(
        default,
        deserialize_with = "empty_span_id_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_span_id: Option<SpanId>,
    #[serde(default)]
    pub trace_id: TraceId,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub service_name: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Timestamp,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_time: Timestamp,
    /// Duration in milliseconds
    #[serde(default, deserialize_with = "lenient")]
    pub duration: f64,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_method: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "zero_status_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub http_status: Option<u16>,
    #[serde(default, deserialize_with = "lenient")]
    pub attributes: IndexMap<String, ScalarValue>,
    #[serde(default, deserialize_with = "lenient")]
    pub resources: BTreeMap<String, ScalarValue>,
}

impl Span {
    /// Duration in milliseconds, with negative and non-finite values read as zero
    pub fn duration_ms(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            self.duration
        } else {
            0.0
        }
    }

    /// Whether the span reported an HTTP error status
    pub fn is_error(&self) -> bool {
        self.http_status.is_some_and(|status| status >= 400)
    }

    /// `"METHOD URL"` when both halves are known
    pub fn http_request(&self) -> Option<String> {
        match (&self.http_method, &self.http_url) {
            (Some(method), Some(url)) => Some(format!("{method} {url}")),
            _ => None,
        }
    }

    /// Whether the timestamps respect `start_time <= end_time`
    pub fn has_ordered_timestamps(&self) -> bool {
        self.start_time <= self.end_time
    }

    /// Whether the span names itself as its parent
    pub fn is_self_parented(&self) -> bool {
        self.parent_span_id.as_ref() == Some(&self.span_id)
    }
}

/// A field value, or anything else the field cannot hold
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Value(value) => Ok(value),
        Lenient::Other(_) => Ok(T::default()),
    }
}

/// Accepts RFC 3339 text or epoch milliseconds; anything else reads as the epoch
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Millis(f64),
        Other(IgnoredAny),
    }

    Ok(match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => OffsetDateTime::parse(&text, &Rfc3339)
            .map(Timestamp)
            .unwrap_or_default(),
        RawTimestamp::Millis(millis) if millis.is_finite() => Timestamp::default().add_millis(millis),
        RawTimestamp::Millis(_) | RawTimestamp::Other(_) => Timestamp::default(),
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = lenient(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

fn zero_status_as_none<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = lenient(deserializer)?;
    Ok(raw.and_then(|status| u16::try_from(status).ok()).filter(|status| *status > 0))
}
