//! Message filters and their wire form
//!
//! Callers describe a search with [`MessageFilter`] (or a loose
//! [`FilterMap`]). Before it goes on the wire it is normalized:
//! - absent values are dropped
//! - logical names are renamed to the server's dotted names
//! - `created_at` bounds are converted to ISO-8601 UTC strings

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::error::{LathermailError, LathermailResult};
use crate::timezone::TimezoneResolver;

/// Logical field name -> wire field name
const WIRE_NAMES: [(&str, &str); 8] = [
    ("recipients_address", "recipients.address"),
    ("recipients_address_contains", "recipients.address_contains"),
    ("recipients_name", "recipients.name"),
    ("recipients_name_contains", "recipients.name_contains"),
    ("sender_address", "sender.address"),
    ("sender_address_contains", "sender.address_contains"),
    ("sender_name", "sender.name"),
    ("sender_name_contains", "sender.name_contains"),
];

/// Fields compared against the message creation time
const DATE_FIELDS: [&str; 2] = ["created_at_gt", "created_at_lt"];

/// Wire name for a logical field; unmapped names are returned as is
pub fn wire_name(logical: &str) -> &str {
    WIRE_NAMES
        .iter()
        .find(|(from, _)| *from == logical)
        .map(|(_, to)| *to)
        .unwrap_or(logical)
}

/// A point in time used as a `created_at` bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTime {
    /// Wall-clock time, localized by the client's timezone resolver
    Naive(NaiveDateTime),
    /// Time with a known offset
    Zoned(DateTime<FixedOffset>),
}

impl FilterTime {
    fn to_utc(self, tz: &dyn TimezoneResolver) -> LathermailResult<DateTime<Utc>> {
        match self {
            FilterTime::Naive(naive) => tz.to_utc(naive),
            FilterTime::Zoned(dt) => Ok(dt.with_timezone(&Utc)),
        }
    }
}

impl From<NaiveDateTime> for FilterTime {
    fn from(naive: NaiveDateTime) -> Self {
        FilterTime::Naive(naive)
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for FilterTime {
    fn from(dt: DateTime<Z>) -> Self {
        FilterTime::Zoned(dt.fixed_offset())
    }
}

impl FromStr for FilterTime {
    type Err = LathermailError;

    /// Accepts RFC 3339 (zoned), `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`
    /// or a bare `YYYY-MM-DD` (midnight); the last three are naive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(FilterTime::Zoned(dt));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(FilterTime::Naive(naive));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(FilterTime::Naive)
            .ok_or_else(|| LathermailError::InvalidDateTime(format!("unrecognized datetime '{}'", s)))
    }
}

/// A single filter value before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
    Time(FilterTime),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<FilterTime> for FilterValue {
    fn from(t: FilterTime) -> Self {
        FilterValue::Time(t)
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(naive: NaiveDateTime) -> Self {
        FilterValue::Time(naive.into())
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for FilterValue {
    fn from(dt: DateTime<Z>) -> Self {
        FilterValue::Time(dt.into())
    }
}

/// Loosely typed filter: field name -> value, `None` meaning "not set"
pub type FilterMap = BTreeMap<String, Option<FilterValue>>;

/// Search criteria understood by the `messages/` endpoint
///
/// Every field is optional; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub recipients_address: Option<String>,
    pub recipients_address_contains: Option<String>,
    pub recipients_name: Option<String>,
    pub recipients_name_contains: Option<String>,
    pub sender_address: Option<String>,
    pub sender_address_contains: Option<String>,
    pub sender_name: Option<String>,
    pub sender_name_contains: Option<String>,
    pub subject: Option<String>,
    pub subject_contains: Option<String>,
    pub read: Option<bool>,
    /// Only messages created after this time
    pub created_at_gt: Option<FilterTime>,
    /// Only messages created before this time
    pub created_at_lt: Option<FilterTime>,
}

impl MessageFilter {
    /// Filter with no criteria (matches every message in the inbox)
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of criteria that are set
    pub fn len(&self) -> usize {
        self.to_filter_map().values().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a [`FilterMap`] keyed by logical field names
    pub fn to_filter_map(&self) -> FilterMap {
        fn text(v: &Option<String>) -> Option<FilterValue> {
            v.clone().map(FilterValue::Text)
        }

        let entries = [
            ("recipients_address", text(&self.recipients_address)),
            ("recipients_address_contains", text(&self.recipients_address_contains)),
            ("recipients_name", text(&self.recipients_name)),
            ("recipients_name_contains", text(&self.recipients_name_contains)),
            ("sender_address", text(&self.sender_address)),
            ("sender_address_contains", text(&self.sender_address_contains)),
            ("sender_name", text(&self.sender_name)),
            ("sender_name_contains", text(&self.sender_name_contains)),
            ("subject", text(&self.subject)),
            ("subject_contains", text(&self.subject_contains)),
            ("read", self.read.map(FilterValue::Bool)),
            ("created_at_gt", self.created_at_gt.map(FilterValue::Time)),
            ("created_at_lt", self.created_at_lt.map(FilterValue::Time)),
        ];

        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// Normalized query parameters, ready for query-string encoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WireParams(BTreeMap<String, String>);

impl WireParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Back to a [`FilterMap`] of text values, keyed by wire names
    pub fn to_filter_map(&self) -> FilterMap {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Some(FilterValue::Text(v.clone()))))
            .collect()
    }
}

/// Normalize a filter into wire parameters
///
/// Naive `created_at` bounds are localized with `tz` before conversion to
/// UTC. Fails only when such a time cannot be localized.
pub fn normalize(filters: FilterMap, tz: &dyn TimezoneResolver) -> LathermailResult<WireParams> {
    let mut params = BTreeMap::new();

    for (name, value) in filters {
        let Some(value) = value else {
            continue;
        };

        let rendered = match value {
            FilterValue::Text(s) => s,
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Time(time) if DATE_FIELDS.contains(&name.as_str()) => {
                iso_utc(time.to_utc(tz)?)
            }
            FilterValue::Time(FilterTime::Zoned(dt)) => dt.to_rfc3339_opts(seconds_format(dt.nanosecond()), false),
            FilterValue::Time(FilterTime::Naive(naive)) if naive.nanosecond() == 0 => {
                naive.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
            FilterValue::Time(FilterTime::Naive(naive)) => naive.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        };

        params.insert(wire_name(&name).to_string(), rendered);
    }

    Ok(WireParams(params))
}

/// `2024-05-01T09:00:00+00:00`, with microseconds only when present
fn iso_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(seconds_format(dt.nanosecond()), false)
}

fn seconds_format(subsec_nanos: u32) -> SecondsFormat {
    if subsec_nanos == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    }
}
