use chrono::{DateTime, Datelike, Local, NaiveDate, Offset, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MULTI_VALUE_SEPARATOR: char = ';';

/// Calendar date as the date widget exchanges it. `month` is zero-based.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub date: u32,
}

impl DateParts {
    pub fn today() -> Self {
        Self::from_naive(Local::now().date_naive())
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
            date: date.day(),
        }
    }

    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.checked_add(1)?, self.date)
    }

    /// Parses an edit payload: `formattedDate` wins over the `{year, month, date}` triple.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;
        if let Some(formatted) = obj.get("formattedDate").and_then(|v| v.as_str()) {
            return Self::from_stored(formatted);
        }
        let year = obj.get("year").and_then(|v| v.as_i64())?;
        let month = obj.get("month").and_then(|v| v.as_u64())?;
        let date = obj.get("date").and_then(|v| v.as_u64())?;
        let parts = Self {
            year: i32::try_from(year).ok()?,
            month: u32::try_from(month).ok()?,
            date: u32::try_from(date).ok()?,
        };
        parts.to_naive().map(|_| parts)
    }

    /// Parses a stored `YYYY-MM-DD` value. Full RFC 3339 timestamps are accepted too.
    pub fn from_stored(stored: &str) -> Option<Self> {
        let stored = stored.trim();
        if let Ok(date) = NaiveDate::parse_from_str(stored, "%Y-%m-%d") {
            return Some(Self::from_naive(date));
        }
        DateTime::parse_from_rfc3339(stored)
            .ok()
            .map(|dt| Self::from_naive(dt.date_naive()))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(_) => Self::from_payload(value),
            Value::String(s) => Self::from_stored(s),
            _ => None,
        }
    }
}

pub fn is_date_payload(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => {
            obj.contains_key("formattedDate")
                || (obj.contains_key("year") && obj.contains_key("month") && obj.contains_key("date"))
        }
        None => false,
    }
}

/// Epoch milliseconds of midnight UTC on `date`, derived from the local
/// midnight in `tz` shifted by that instant's UTC offset.
pub fn midnight_utc_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<i64> {
    let local_midnight = tz
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()?;
    let offset_ms = i64::from(local_midnight.offset().fix().local_minus_utc()) * 1000;
    Some(local_midnight.timestamp_millis() + offset_ms)
}

pub fn join_multi_value(values: &[String]) -> String {
    values.join(&MULTI_VALUE_SEPARATOR.to_string())
}

/// Multi-select values arrive as `a;b;c` strings or as arrays. Empty input
/// yields an empty list.
pub fn split_multi_value(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => {
            s.split(MULTI_VALUE_SEPARATOR).map(str::to_string).collect()
        }
        Some(Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
        _ => Vec::new(),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn coerce_for_write(value: &Value) -> Value {
    coerce_for_write_in(value, &Local)
}

pub fn coerce_for_write_in<Tz: TimeZone>(value: &Value, tz: &Tz) -> Value {
    if is_date_payload(value) {
        let millis = DateParts::from_payload(value)
            .and_then(DateParts::to_naive)
            .and_then(|date| midnight_utc_millis(date, tz));
        return match millis {
            Some(ms) => Value::from(ms),
            None => {
                tracing::warn!(payload = %value, "Unparseable date payload, writing as-is");
                value.clone()
            }
        };
    }
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(scalar_to_string).collect();
            Value::String(join_multi_value(&parts))
        }
        other => other.clone(),
    }
}
