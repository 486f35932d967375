// Timestamp helpers.
//
// Every persisted timestamp uses the same fixed-width RFC 3339 form
// (`2024-01-01T00:00:00.000Z`). Stores compare timestamps as strings, so
// lexicographic order has to match chronological order.

use chrono::{DateTime, Months, SecondsFormat, Utc};

/// Format a timestamp in the canonical stored form.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the canonical stored form.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Add calendar months, clamping to the end of shorter months.
pub fn add_months(dt: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    dt.checked_add_months(Months::new(months)).unwrap_or(dt)
}

/// Serde adapter for `DateTime<Utc>` fields.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields. Absent and `null`
/// both read as `None`; `None` is written as `null`.
pub mod option_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => s.serialize_str(&super::format_timestamp(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
