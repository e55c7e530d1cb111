//! Field values
//!
//! Text coercion for every scalar type a row may carry. Decoding is
//! tolerant of the variations older files contain (`True`, `+5`, padded
//! numbers, timestamps written as strings) but never guesses: text that
//! cannot be read as the target type is an error.

use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

/// A scalar that can be stored in one field
pub trait FieldValue: Sized {
    /// Render the value as unescaped field text
    fn to_field(&self) -> String;

    /// Parse unescaped, non-empty field text
    fn from_field(raw: &str) -> std::result::Result<Self, String>;

    /// Value of an empty or missing field
    fn empty() -> Self;
}

// =============================================================================
// Text and Numbers
// =============================================================================

impl FieldValue for String {
    fn to_field(&self) -> String {
        self.clone()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        Ok(raw.to_string())
    }

    fn empty() -> Self {
        String::new()
    }
}

impl FieldValue for bool {
    fn to_field(&self) -> String {
        let text = if *self { "1" } else { "0" };
        text.to_string()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        }
    }

    fn empty() -> Self {
        false
    }
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn to_field(&self) -> String {
                    self.to_string()
                }

                fn from_field(raw: &str) -> std::result::Result<Self, String> {
                    let trimmed = raw.trim();
                    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
                    digits.parse::<$ty>().map_err(|e| {
                        format!("'{}' is not a valid {}: {}", raw, stringify!($ty), e)
                    })
                }

                fn empty() -> Self {
                    0
                }
            }
        )*
    };
}

integer_field!(i32, i64, u32, u64);

impl FieldValue for f64 {
    fn to_field(&self) -> String {
        self.to_string()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| format!("'{}' is not a valid f64: {}", raw, e))
    }

    fn empty() -> Self {
        0.0
    }
}

impl FieldValue for Decimal {
    fn to_field(&self) -> String {
        self.to_string()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        let trimmed = raw.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|e| format!("'{}' is not a valid decimal: {}", raw, e))
    }

    fn empty() -> Self {
        Decimal::ZERO
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// 100-nanosecond intervals per second
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Tick count of 1970-01-01T00:00:00 (ticks count from 0001-01-01T00:00:00)
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// A raw timestamp tick count
///
/// Ticks are the storage precision of every timestamp field: finer
/// nanoseconds are dropped on encode. Stamp rows with [`Ticks::now`] or pass
/// values through [`Ticks::align`] to keep them equal across a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub i64);

impl Ticks {
    pub fn from_datetime(value: &NaiveDateTime) -> Self {
        let utc = value.and_utc();
        let whole = utc.timestamp().saturating_mul(TICKS_PER_SECOND);
        let fraction = i64::from(utc.timestamp_subsec_nanos() / 100);
        Ticks(UNIX_EPOCH_TICKS.saturating_add(whole).saturating_add(fraction))
    }

    /// Current UTC time as ticks
    pub fn now() -> Self {
        let now: DateTime<Utc> = SystemTime::now().into();
        Self::from_datetime(&now.naive_utc())
    }

    /// `value` truncated to tick precision
    pub fn align(value: &NaiveDateTime) -> NaiveDateTime {
        Self::from_datetime(value).to_datetime().unwrap_or(*value)
    }

    /// `None` when the tick count is outside the representable calendar
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        let relative = self.0.checked_sub(UNIX_EPOCH_TICKS)?;
        let secs = relative.div_euclid(TICKS_PER_SECOND);
        let nanos = (relative.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
    }
}

impl FieldValue for Ticks {
    fn to_field(&self) -> String {
        self.0.to_string()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        i64::from_field(raw).map(Ticks)
    }

    fn empty() -> Self {
        Ticks(0)
    }
}

impl FieldValue for NaiveDateTime {
    fn to_field(&self) -> String {
        Ticks::from_datetime(self).to_field()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        let trimmed = raw.trim();
        if let Ok(ticks) = trimmed.parse::<i64>() {
            return Ticks(ticks)
                .to_datetime()
                .ok_or_else(|| format!("tick count {} is out of range", ticks));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| format!("'{}' is not a tick count or timestamp", raw))
    }

    fn empty() -> Self {
        Ticks(0).to_datetime().unwrap_or(NaiveDateTime::MIN)
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_field(&self) -> String {
        self.naive_utc().to_field()
    }

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        NaiveDateTime::from_field(raw).map(|naive| naive.and_utc())
    }

    fn empty() -> Self {
        NaiveDateTime::empty().and_utc()
    }
}
