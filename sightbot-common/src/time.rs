//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Serde adapter writing a timestamp as fractional Unix seconds (`1700000000.25`)
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let seconds = value.timestamp() as f64 + f64::from(value.timestamp_subsec_micros()) / 1e6;
        serializer.serialize_f64(seconds)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() {
            return Err(D::Error::custom("timestamp is not a finite number"));
        }
        let whole = seconds.floor();
        let micros = ((seconds - whole) * 1e6).round() as i64;
        DateTime::from_timestamp(whole as i64, 0)
            .map(|t| t + chrono::Duration::microseconds(micros))
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", seconds)))
    }
}
