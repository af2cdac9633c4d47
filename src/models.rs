use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub name: String,
    pub weight: String,
    pub contact: String,
    pub gender: String,
    pub race: String,
    pub academy: String,
    #[serde(rename = "studentRole")]
    #[sqlx(rename = "studentrole")]
    pub student_role: Option<String>,
}

/// A validated registration, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub weight: String,
    pub contact: String,
    pub gender: String,
    pub race: String,
    pub academy: String,
    pub student_role: Option<String>,
}

/// One row of `race_logs`. Open while `end_time` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanRecord {
    pub id: i32,
    pub tag_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
}

impl ScanRecord {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Reads a JSON string, number or boolean as text. `null` or a missing key is
/// `None`; arrays and objects are rejected.
pub fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string, number or boolean, found {}",
            other
        ))),
    }
}
