use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AqlError, AqlResult};
use crate::registry::FieldType;

/// A raw value as written in a query, before it is typed against a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(i64),
    Bool(bool),
    Null,
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Number(n as i64)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::String(s) => f.write_str(s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Folder,
    File,
    Any,
}

impl ItemType {
    pub fn from_name(name: &str) -> Option<ItemType> {
        match name {
            "folder" => Some(ItemType::Folder),
            "file" => Some(ItemType::File),
            "any" => Some(ItemType::Any),
            _ => None,
        }
    }

    /// Stored `node_type` code. `Any` has no code.
    pub fn code(self) -> Option<i64> {
        match self {
            ItemType::Folder => Some(0),
            ItemType::File => Some(1),
            ItemType::Any => None,
        }
    }

    pub fn from_code(code: i64) -> Option<ItemType> {
        match code {
            0 => Some(ItemType::Folder),
            1 => Some(ItemType::File),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Folder => "folder",
            ItemType::File => "file",
            ItemType::Any => "any",
        }
    }
}

/// A value typed against the field it is compared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AqlValue {
    String(String),
    Long(i64),
    /// Epoch milliseconds
    Date(i64),
    ItemType(ItemType),
    Null,
}

impl AqlValue {
    /// Convert a literal into the value type of a field.
    pub fn for_field(field_type: FieldType, literal: &Literal) -> AqlResult<AqlValue> {
        if *literal == Literal::Null {
            return Ok(AqlValue::Null);
        }
        match field_type {
            FieldType::String => Ok(AqlValue::String(literal.to_string())),
            FieldType::Long | FieldType::Integer => match literal {
                Literal::Number(n) => Ok(AqlValue::Long(*n)),
                Literal::String(s) => s.trim().parse::<i64>().map(AqlValue::Long).map_err(|_| {
                    AqlError::InvalidValue(format!("'{}' is not a number", s))
                }),
                other => Err(AqlError::InvalidValue(format!("'{}' is not a number", other))),
            },
            FieldType::Date => match literal {
                Literal::Number(n) => Ok(AqlValue::Date(*n)),
                Literal::String(s) => parse_date(s).map(AqlValue::Date),
                other => Err(AqlError::InvalidValue(format!("'{}' is not a date", other))),
            },
            FieldType::ItemType => match literal {
                Literal::String(s) => ItemType::from_name(s)
                    .map(AqlValue::ItemType)
                    .ok_or_else(|| {
                        AqlError::InvalidValue(format!(
                            "'{}' is not an item type, expected file, folder or any",
                            s
                        ))
                    }),
                other => Err(AqlError::InvalidValue(format!(
                    "'{}' is not an item type",
                    other
                ))),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AqlValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AqlValue::String(s) => f.write_str(s),
            AqlValue::Long(n) | AqlValue::Date(n) => write!(f, "{}", n),
            AqlValue::ItemType(t) => f.write_str(t.as_str()),
            AqlValue::Null => f.write_str("null"),
        }
    }
}

/// Parse an ISO-8601 date or date-time into epoch milliseconds.
pub fn parse_date(text: &str) -> AqlResult<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    Err(AqlError::InvalidValue(format!("'{}' is not an ISO-8601 date", text)))
}

/// Parse a relative time such as `3d`, `2w` or `12hours` into a duration.
///
/// Amounts too large for a duration are rejected.
pub fn parse_relative_time(text: &str) -> AqlResult<Duration> {
    let text = text.trim();
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    let unit = text[digits.len()..].trim();
    let amount: i64 = digits
        .parse()
        .map_err(|_| AqlError::InvalidValue(format!("'{}' is not a relative time", text)))?;
    let duration = match unit {
        "ms" | "millis" => Duration::try_milliseconds(amount),
        "s" | "seconds" => Duration::try_seconds(amount),
        "mi" | "minutes" => Duration::try_minutes(amount),
        "h" | "hours" => Duration::try_hours(amount),
        "d" | "days" => Duration::try_days(amount),
        "w" | "weeks" => Duration::try_weeks(amount),
        "mo" | "months" => amount.checked_mul(30).and_then(Duration::try_days),
        "y" | "years" => amount.checked_mul(365).and_then(Duration::try_days),
        _ => {
            return Err(AqlError::InvalidValue(format!(
                "unknown time unit '{}' in '{}'",
                unit, text
            )))
        }
    };
    duration.ok_or_else(|| AqlError::InvalidValue(format!("relative time '{}' is out of range", text)))
}

/// Epoch millis `text` before `now_millis`, e.g. for `$last` and `$before`.
pub fn relative_to(now_millis: i64, text: &str) -> AqlResult<i64> {
    let duration = parse_relative_time(text)?;
    now_millis
        .checked_sub(duration.num_milliseconds())
        .ok_or_else(|| AqlError::InvalidValue(format!("relative time '{}' is out of range", text)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Equals,
    NotEquals,
    Greater,
    GreaterEquals,
    Less,
    LessEquals,
    Matches,
    NotMatches,
    /// Relative "newer than"; becomes `Greater` once resolved.
    Last,
    /// Relative "older than"; becomes `Less` once resolved.
    Before,
}

impl Comparator {
    pub fn signature(self) -> &'static str {
        match self {
            Comparator::Equals => "$eq",
            Comparator::NotEquals => "$ne",
            Comparator::Greater => "$gt",
            Comparator::GreaterEquals => "$gte",
            Comparator::Less => "$lt",
            Comparator::LessEquals => "$lte",
            Comparator::Matches => "$match",
            Comparator::NotMatches => "$nmatch",
            Comparator::Last => "$last",
            Comparator::Before => "$before",
        }
    }

    pub fn from_signature(signature: &str) -> Option<Comparator> {
        match signature {
            "$eq" => Some(Comparator::Equals),
            "$ne" => Some(Comparator::NotEquals),
            "$gt" => Some(Comparator::Greater),
            "$gte" => Some(Comparator::GreaterEquals),
            "$lt" => Some(Comparator::Less),
            "$lte" => Some(Comparator::LessEquals),
            "$match" => Some(Comparator::Matches),
            "$nmatch" => Some(Comparator::NotMatches),
            "$last" => Some(Comparator::Last),
            "$before" => Some(Comparator::Before),
            _ => None,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Comparator::NotEquals | Comparator::NotMatches)
    }

    /// The positive form of a negative comparator.
    pub fn positive(self) -> Comparator {
        match self {
            Comparator::NotEquals => Comparator::Equals,
            Comparator::NotMatches => Comparator::Matches,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    /// Match single property: criteria in the clause must hold on the same property row.
    Msp,
}

impl Operator {
    pub fn signature(self) -> &'static str {
        match self {
            Operator::And => "$and",
            Operator::Or => "$or",
            Operator::Msp => "$msp",
        }
    }

    pub fn from_signature(signature: &str) -> Option<Operator> {
        match signature {
            "$and" => Some(Operator::And),
            "$or" => Some(Operator::Or),
            "$msp" => Some(Operator::Msp),
            _ => None,
        }
    }
}
