//! Per-kind cell converters, resolved once per schema

use crate::model::{CellValue, ColumnKind, Schema};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Converts a raw text field into a typed value
pub type TextConverter = fn(&str) -> Result<CellValue, String>;

/// Converts a JSON value into a typed value
pub type JsonConverter = fn(&Value) -> Result<CellValue, String>;

pub fn text_converter(kind: ColumnKind) -> TextConverter {
    match kind {
        ColumnKind::String => text_to_string,
        ColumnKind::Int => text_to_int,
        ColumnKind::Double => text_to_double,
        ColumnKind::Boolean => text_to_bool,
        ColumnKind::DateTime => text_to_datetime,
    }
}

pub fn json_converter(kind: ColumnKind) -> JsonConverter {
    match kind {
        ColumnKind::String => json_to_string,
        ColumnKind::Int => json_to_int,
        ColumnKind::Double => json_to_double,
        ColumnKind::Boolean => json_to_bool,
        ColumnKind::DateTime => json_to_datetime,
    }
}

/// Converter table for one schema, indexed by column position
#[derive(Debug, Clone)]
pub struct CellConverters {
    text: Vec<TextConverter>,
    json: Vec<JsonConverter>,
}

impl CellConverters {
    pub fn for_schema(schema: &Schema) -> Self {
        let kinds = schema.columns().iter().map(|c| c.kind);
        Self {
            text: kinds.clone().map(text_converter).collect(),
            json: kinds.map(json_converter).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn from_text(&self, column: usize, raw: &str) -> Result<CellValue, String> {
        let convert = self
            .text
            .get(column)
            .ok_or_else(|| format!("no column at position {}", column))?;
        convert(raw)
    }

    pub fn from_json(&self, column: usize, value: &Value) -> Result<CellValue, String> {
        let convert = self
            .json
            .get(column)
            .ok_or_else(|| format!("no column at position {}", column))?;
        convert(value)
    }
}

fn text_to_string(raw: &str) -> Result<CellValue, String> {
    Ok(CellValue::String(raw.to_string()))
}

fn text_to_int(raw: &str) -> Result<CellValue, String> {
    raw.trim()
        .parse::<i64>()
        .map(CellValue::Int)
        .map_err(|_| format!("'{}' is not an integer", raw))
}

fn text_to_double(raw: &str) -> Result<CellValue, String> {
    raw.trim()
        .parse::<f64>()
        .map(CellValue::Double)
        .map_err(|_| format!("'{}' is not a number", raw))
}

fn text_to_bool(raw: &str) -> Result<CellValue, String> {
    match raw.trim().to_lowercase().as_str() {
        "true" => Ok(CellValue::Boolean(true)),
        "false" => Ok(CellValue::Boolean(false)),
        _ => Err(format!("'{}' is not a boolean", raw)),
    }
}

fn text_to_datetime(raw: &str) -> Result<CellValue, String> {
    parse_datetime(raw.trim())
        .map(CellValue::DateTime)
        .ok_or_else(|| format!("'{}' is not a date/time", raw))
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`, as UTC
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// JSON conversions are lenient: null maps to the kind's zero value, and
// numbers, booleans and numeric strings convert into each other.

fn json_to_string(value: &Value) -> Result<CellValue, String> {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Ok(CellValue::String(text))
}

fn json_to_int(value: &Value) -> Result<CellValue, String> {
    match value {
        Value::Null => Ok(CellValue::Int(0)),
        Value::Bool(b) => Ok(CellValue::Int(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(CellValue::Int)
            .ok_or_else(|| format!("{} is out of integer range", n)),
        Value::String(s) => text_to_int(s),
        other => Err(format!("{} is not an integer", other)),
    }
}

fn json_to_double(value: &Value) -> Result<CellValue, String> {
    match value {
        Value::Null => Ok(CellValue::Double(0.0)),
        Value::Bool(b) => Ok(CellValue::Double(if *b { 1.0 } else { 0.0 })),
        Value::Number(n) => n
            .as_f64()
            .map(CellValue::Double)
            .ok_or_else(|| format!("{} is not a number", n)),
        Value::String(s) => text_to_double(s),
        other => Err(format!("{} is not a number", other)),
    }
}

fn json_to_bool(value: &Value) -> Result<CellValue, String> {
    match value {
        Value::Null => Ok(CellValue::Boolean(false)),
        Value::Bool(b) => Ok(CellValue::Boolean(*b)),
        Value::Number(n) => Ok(CellValue::Boolean(n.as_f64().unwrap_or(0.0) != 0.0)),
        Value::String(s) => text_to_bool(s),
        other => Err(format!("{} is not a boolean", other)),
    }
}

/// Unix milliseconds; strings may also carry a textual date/time
fn json_to_datetime(value: &Value) -> Result<CellValue, String> {
    let millis = match value {
        Value::Null => 0,
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| format!("{} is not a timestamp", n))?,
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(millis) => millis,
            Err(_) => return text_to_datetime(s),
        },
        other => return Err(format!("{} is not a timestamp", other)),
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .map(CellValue::DateTime)
        .ok_or_else(|| format!("{} is out of timestamp range", millis))
}
