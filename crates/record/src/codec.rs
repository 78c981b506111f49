use crate::error::CodecError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One decoded log entry, mapped onto the columns of the log table.
///
/// Every column except `content` is optional: a field missing from the source
/// line, or one holding a value of the wrong type, becomes `None` and is stored
/// as NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub name: Option<String>,
    pub level: Option<i32>,
    pub hostname: Option<String>,
    pub msg: Option<String>,
    pub pid: Option<i32>,
    pub time: Option<DateTime<Utc>>,
    /// The serialized line exactly as received, minus its line terminator.
    pub content: String,
}

/// Decodes one serialized log line into a `LogRecord`.
///
/// The chunk must be UTF-8 text holding a single JSON object. A trailing
/// `\n` or `\r\n` is tolerated, since line-oriented loggers append one to every
/// record.
pub fn decode(raw: impl AsRef<[u8]>) -> Result<LogRecord, CodecError> {
    let text = std::str::from_utf8(raw.as_ref())?;
    let content = strip_line_terminator(text);
    if content.trim().is_empty() {
        return Err(CodecError::Empty);
    }

    let fields = match serde_json::from_str::<Value>(content)? {
        Value::Object(fields) => fields,
        other => return Err(CodecError::NotAnObject(json_kind(&other))),
    };

    Ok(LogRecord {
        name: string_field(&fields, "name"),
        level: int_field(&fields, "level"),
        hostname: string_field(&fields, "hostname"),
        msg: string_field(&fields, "msg"),
        pid: int_field(&fields, "pid"),
        time: time_field(&fields, "time"),
        content: content.to_string(),
    })
}

fn strip_line_terminator(text: &str) -> &str {
    match text.strip_suffix('\n') {
        Some(line) => line.strip_suffix('\r').unwrap_or(line),
        None => text,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(str::to_string)
}

fn int_field(fields: &Map<String, Value>, key: &str) -> Option<i32> {
    fields.get(key)?.as_i64().and_then(|n| i32::try_from(n).ok())
}

/// Bunyan writes `time` as an RFC 3339 string; some emitters use epoch millis.
fn time_field(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
